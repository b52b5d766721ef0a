//! Solver configuration
//!
//! Settings are serializable so hosts can load them from scene or project
//! files alongside chain definitions.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_MAX_HIERARCHY_DEPTH, DEFAULT_MAX_ITERATIONS, DEFAULT_PRECISION};
use crate::error::{IkError, IkResult};

/// How the controller drives the solver within one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveMode {
    /// One correction per relevant link per tick; convergence happens across ticks
    #[default]
    PerLinkTick,
    /// Classic CCD: loop over the whole chain up to `max_iterations` passes per tick
    Converge,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SolverSettings {
    /// Tip-to-target distance treated as reached (must be > 0)
    pub precision: f32,
    /// Pass budget for [`SolveMode::Converge`]
    pub max_iterations: u32,
    /// Classic mode walks from the link next to the tip toward the root
    pub start_from_tail: bool,
    /// Clamp per-link rotation to the chain's limit profile
    pub enable_rotation_limit: bool,
    /// Bound on the tip-to-root walk when building chains
    pub max_hierarchy_depth: usize,
    pub mode: SolveMode,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            precision: DEFAULT_PRECISION,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            start_from_tail: true,
            enable_rotation_limit: false,
            max_hierarchy_depth: DEFAULT_MAX_HIERARCHY_DEPTH,
            mode: SolveMode::PerLinkTick,
        }
    }
}

impl SolverSettings {
    /// Set the tip-to-target tolerance
    pub fn with_precision(mut self, precision: f32) -> Self {
        self.precision = precision;
        self
    }

    /// Set the classic-mode pass budget
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_rotation_limit(mut self, enabled: bool) -> Self {
        self.enable_rotation_limit = enabled;
        self
    }

    pub fn with_start_from_tail(mut self, start_from_tail: bool) -> Self {
        self.start_from_tail = start_from_tail;
        self
    }

    pub fn with_max_hierarchy_depth(mut self, depth: usize) -> Self {
        self.max_hierarchy_depth = depth;
        self
    }

    pub fn with_mode(mut self, mode: SolveMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn validate(&self) -> IkResult<()> {
        if !self.precision.is_finite() || self.precision <= 0.0 {
            return Err(IkError::InvalidSettings(format!(
                "precision must be a positive finite number, got {}",
                self.precision
            )));
        }
        if self.max_hierarchy_depth == 0 {
            return Err(IkError::InvalidSettings(
                "max_hierarchy_depth must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
