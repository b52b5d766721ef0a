//! Per-link rotation budgets

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_ROTATION_LIMIT_DEGREES, RESIZED_ROTATION_LIMIT_DEGREES};

/// Maximum cumulative rotation per link, index-aligned with chain position.
///
/// Stored in radians; hosts author limits in degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotationLimitProfile {
    radians: Vec<f32>,
}

impl RotationLimitProfile {
    /// Same limit (degrees) for `len` links
    pub fn uniform_degrees(len: usize, degrees: f32) -> Self {
        Self {
            radians: vec![degrees.to_radians(); len],
        }
    }

    /// Default profile used when the host has not customized a chain
    pub fn default_for(len: usize) -> Self {
        Self::uniform_degrees(len, DEFAULT_ROTATION_LIMIT_DEGREES)
    }

    pub fn from_degrees(degrees: &[f32]) -> Self {
        Self {
            radians: degrees.iter().map(|d| d.to_radians()).collect(),
        }
    }

    pub fn from_radians(radians: Vec<f32>) -> Self {
        Self { radians }
    }

    /// Fit a host-authored degree list to a chain of `len` links.
    ///
    /// Missing entries get the resize default, extra entries are dropped.
    pub fn fitted_degrees(degrees: &[f32], len: usize) -> Self {
        let mut fitted: Vec<f32> = degrees.iter().take(len).copied().collect();
        fitted.resize(len, RESIZED_ROTATION_LIMIT_DEGREES);
        Self::from_degrees(&fitted)
    }

    pub fn len(&self) -> usize {
        self.radians.len()
    }

    pub fn is_empty(&self) -> bool {
        self.radians.is_empty()
    }

    /// Limit in radians for the link at `position`
    pub fn limit(&self, position: usize) -> Option<f32> {
        self.radians.get(position).copied()
    }

    pub fn as_radians(&self) -> &[f32] {
        &self.radians
    }
}
