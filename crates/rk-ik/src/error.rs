//! IK-related errors

use thiserror::Error;

/// Errors that abort one chain for the current tick.
///
/// Local conditions such as a degenerate rotation axis or an exhausted
/// rotation budget are not errors; they show up as
/// [`SkipReason`](crate::solver::SkipReason) values instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IkError {
    #[error("Malformed hierarchy: root {root} not reached from tip {tip} after {steps} steps")]
    MalformedHierarchy {
        tip: String,
        root: String,
        steps: usize,
    },
    #[error("Bone not found in pose: {0}")]
    BoneNotFound(String),
    #[error("Rotation limit profile has {actual} entries, chain has {expected} links")]
    LimitProfileMismatch { expected: usize, actual: usize },
    #[error("Rotation limit {degrees} at link {position} must be a finite, non-negative angle")]
    InvalidRotationLimit { position: usize, degrees: f32 },
    #[error("Effector target could not be resolved: {0}")]
    UnresolvedTarget(String),
    #[error("Invalid solver settings: {0}")]
    InvalidSettings(String),
}

pub type IkResult<T> = Result<T, IkError>;
