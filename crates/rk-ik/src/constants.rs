//! Global constants for rk-ik

/// Rotation limit applied to every link when a chain has no custom profile (degrees)
pub const DEFAULT_ROTATION_LIMIT_DEGREES: f32 = 50.0;

/// Limit given to links added when a custom profile is resized (degrees)
pub const RESIZED_ROTATION_LIMIT_DEGREES: f32 = 30.0;

/// Default tip-to-target tolerance
pub const DEFAULT_PRECISION: f32 = 1.0;

/// Default number of passes in classic converge mode
pub const DEFAULT_MAX_ITERATIONS: u32 = 10;

/// Upper bound on tip-to-root walk length
pub const DEFAULT_MAX_HIERARCHY_DEPTH: usize = 256;

/// Angles at or below this are treated as no rotation (radians)
pub const ANGLE_EPSILON: f32 = 1e-4;

/// Squared length below which a rotation axis is considered degenerate
pub const AXIS_EPSILON_SQUARED: f32 = 1e-12;

/// Bone segments shorter than this are collapsed by the legacy builder
pub const ZERO_LENGTH_EPSILON: f32 = 1e-6;
