//! Cyclic Coordinate Descent IK for bone chains
//!
//! This crate contains:
//! - Transform: position + orientation used throughout the solver
//! - Chain / ChainLink: root-to-tip link state rebuilt every tick
//! - ChainBuilder: walks a host pose hierarchy from tip to root
//! - CcdSolver: one-link-per-call rotation step plus a classic converge loop
//! - MultiChainController: drives several chains from one update loop
//! - Skeleton: a uuid-keyed pose source/sink for hosts and tests

pub mod chain;
pub mod config;
pub mod constants;
pub mod controller;
pub mod debug;
pub mod error;
pub mod limits;
pub mod pose;
pub mod skeleton;
pub mod solver;
pub mod target;
pub mod transform;

#[cfg(test)]
pub(crate) mod test_support;

pub use chain::{BoneKey, Chain, ChainBuilder, ChainLink};
pub use config::{SolveMode, SolverSettings};
pub use constants::*;
pub use controller::{
    ActiveChain, ChainReport, ChainSetup, ChainStatus, MultiChainController, PassSummary,
    TickReport, publish, run_pass,
};
pub use debug::{DebugLines, RotationEvent, StepObserver, reborrow_observer};
pub use error::IkError;
pub use limits::RotationLimitProfile;
pub use pose::{BoneTransform, PoseSink, PoseSource};
pub use skeleton::{Bone, Skeleton, SkeletonError};
pub use solver::{CcdSolver, SkipReason, SolveReport, StepOutcome};
pub use target::EffectorTarget;
pub use transform::Transform;
