//! Headless driver for rk-ik
//!
//! Loads a RON scene, builds a uuid-keyed skeleton from it, registers the
//! scene's chains with a controller and runs evaluation ticks.

pub mod runner;
pub mod scene;

pub use runner::{BonePose, ChainSummary, RunSummary, Runner};
pub use scene::{BoneDef, Scene, SceneError};
