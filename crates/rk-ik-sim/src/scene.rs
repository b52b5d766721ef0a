//! Scene file serialization
//!
//! A scene names its bones and refers to them by name everywhere else; ids
//! are assigned when the skeleton is built.

use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use rk_ik::{
    Bone, ChainSetup, EffectorTarget, IkError, Skeleton, SkeletonError, SolverSettings, Transform,
};

const DEFAULT_TICKS: u32 = 30;

fn default_ticks() -> u32 {
    DEFAULT_TICKS
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoneDef {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    /// Translation relative to the parent
    #[serde(default)]
    pub xyz: [f32; 3],
    /// Roll, pitch, yaw in radians relative to the parent
    #[serde(default)]
    pub rpy: [f32; 3],
}

impl BoneDef {
    pub fn new(name: impl Into<String>, parent: Option<&str>, xyz: [f32; 3]) -> Self {
        Self {
            name: name.into(),
            parent: parent.map(str::to_owned),
            xyz,
            rpy: [0.0; 3],
        }
    }
}

/// Scene file describing a skeleton, its IK chains and how long to run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub name: String,
    pub bones: Vec<BoneDef>,
    pub chains: Vec<ChainSetup<String>>,
    #[serde(default)]
    pub settings: SolverSettings,
    #[serde(default = "default_ticks")]
    pub ticks: u32,
    /// Bones processed each tick, in order. Defaults to depth-first order.
    #[serde(default)]
    pub relevant: Option<Vec<String>>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new("New Scene")
    }
}

impl Scene {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bones: Vec::new(),
            chains: Vec::new(),
            settings: SolverSettings::default(),
            ticks: DEFAULT_TICKS,
            relevant: None,
        }
    }

    /// Save scene to a file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SceneError> {
        let content = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| SceneError::Serialize(e.to_string()))?;
        std::fs::write(path.as_ref(), content).map_err(|e| SceneError::Io(e.to_string()))?;
        Ok(())
    }

    /// Load scene from a file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SceneError> {
        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|e| SceneError::Io(e.to_string()))?;
        Self::from_ron(&content)
    }

    pub fn from_ron(content: &str) -> Result<Self, SceneError> {
        ron::from_str(content).map_err(|e| SceneError::Parse(e.to_string()))
    }

    /// Build the skeleton with world transforms up to date
    pub fn build_skeleton(&self) -> Result<Skeleton, SceneError> {
        let mut skeleton = Skeleton::new();
        for def in &self.bones {
            let local = Transform::from_xyz_rpy(def.xyz, def.rpy);
            skeleton
                .add_bone(Bone::new(def.name.clone(), local))
                .map_err(|e| match e {
                    SkeletonError::DuplicateName(name) => SceneError::DuplicateBone(name),
                    other => SceneError::Hierarchy(other),
                })?;
        }

        for def in &self.bones {
            let Some(parent) = &def.parent else {
                continue;
            };
            let parent_id = lookup(&skeleton, parent)?;
            let child_id = lookup(&skeleton, &def.name)?;
            skeleton.connect(parent_id, child_id)?;
        }

        skeleton.update_world_transforms();
        Ok(skeleton)
    }

    /// Chain definitions with bone names resolved against `skeleton`
    pub fn resolve_chains(&self, skeleton: &Skeleton) -> Result<Vec<ChainSetup<Uuid>>, SceneError> {
        self.chains
            .iter()
            .map(|setup| {
                let target = match &setup.target {
                    EffectorTarget::Component(location) => EffectorTarget::Component(*location),
                    EffectorTarget::Bone { bone, offset } => EffectorTarget::Bone {
                        bone: lookup(skeleton, bone)?,
                        offset: *offset,
                    },
                };
                Ok(ChainSetup {
                    name: setup.name.clone(),
                    tip: lookup(skeleton, &setup.tip)?,
                    root: lookup(skeleton, &setup.root)?,
                    target,
                    rotation_limits_degrees: setup.rotation_limits_degrees.clone(),
                })
            })
            .collect()
    }

    /// Bones the runner feeds to the controller each tick
    pub fn resolve_relevant(&self, skeleton: &Skeleton) -> Result<Vec<Uuid>, SceneError> {
        match &self.relevant {
            Some(names) => names.iter().map(|name| lookup(skeleton, name)).collect(),
            None => Ok(skeleton.bones_depth_first()),
        }
    }
}

fn lookup(skeleton: &Skeleton, name: &str) -> Result<Uuid, SceneError> {
    skeleton
        .find_bone_id_by_name(name)
        .ok_or_else(|| SceneError::UnknownBone(name.to_owned()))
}

/// Scene-related errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum SceneError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialize(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Unknown bone: {0}")]
    UnknownBone(String),
    #[error("Duplicate bone: {0}")]
    DuplicateBone(String),
    #[error("Invalid hierarchy: {0}")]
    Hierarchy(#[from] SkeletonError),
    #[error("Invalid settings: {0}")]
    Settings(#[from] IkError),
}
