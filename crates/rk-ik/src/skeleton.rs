//! Uuid-keyed bone hierarchy
//!
//! A minimal host-side skeleton: bones with local transforms, a parent map,
//! and cached world transforms. It implements both pose boundary traits so
//! the controller can read from and publish into it directly.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pose::{PoseSink, PoseSource};
use crate::transform::Transform;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bone {
    pub id: Uuid,
    pub name: String,
    /// Transform relative to the parent bone (or the component for roots)
    pub local: Transform,
    /// Cached component-space transform, runtime state only
    #[serde(skip)]
    pub world: Transform,
}

impl Bone {
    pub fn new(name: impl Into<String>, local: Transform) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            local,
            world: local,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Skeleton {
    pub bones: HashMap<Uuid, Bone>,
    /// child -> parent
    pub parent: HashMap<Uuid, Uuid>,
    /// parent -> children, in connection order
    pub children: HashMap<Uuid, Vec<Uuid>>,
    name_index: HashMap<String, Uuid>,
}

impl Skeleton {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an unparented bone and return its id
    pub fn add_bone(&mut self, bone: Bone) -> Result<Uuid, SkeletonError> {
        if self.name_index.contains_key(&bone.name) {
            return Err(SkeletonError::DuplicateName(bone.name));
        }
        let id = bone.id;
        self.name_index.insert(bone.name.clone(), id);
        self.bones.insert(id, bone);
        Ok(id)
    }

    /// Parent `child_id` under `parent_id`
    pub fn connect(&mut self, parent_id: Uuid, child_id: Uuid) -> Result<(), SkeletonError> {
        if !self.bones.contains_key(&parent_id) {
            return Err(SkeletonError::BoneNotFound(parent_id));
        }
        if !self.bones.contains_key(&child_id) {
            return Err(SkeletonError::BoneNotFound(child_id));
        }
        if self.would_create_cycle(parent_id, child_id) {
            return Err(SkeletonError::WouldCreateCycle);
        }
        if self.parent.contains_key(&child_id) {
            return Err(SkeletonError::AlreadyHasParent(child_id));
        }

        self.parent.insert(child_id, parent_id);
        self.children.entry(parent_id).or_default().push(child_id);
        Ok(())
    }

    fn would_create_cycle(&self, parent_id: Uuid, child_id: Uuid) -> bool {
        let mut current = Some(parent_id);
        while let Some(id) = current {
            if id == child_id {
                return true;
            }
            current = self.parent.get(&id).copied();
        }
        false
    }

    pub fn bone(&self, id: Uuid) -> Option<&Bone> {
        self.bones.get(&id)
    }

    pub fn find_bone_id_by_name(&self, name: &str) -> Option<Uuid> {
        self.name_index.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    /// Bones without a parent, sorted by name for a stable order
    pub fn root_bones(&self) -> Vec<Uuid> {
        let mut roots: Vec<&Bone> = self
            .bones
            .values()
            .filter(|bone| !self.parent.contains_key(&bone.id))
            .collect();
        roots.sort_by(|a, b| a.name.cmp(&b.name));
        roots.into_iter().map(|bone| bone.id).collect()
    }

    /// All bones in depth-first order from all roots
    pub fn bones_depth_first(&self) -> Vec<Uuid> {
        let mut result = Vec::with_capacity(self.bones.len());
        for root_id in self.root_bones() {
            self.collect_depth_first(root_id, &mut result);
        }
        result
    }

    fn collect_depth_first(&self, bone_id: Uuid, result: &mut Vec<Uuid>) {
        result.push(bone_id);
        if let Some(children) = self.children.get(&bone_id) {
            for &child_id in children {
                self.collect_depth_first(child_id, result);
            }
        }
    }

    /// Recompute cached world transforms from local transforms
    pub fn update_world_transforms(&mut self) {
        for root_id in self.root_bones() {
            self.update_transform_recursive(root_id, Transform::IDENTITY);
        }
    }

    fn update_transform_recursive(&mut self, bone_id: Uuid, parent_world: Transform) {
        let world = match self.bones.get_mut(&bone_id) {
            Some(bone) => {
                bone.world = (parent_world * bone.local).normalized();
                bone.world
            }
            None => return,
        };

        // Get children IDs first to avoid borrow issues
        let children = self.children.get(&bone_id).cloned().unwrap_or_default();
        for child_id in children {
            self.update_transform_recursive(child_id, world);
        }
    }

    fn parent_world(&self, bone_id: Uuid) -> Option<Transform> {
        self.parent
            .get(&bone_id)
            .and_then(|parent_id| self.bones.get(parent_id))
            .map(|parent| parent.world)
    }
}

impl PoseSource<Uuid> for Skeleton {
    fn world_transform_of(&self, id: Uuid) -> Option<Transform> {
        self.bones.get(&id).map(|bone| bone.world)
    }

    fn local_transform_of(&self, id: Uuid) -> Option<Transform> {
        self.bones.get(&id).map(|bone| bone.local)
    }

    fn parent_of(&self, id: Uuid) -> Option<Uuid> {
        self.parent.get(&id).copied()
    }
}

/// Writing a world transform re-derives the bone's local transform against
/// its parent and carries all descendants along.
impl PoseSink<Uuid> for Skeleton {
    fn write_world_transform(&mut self, id: Uuid, transform: Transform) -> bool {
        let parent_world = self.parent_world(id);
        let Some(bone) = self.bones.get_mut(&id) else {
            return false;
        };

        bone.local = match parent_world {
            Some(parent) => transform.relative_to(&parent).normalized(),
            None => transform,
        };
        let world = transform.normalized();
        bone.world = world;

        let children = self.children.get(&id).cloned().unwrap_or_default();
        for child_id in children {
            self.update_transform_recursive(child_id, world);
        }
        true
    }
}

/// Skeleton-related errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SkeletonError {
    #[error("Bone not found: {0}")]
    BoneNotFound(Uuid),
    #[error("Duplicate bone name: {0}")]
    DuplicateName(String),
    #[error("Connection would create a cycle")]
    WouldCreateCycle,
    #[error("Bone already has a parent: {0}")]
    AlreadyHasParent(Uuid),
}
