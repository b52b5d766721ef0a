//! Boundary traits between the solver and the host's pose storage

use std::collections::HashMap;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::transform::Transform;

/// Read-only access to the host's hierarchical pose.
pub trait PoseSource<I> {
    /// Transform of the bone in the shared (component) frame
    fn world_transform_of(&self, id: I) -> Option<Transform>;

    /// Transform of the bone relative to its parent
    fn local_transform_of(&self, id: I) -> Option<Transform>;

    /// Parent bone, `None` for hierarchy roots and unknown bones
    fn parent_of(&self, id: I) -> Option<I>;
}

/// Destination for solved world transforms.
pub trait PoseSink<I> {
    /// Write `transform` for `id`. Returns false when the sink has no entry
    /// for `id`, in which case nothing is written.
    fn write_world_transform(&mut self, id: I, transform: Transform) -> bool;
}

impl<I: Eq + Hash> PoseSink<I> for HashMap<I, Transform> {
    fn write_world_transform(&mut self, id: I, transform: Transform) -> bool {
        match self.get_mut(&id) {
            Some(slot) => {
                *slot = transform;
                true
            }
            None => false,
        }
    }
}

/// One entry of a host output buffer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoneTransform<I> {
    pub bone: I,
    pub transform: Transform,
}

impl<I> BoneTransform<I> {
    pub fn new(bone: I, transform: Transform) -> Self {
        Self { bone, transform }
    }
}

impl<I: PartialEq> PoseSink<I> for Vec<BoneTransform<I>> {
    fn write_world_transform(&mut self, id: I, transform: Transform) -> bool {
        match self.iter_mut().find(|entry| entry.bone == id) {
            Some(entry) => {
                entry.transform = transform;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn map_sink_ignores_unknown_ids() {
        let mut sink: HashMap<u32, Transform> = HashMap::new();
        sink.insert(1, Transform::IDENTITY);

        let moved = Transform::from_translation(Vec3::X);
        assert!(sink.write_world_transform(1, moved));
        assert!(!sink.write_world_transform(2, moved));
        assert_eq!(sink.len(), 1);
        assert_eq!(sink[&1], moved);
    }

    #[test]
    fn buffer_sink_updates_matching_entry_only() {
        let mut sink = vec![
            BoneTransform::new(7u32, Transform::IDENTITY),
            BoneTransform::new(9u32, Transform::IDENTITY),
        ];

        let moved = Transform::from_translation(Vec3::Y);
        assert!(sink.write_world_transform(9, moved));
        assert!(!sink.write_world_transform(3, moved));
        assert_eq!(sink[0].transform, Transform::IDENTITY);
        assert_eq!(sink[1].transform, moved);
    }
}
