//! Synthetic pose source shared by unit tests

use std::collections::HashMap;

use glam::Vec3;

use crate::pose::PoseSource;
use crate::transform::Transform;

/// Bones `0..n` where bone `i` is parented to `i - 1`.
#[derive(Debug, Clone, Default)]
pub(crate) struct LinePose {
    parents: HashMap<u32, Option<u32>>,
    world: HashMap<u32, Transform>,
    local: HashMap<u32, Transform>,
}

impl LinePose {
    /// Unit-length bones along +X starting at the origin
    pub fn straight(count: u32) -> Self {
        let locations: Vec<Vec3> = (0..count).map(|i| Vec3::new(i as f32, 0.0, 0.0)).collect();
        Self::from_locations(&locations)
    }

    /// Unrotated bones at the given world locations
    pub fn from_locations(locations: &[Vec3]) -> Self {
        let mut pose = Self::default();
        for (index, &location) in locations.iter().enumerate() {
            let id = index as u32;
            let parent = index.checked_sub(1).map(|p| p as u32);
            let local = match parent {
                Some(p) => Transform::from_translation(location - locations[p as usize]),
                None => Transform::from_translation(location),
            };
            pose.parents.insert(id, parent);
            pose.world.insert(id, Transform::from_translation(location));
            pose.local.insert(id, local);
        }
        pose
    }

    pub fn set_parent(&mut self, id: u32, parent: Option<u32>) {
        self.parents.insert(id, parent);
    }

    pub fn remove_pose(&mut self, id: u32) {
        self.world.remove(&id);
        self.local.remove(&id);
    }

    pub fn world(&self, id: u32) -> Transform {
        self.world[&id]
    }

    pub fn local(&self, id: u32) -> Transform {
        self.local[&id]
    }

    /// Copy of this pose with world transforms replaced from `world` and
    /// locals re-derived from the parents
    pub fn with_world(&self, world: &HashMap<u32, Transform>) -> Self {
        let mut pose = self.clone();
        pose.world.extend(world.iter().map(|(&id, &t)| (id, t)));
        for id in self.ids() {
            let Some(&current) = pose.world.get(&id) else {
                continue;
            };
            let local = match self.parent_of(id).and_then(|p| pose.world.get(&p)) {
                Some(parent) => current.relative_to(parent),
                None => current,
            };
            pose.local.insert(id, local);
        }
        pose
    }

    pub fn ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.parents.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl PoseSource<u32> for LinePose {
    fn world_transform_of(&self, id: u32) -> Option<Transform> {
        self.world.get(&id).copied()
    }

    fn local_transform_of(&self, id: u32) -> Option<Transform> {
        self.local.get(&id).copied()
    }

    fn parent_of(&self, id: u32) -> Option<u32> {
        self.parents.get(&id).copied().flatten()
    }
}
