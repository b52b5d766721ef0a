//! Kinematic chain (root-to-tip links) operated on by the solver

mod builder;

use std::fmt::Debug;
use std::hash::Hash;

use glam::Vec3;

use crate::transform::Transform;

pub use builder::ChainBuilder;

/// Identifier type the host uses for its bones.
pub trait BoneKey: Copy + Eq + Hash + Debug {}

impl<T: Copy + Eq + Hash + Debug> BoneKey for T {}

/// One rigid segment of a chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainLink<I> {
    /// Transform in the shared (component) frame
    pub world_transform: Transform,
    /// Transform relative to the previous link in the chain
    pub local_transform: Transform,
    /// Index within the chain (0 = root)
    pub chain_position: usize,
    /// Host bone this link was built from
    pub source_id: I,
    /// Radians already applied to this link during the current solve session
    pub accumulated_rotation: f32,
    /// Coincident host bones that inherit this link's transform on publish
    pub zero_length_children: Vec<I>,
}

impl<I> ChainLink<I> {
    pub fn new(
        world_transform: Transform,
        local_transform: Transform,
        chain_position: usize,
        source_id: I,
    ) -> Self {
        Self {
            world_transform,
            local_transform,
            chain_position,
            source_id,
            accumulated_rotation: 0.0,
            zero_length_children: Vec::new(),
        }
    }

    pub fn location(&self) -> Vec3 {
        self.world_transform.location()
    }
}

/// Ordered root-to-tip sequence of links, never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Chain<I> {
    links: Vec<ChainLink<I>>,
}

impl<I: BoneKey> Chain<I> {
    /// Wrap already-ordered links, renumbering `chain_position` to `0..N-1`.
    /// Returns `None` for an empty list.
    pub fn from_links(mut links: Vec<ChainLink<I>>) -> Option<Self> {
        if links.is_empty() {
            return None;
        }
        for (position, link) in links.iter_mut().enumerate() {
            link.chain_position = position;
        }
        Some(Self { links })
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn links(&self) -> &[ChainLink<I>] {
        &self.links
    }

    pub fn link(&self, position: usize) -> Option<&ChainLink<I>> {
        self.links.get(position)
    }

    pub(crate) fn links_mut(&mut self) -> &mut [ChainLink<I>] {
        &mut self.links
    }

    pub fn root(&self) -> &ChainLink<I> {
        &self.links[0]
    }

    pub fn tip(&self) -> &ChainLink<I> {
        &self.links[self.links.len() - 1]
    }

    pub fn tip_location(&self) -> Vec3 {
        self.tip().location()
    }

    /// Chain position of the link built from `id`
    pub fn position_of(&self, id: I) -> Option<usize> {
        self.links.iter().position(|link| link.source_id == id)
    }

    /// Membership test by host identifier
    pub fn contains(&self, id: I) -> bool {
        self.position_of(id).is_some()
    }

    /// World-frame positions of every link, root first
    pub fn world_positions(&self) -> Vec<Vec3> {
        self.links.iter().map(ChainLink::location).collect()
    }

    pub fn reset_accumulated_rotation(&mut self) {
        for link in &mut self.links {
            link.accumulated_rotation = 0.0;
        }
    }

    /// Recompute world transforms of every link after `position` from their
    /// local transforms, root to tip.
    pub(crate) fn propagate_from(&mut self, position: usize) {
        let mut parent_transform = self.links[position].world_transform;
        for child in self.links.iter_mut().skip(position + 1) {
            child.world_transform = (parent_transform * child.local_transform).normalized();
            parent_transform = child.world_transform;
        }
    }
}
