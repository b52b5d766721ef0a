//! Chain construction from a host pose hierarchy

use glam::Vec3;
use tracing::trace;

use super::{BoneKey, Chain, ChainLink};
use crate::constants::{DEFAULT_MAX_HIERARCHY_DEPTH, ZERO_LENGTH_EPSILON};
use crate::error::{IkError, IkResult};
use crate::pose::PoseSource;
use crate::transform::Transform;

/// Builds chains by walking parent links from a tip bone up to a root bone.
///
/// The walk is bounded by `max_depth` so a cyclic or disconnected hierarchy
/// fails with [`IkError::MalformedHierarchy`] instead of spinning.
#[derive(Debug, Clone, Copy)]
pub struct ChainBuilder {
    max_depth: usize,
}

impl Default for ChainBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HIERARCHY_DEPTH)
    }
}

impl ChainBuilder {
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth: max_depth.max(1),
        }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Build one link per bone between `root` and `tip` (inclusive).
    pub fn build<I, P>(&self, tip: I, root: I, pose: &P) -> IkResult<Chain<I>>
    where
        I: BoneKey,
        P: PoseSource<I> + ?Sized,
    {
        let path = self.collect_path(tip, root, pose)?;

        let mut links = Vec::with_capacity(path.len());
        for (position, &bone) in path.iter().enumerate() {
            let (world, local) = bone_transforms(bone, pose)?;
            links.push(ChainLink::new(world, local, position, bone));
        }

        trace!("Built chain {:?} -> {:?} with {} links", root, tip, links.len());
        Chain::from_links(links).ok_or_else(|| IkError::BoneNotFound(format!("{tip:?}")))
    }

    /// Legacy single-chain construction.
    ///
    /// Bones that sit on top of the previously visited bone do not get a link
    /// of their own; they are recorded as zero-length children of the last
    /// link and inherit its transform when the chain is published. Local
    /// transforms are re-derived against the previous kept link so the
    /// parent/child invariant holds across collapsed bones.
    pub fn build_collapsed<I, P>(&self, tip: I, root: I, pose: &P) -> IkResult<Chain<I>>
    where
        I: BoneKey,
        P: PoseSource<I> + ?Sized,
    {
        let path = self.collect_path(tip, root, pose)?;

        let mut links: Vec<ChainLink<I>> = Vec::with_capacity(path.len());
        let mut previous_location: Option<Vec3> = None;
        for &bone in &path {
            let (world, local) = bone_transforms(bone, pose)?;
            let location = world.location();

            let coincident = previous_location
                .is_some_and(|previous| location.distance(previous) <= ZERO_LENGTH_EPSILON);
            previous_location = Some(location);

            let position = links.len();
            match links.last_mut() {
                Some(parent) if coincident => parent.zero_length_children.push(bone),
                Some(parent) => {
                    let local = world.relative_to(&parent.world_transform).normalized();
                    links.push(ChainLink::new(world, local, position, bone));
                }
                None => links.push(ChainLink::new(world, local, 0, bone)),
            }
        }

        Chain::from_links(links).ok_or_else(|| IkError::BoneNotFound(format!("{tip:?}")))
    }

    /// Bones from root to tip, inclusive.
    fn collect_path<I, P>(&self, tip: I, root: I, pose: &P) -> IkResult<Vec<I>>
    where
        I: BoneKey,
        P: PoseSource<I> + ?Sized,
    {
        let malformed = |steps| IkError::MalformedHierarchy {
            tip: format!("{tip:?}"),
            root: format!("{root:?}"),
            steps,
        };

        let mut path = vec![tip];
        let mut current = tip;
        while current != root {
            if path.len() > self.max_depth {
                return Err(malformed(path.len()));
            }
            current = pose.parent_of(current).ok_or_else(|| malformed(path.len()))?;
            path.push(current);
        }

        path.reverse();
        Ok(path)
    }
}

fn bone_transforms<I, P>(bone: I, pose: &P) -> IkResult<(Transform, Transform)>
where
    I: BoneKey,
    P: PoseSource<I> + ?Sized,
{
    let world = pose
        .world_transform_of(bone)
        .ok_or_else(|| IkError::BoneNotFound(format!("{bone:?}")))?;
    let local = pose
        .local_transform_of(bone)
        .ok_or_else(|| IkError::BoneNotFound(format!("{bone:?}")))?;
    Ok((world, local))
}
