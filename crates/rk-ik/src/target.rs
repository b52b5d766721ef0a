//! Effector targets and their resolution to world-frame positions

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::chain::BoneKey;
use crate::error::{IkError, IkResult};
use crate::pose::PoseSource;

/// Where a chain's tip should go.
///
/// The solver only ever sees the resolved world-frame position; resolution
/// happens once per tick before any chain is solved.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EffectorTarget<I> {
    /// Fixed position in the shared (component) frame
    Component(Vec3),
    /// Offset expressed in another bone's frame, follows that bone
    Bone { bone: I, offset: Vec3 },
}

impl<I: BoneKey> EffectorTarget<I> {
    pub fn resolve<P>(&self, pose: &P) -> IkResult<Vec3>
    where
        P: PoseSource<I> + ?Sized,
    {
        match *self {
            EffectorTarget::Component(location) => Ok(location),
            EffectorTarget::Bone { bone, offset } => pose
                .world_transform_of(bone)
                .map(|transform| transform.transform_point(offset))
                .ok_or_else(|| IkError::UnresolvedTarget(format!("{bone:?}"))),
        }
    }
}
