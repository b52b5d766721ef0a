//! Optional observer hooks for debug visualization
//!
//! Nothing in the solver depends on an observer being present. Hosts that
//! draw debug lines plug a [`StepObserver`] in and render from it on their
//! own thread.

use glam::Vec3;

/// One rotation applied by the solver
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationEvent<I> {
    /// Link that was rotated
    pub focus: I,
    /// Applied angle in radians
    pub angle: f32,
    pub tip_before: Vec3,
    pub tip_after: Vec3,
}

pub trait StepObserver<I> {
    fn rotation_applied(&mut self, event: &RotationEvent<I>);

    /// Called once per published chain with its link positions, root first
    fn chain_published(&mut self, _positions: &[Vec3]) {}
}

/// Reborrow an optional observer so it can be handed to several calls in turn.
pub fn reborrow_observer<'a, I>(
    observer: &'a mut Option<&mut dyn StepObserver<I>>,
) -> Option<&'a mut dyn StepObserver<I>> {
    match observer {
        Some(observer) => Some(&mut **observer as &mut dyn StepObserver<I>),
        None => None,
    }
}

/// Collects line segments for a debug draw pass.
#[derive(Debug, Clone, Default)]
pub struct DebugLines {
    /// Tip movement per applied rotation (before, after)
    pub tip_moves: Vec<(Vec3, Vec3)>,
    /// Link positions of every published chain
    pub chains: Vec<Vec<Vec3>>,
}

impl DebugLines {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.tip_moves.clear();
        self.chains.clear();
    }

    /// Bone segments of all published chains as (start, end) pairs
    pub fn segments(&self) -> Vec<(Vec3, Vec3)> {
        self.chains
            .iter()
            .flat_map(|positions| positions.windows(2).map(|w| (w[0], w[1])))
            .collect()
    }
}

impl<I> StepObserver<I> for DebugLines {
    fn rotation_applied(&mut self, event: &RotationEvent<I>) {
        self.tip_moves.push((event.tip_before, event.tip_after));
    }

    fn chain_published(&mut self, positions: &[Vec3]) {
        self.chains.push(positions.to_vec());
    }
}
