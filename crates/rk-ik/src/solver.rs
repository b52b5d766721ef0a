//! Cyclic Coordinate Descent solver
//!
//! The primary entry point is [`CcdSolver::solve_step`], which rotates at
//! most one link (the focus link) per call. Hosts that call it once per
//! relevant link per tick get convergence spread over several ticks.
//! [`CcdSolver::solve`] is the classic alternative that loops over the whole
//! chain until the tip reaches the target or the pass budget runs out.

use glam::{Quat, Vec3};
use tracing::trace;

use crate::chain::{BoneKey, Chain};
use crate::config::SolverSettings;
use crate::constants::{
    ANGLE_EPSILON, AXIS_EPSILON_SQUARED, DEFAULT_MAX_ITERATIONS, DEFAULT_PRECISION,
};
use crate::debug::{RotationEvent, StepObserver, reborrow_observer};
use crate::limits::RotationLimitProfile;

/// Why a rotation was not applied to a link that could otherwise move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Zero-length direction or parallel directions, no usable rotation axis
    Degenerate,
    /// Required angle is too small to matter
    NegligibleAngle,
    /// The link has used up its rotation limit
    BudgetExhausted,
}

/// Result of a single solver step
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepOutcome {
    /// The focus link was rotated by `angle` radians
    Rotated { angle: f32 },
    /// The focus link is the tip; there is nothing upstream of it to rotate
    FocusIsTip,
    /// The tip is already within tolerance of the target
    Converged,
    /// The focus link is not part of this chain
    NotInChain,
    Skipped(SkipReason),
}

impl StepOutcome {
    /// Boolean reported to hosts: true when a rotation was applied or the
    /// focus link is the tip.
    pub fn reported(&self) -> bool {
        matches!(self, StepOutcome::Rotated { .. } | StepOutcome::FocusIsTip)
    }

    /// Whether any transform in the chain changed
    pub fn mutated(&self) -> bool {
        matches!(self, StepOutcome::Rotated { .. })
    }
}

/// Result of a classic converge solve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolveReport {
    /// Tip ended within tolerance of the target
    pub converged: bool,
    /// Number of full passes performed
    pub iterations: u32,
    /// Number of rotations applied across all passes
    pub rotations: usize,
}

/// CCD solver parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CcdSolver {
    tolerance: f32,
    enable_rotation_limit: bool,
    max_iterations: u32,
    start_from_tail: bool,
}

impl Default for CcdSolver {
    fn default() -> Self {
        Self::new(DEFAULT_PRECISION)
    }
}

impl CcdSolver {
    pub fn new(tolerance: f32) -> Self {
        Self {
            tolerance,
            enable_rotation_limit: false,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            start_from_tail: true,
        }
    }

    pub fn from_settings(settings: &SolverSettings) -> Self {
        Self {
            tolerance: settings.precision,
            enable_rotation_limit: settings.enable_rotation_limit,
            max_iterations: settings.max_iterations,
            start_from_tail: settings.start_from_tail,
        }
    }

    pub fn with_rotation_limit(mut self, enabled: bool) -> Self {
        self.enable_rotation_limit = enabled;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_start_from_tail(mut self, start_from_tail: bool) -> Self {
        self.start_from_tail = start_from_tail;
        self
    }

    pub fn tolerance(&self) -> f32 {
        self.tolerance
    }

    pub fn rotation_limit_enabled(&self) -> bool {
        self.enable_rotation_limit
    }

    /// Rotate the link built from `focus` so the tip swings toward `target`.
    ///
    /// Only the focus link and the links after it are touched. When rotation
    /// limiting is enabled and `limits` has no entry for the focus link, the
    /// link is treated as having no budget.
    pub fn solve_step<I: BoneKey>(
        &self,
        chain: &mut Chain<I>,
        target: Vec3,
        limits: &RotationLimitProfile,
        focus: I,
        observer: Option<&mut dyn StepObserver<I>>,
    ) -> StepOutcome {
        let Some(position) = chain.position_of(focus) else {
            return StepOutcome::NotInChain;
        };
        if position == chain.len() - 1 {
            return StepOutcome::FocusIsTip;
        }
        if self.tip_within_tolerance(chain, target) {
            return StepOutcome::Converged;
        }
        self.rotate_link(chain, position, target, limits, observer)
    }

    /// Classic CCD: sweep every non-tip link per pass until the tip is within
    /// tolerance or `max_iterations` passes have run.
    ///
    /// Accumulated rotation is reset first, so limits bound the total
    /// rotation of this call.
    pub fn solve<I: BoneKey>(
        &self,
        chain: &mut Chain<I>,
        target: Vec3,
        limits: &RotationLimitProfile,
        mut observer: Option<&mut dyn StepObserver<I>>,
    ) -> SolveReport {
        chain.reset_accumulated_rotation();

        let movable = chain.len() - 1;
        let order: Vec<usize> = if self.start_from_tail {
            (0..movable).rev().collect()
        } else {
            (0..movable).collect()
        };

        let mut report = SolveReport {
            converged: self.tip_within_tolerance(chain, target),
            iterations: 0,
            rotations: 0,
        };

        while !report.converged && report.iterations < self.max_iterations {
            report.iterations += 1;

            let mut moved = false;
            for &position in &order {
                let outcome = self.rotate_link(
                    chain,
                    position,
                    target,
                    limits,
                    reborrow_observer(&mut observer),
                );
                if outcome.mutated() {
                    moved = true;
                    report.rotations += 1;
                }
                if self.tip_within_tolerance(chain, target) {
                    report.converged = true;
                    break;
                }
            }

            if !moved {
                break;
            }
        }

        trace!(
            "CCD solve finished: converged={} iterations={} rotations={}",
            report.converged, report.iterations, report.rotations
        );
        report
    }

    fn tip_within_tolerance<I: BoneKey>(&self, chain: &Chain<I>, target: Vec3) -> bool {
        chain.tip_location().distance(target) <= self.tolerance
    }

    /// Single CCD correction for the link at `position` (never the tip).
    fn rotate_link<I: BoneKey>(
        &self,
        chain: &mut Chain<I>,
        position: usize,
        target: Vec3,
        limits: &RotationLimitProfile,
        observer: Option<&mut dyn StepObserver<I>>,
    ) -> StepOutcome {
        let tip_before = chain.tip_location();
        let links = chain.links_mut();
        let current = &mut links[position];
        let origin = current.location();

        let to_tip = (tip_before - origin).normalize_or_zero();
        let to_target = (target - origin).normalize_or_zero();
        if to_tip == Vec3::ZERO || to_target == Vec3::ZERO {
            return StepOutcome::Skipped(SkipReason::Degenerate);
        }

        // negative or NaN limits act as a zero budget
        let limit = self
            .enable_rotation_limit
            .then(|| limits.limit(position).unwrap_or(0.0).max(0.0));

        let mut angle = to_tip.dot(to_target).clamp(-1.0, 1.0).acos();
        if let Some(limit) = limit {
            angle = angle.clamp(-limit, limit);
        }

        if angle.abs() <= ANGLE_EPSILON {
            return StepOutcome::Skipped(SkipReason::NegligibleAngle);
        }
        if limit.is_some_and(|limit| current.accumulated_rotation >= limit) {
            return StepOutcome::Skipped(SkipReason::BudgetExhausted);
        }

        // The budget is spent even if the axis turns out to be unusable.
        if let Some(limit) = limit {
            if current.accumulated_rotation + angle > limit {
                angle = limit - current.accumulated_rotation;
            }
            current.accumulated_rotation += angle;
        }

        let axis = to_tip.cross(to_target);
        if axis.length_squared() <= AXIS_EPSILON_SQUARED {
            return StepOutcome::Skipped(SkipReason::Degenerate);
        }

        let delta = Quat::from_axis_angle(axis.normalize(), angle);
        current.world_transform.rotation = (delta * current.world_transform.rotation).normalize();

        if position > 0 {
            let parent_world = links[position - 1].world_transform;
            let current = &mut links[position];
            current.local_transform = current
                .world_transform
                .relative_to(&parent_world)
                .normalized();
        }

        chain.propagate_from(position);

        let focus = chain.links()[position].source_id;
        let tip_after = chain.tip_location();
        trace!(
            "Rotated link {:?} by {:.4} rad, tip {:?} -> {:?}",
            focus, angle, tip_before, tip_after
        );

        if let Some(observer) = observer {
            observer.rotation_applied(&RotationEvent {
                focus,
                angle,
                tip_before,
                tip_after,
            });
        }

        StepOutcome::Rotated { angle }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ChainBuilder;
    use crate::debug::DebugLines;
    use crate::test_support::LinePose;
    use approx::assert_relative_eq;

    fn straight_chain(count: u32) -> Chain<u32> {
        let pose = LinePose::straight(count);
        ChainBuilder::default().build(count - 1, 0, &pose).unwrap()
    }

    fn assert_chain_consistent(chain: &Chain<u32>) {
        for pair in chain.links().windows(2) {
            let expected = pair[0].world_transform * pair[1].local_transform;
            assert!(
                expected.abs_diff_eq(&pair[1].world_transform, 1e-4),
                "link {} drifted from its parent",
                pair[1].chain_position
            );
        }
        for link in chain.links() {
            assert!(link.world_transform.is_rotation_normalized(1e-5));
            assert!(link.local_transform.is_rotation_normalized(1e-5));
        }
    }

    #[test]
    fn middle_link_rotates_tip_toward_target() {
        let mut chain = straight_chain(3);
        let target = Vec3::new(2.0, 1.0, 0.0);
        let before = chain.tip_location().distance(target);

        let solver = CcdSolver::new(0.01);
        let limits = RotationLimitProfile::default_for(chain.len());
        let outcome = solver.solve_step(&mut chain, target, &limits, 1, None);

        let StepOutcome::Rotated { angle } = outcome else {
            panic!("expected a rotation, got {outcome:?}");
        };
        assert_relative_eq!(angle, std::f32::consts::FRAC_PI_4, epsilon = 1e-5);
        assert!(outcome.reported());

        let after = chain.tip_location().distance(target);
        assert!(after < before, "tip moved away: {before} -> {after}");
        assert!(
            chain
                .tip_location()
                .abs_diff_eq(Vec3::new(1.0 + 0.5f32.sqrt(), 0.5f32.sqrt(), 0.0), 1e-5)
        );
        assert_chain_consistent(&chain);
    }

    #[test]
    fn zero_limit_blocks_rotation() {
        let mut chain = straight_chain(3);
        let original = chain.clone();

        let solver = CcdSolver::new(0.01).with_rotation_limit(true);
        let limits = RotationLimitProfile::from_radians(vec![1.0, 0.0, 1.0]);
        let outcome = solver.solve_step(&mut chain, Vec3::new(2.0, 1.0, 0.0), &limits, 1, None);

        assert!(!outcome.reported());
        assert!(matches!(outcome, StepOutcome::Skipped(_)));
        assert_eq!(chain, original);
    }

    #[test]
    fn ancestors_are_untouched() {
        let mut chain = straight_chain(5);
        let original = chain.clone();

        let solver = CcdSolver::new(0.01);
        let limits = RotationLimitProfile::default_for(chain.len());
        let outcome = solver.solve_step(&mut chain, Vec3::new(2.0, 2.0, 0.5), &limits, 2, None);
        assert!(outcome.mutated());

        for position in 0..2 {
            assert_eq!(chain.links()[position], original.links()[position]);
        }
        for position in 2..5 {
            assert_ne!(
                chain.links()[position].world_transform,
                original.links()[position].world_transform,
                "link {position} should have moved"
            );
        }
        // the pivot keeps its location, only its orientation changes
        assert!(chain.links()[2].location().abs_diff_eq(original.links()[2].location(), 1e-6));
        assert_chain_consistent(&chain);
    }

    #[test]
    fn accumulated_rotation_is_monotonic_and_bounded() {
        let mut chain = straight_chain(4);
        let limit = 20f32.to_radians();
        let limits = RotationLimitProfile::from_radians(vec![limit; 4]);
        let solver = CcdSolver::new(0.01).with_rotation_limit(true);
        let targets = [
            Vec3::new(1.0, 2.5, 0.0),
            Vec3::new(0.5, 2.0, 1.0),
            Vec3::new(-1.0, 1.0, 0.0),
            Vec3::new(1.0, -2.0, 0.0),
        ];

        let mut previous = vec![0.0f32; 4];
        for target in targets {
            for focus in [2, 1, 0] {
                solver.solve_step(&mut chain, target, &limits, focus, None);
                for (link, prev) in chain.links().iter().zip(previous.iter_mut()) {
                    assert!(link.accumulated_rotation >= *prev);
                    assert!(link.accumulated_rotation <= limit + 1e-6);
                    *prev = link.accumulated_rotation;
                }
            }
        }
        assert_relative_eq!(chain.links()[0].accumulated_rotation, limit, epsilon = 1e-6);
        assert_chain_consistent(&chain);
    }

    #[test]
    fn exhausted_budget_reports_skip() {
        let mut chain = straight_chain(3);
        let limits = RotationLimitProfile::uniform_degrees(3, 10.0);
        let solver = CcdSolver::new(0.01).with_rotation_limit(true);
        let target = Vec3::new(1.0, 1.0, 0.0);

        let first = solver.solve_step(&mut chain, target, &limits, 1, None);
        let StepOutcome::Rotated { angle } = first else {
            panic!("expected a rotation, got {first:?}");
        };
        assert_relative_eq!(angle, 10f32.to_radians(), epsilon = 1e-6);

        let snapshot = chain.clone();
        let second = solver.solve_step(&mut chain, target, &limits, 1, None);
        assert_eq!(second, StepOutcome::Skipped(SkipReason::BudgetExhausted));
        assert_eq!(chain, snapshot);
    }

    #[test]
    fn tip_focus_at_convergence_is_a_no_op_success() {
        let mut chain = straight_chain(3);
        let original = chain.clone();
        let target = Vec3::new(2.0, 0.005, 0.0);

        let solver = CcdSolver::new(0.01);
        let limits = RotationLimitProfile::default_for(3);

        let outcome = solver.solve_step(&mut chain, target, &limits, 2, None);
        assert_eq!(outcome, StepOutcome::FocusIsTip);
        assert!(outcome.reported());
        assert_eq!(chain, original);

        let upstream = solver.solve_step(&mut chain, target, &limits, 1, None);
        assert_eq!(upstream, StepOutcome::Converged);
        assert!(!upstream.reported());
        assert_eq!(chain, original);
    }

    #[test]
    fn target_on_focus_link_is_degenerate() {
        let mut chain = straight_chain(3);
        let original = chain.clone();

        let solver = CcdSolver::new(0.01);
        let limits = RotationLimitProfile::default_for(3);
        let outcome = solver.solve_step(&mut chain, Vec3::new(1.0, 0.0, 0.0), &limits, 1, None);

        assert_eq!(outcome, StepOutcome::Skipped(SkipReason::Degenerate));
        assert!(!outcome.reported());
        assert_eq!(chain, original);
    }

    #[test]
    fn antiparallel_target_is_degenerate() {
        let mut chain = straight_chain(3);
        let solver = CcdSolver::new(0.01);
        let limits = RotationLimitProfile::default_for(3);
        let outcome = solver.solve_step(&mut chain, Vec3::new(-3.0, 0.0, 0.0), &limits, 1, None);
        assert_eq!(outcome, StepOutcome::Skipped(SkipReason::Degenerate));
    }

    #[test]
    fn antiparallel_target_spends_the_budget() {
        let mut chain = straight_chain(3);
        let solver = CcdSolver::new(0.01).with_rotation_limit(true);
        let limits = RotationLimitProfile::default_for(3);
        let before = chain.tip_location();

        let outcome = solver.solve_step(&mut chain, Vec3::new(-3.0, 0.0, 0.0), &limits, 1, None);

        assert_eq!(outcome, StepOutcome::Skipped(SkipReason::Degenerate));
        assert_relative_eq!(
            chain.links()[1].accumulated_rotation,
            limits.limit(1).unwrap(),
            epsilon = 1e-6
        );
        assert_eq!(chain.tip_location(), before);

        let again = solver.solve_step(&mut chain, Vec3::new(2.0, 1.0, 0.0), &limits, 1, None);
        assert_eq!(again, StepOutcome::Skipped(SkipReason::BudgetExhausted));
    }

    #[test]
    fn negative_or_nan_limits_block_rotation() {
        let solver = CcdSolver::new(0.01).with_rotation_limit(true);
        let target = Vec3::new(2.0, 1.0, 0.0);

        for limits in [
            RotationLimitProfile::from_degrees(&[-10.0; 3]),
            RotationLimitProfile::from_radians(vec![f32::NAN; 3]),
        ] {
            let mut chain = straight_chain(3);
            let original = chain.clone();
            let outcome = solver.solve_step(&mut chain, target, &limits, 1, None);
            assert!(!outcome.mutated(), "{outcome:?}");
            assert_eq!(chain, original);
        }
    }

    #[test]
    fn unknown_focus_is_not_in_chain() {
        let mut chain = straight_chain(3);
        let solver = CcdSolver::new(0.01);
        let limits = RotationLimitProfile::default_for(3);
        let outcome = solver.solve_step(&mut chain, Vec3::Y, &limits, 42, None);
        assert_eq!(outcome, StepOutcome::NotInChain);
        assert!(!outcome.reported());
    }

    #[test]
    fn limits_ignored_when_disabled() {
        let mut chain = straight_chain(3);
        let solver = CcdSolver::new(0.01);
        let limits = RotationLimitProfile::from_radians(vec![0.0; 3]);
        let outcome = solver.solve_step(&mut chain, Vec3::new(2.0, 1.0, 0.0), &limits, 1, None);
        assert!(outcome.mutated());
        assert_eq!(chain.links()[1].accumulated_rotation, 0.0);
    }

    #[test]
    fn observer_sees_tip_movement() {
        let mut chain = straight_chain(3);
        let solver = CcdSolver::new(0.01);
        let limits = RotationLimitProfile::default_for(3);
        let mut lines = DebugLines::new();

        solver.solve_step(&mut chain, Vec3::new(2.0, 1.0, 0.0), &limits, 1, Some(&mut lines));

        assert_eq!(lines.tip_moves.len(), 1);
        let (before, after) = lines.tip_moves[0];
        assert!(before.abs_diff_eq(Vec3::new(2.0, 0.0, 0.0), 1e-6));
        assert!(after.abs_diff_eq(chain.tip_location(), 1e-6));
    }

    #[test]
    fn classic_solve_converges_on_reachable_target() {
        let mut chain = straight_chain(3);
        let target = Vec3::new(1.0, 1.0, 0.0);
        let solver = CcdSolver::new(0.01).with_max_iterations(50);
        let limits = RotationLimitProfile::default_for(3);

        let report = solver.solve(&mut chain, target, &limits, None);

        assert!(report.converged, "{report:?}");
        assert!(report.iterations <= 50);
        assert!(report.rotations > 0);
        assert!(chain.tip_location().distance(target) <= 0.01);
        assert_chain_consistent(&chain);
    }

    #[test]
    fn classic_solve_stops_at_iteration_budget() {
        let mut chain = straight_chain(3);
        // out of reach: the chain can only straighten toward it
        let target = Vec3::new(0.0, 10.0, 0.0);
        let solver = CcdSolver::new(0.01).with_max_iterations(4);
        let limits = RotationLimitProfile::default_for(3);

        let report = solver.solve(&mut chain, target, &limits, None);

        assert!(!report.converged);
        assert!(report.iterations <= 4);
        assert_chain_consistent(&chain);
    }

    #[test]
    fn classic_solve_respects_limits() {
        let mut chain = straight_chain(3);
        let limit = 15f32.to_radians();
        let limits = RotationLimitProfile::from_radians(vec![limit; 3]);
        let solver = CcdSolver::new(0.01)
            .with_rotation_limit(true)
            .with_max_iterations(20);

        let report = solver.solve(&mut chain, Vec3::new(0.0, 2.0, 0.0), &limits, None);

        assert!(!report.converged);
        for link in chain.links() {
            assert!(link.accumulated_rotation <= limit + 1e-6);
        }
    }
}
