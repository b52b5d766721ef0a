//! Multi-chain orchestration
//!
//! A [`MultiChainController`] holds chain definitions in registration order.
//! Each tick it rebuilds every chain from the host pose, resolves targets,
//! then walks the host's relevant bones and applies exactly one solver step
//! per bone to the first registered chain containing it. Convergence emerges
//! over successive ticks; [`SolveMode::Converge`] switches to the classic
//! per-chain loop instead.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::chain::{BoneKey, Chain, ChainBuilder};
use crate::config::{SolveMode, SolverSettings};
use crate::debug::{StepObserver, reborrow_observer};
use crate::error::{IkError, IkResult};
use crate::limits::RotationLimitProfile;
use crate::pose::{PoseSink, PoseSource};
use crate::solver::CcdSolver;
use crate::target::EffectorTarget;

/// Host-authored chain definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainSetup<I> {
    pub name: String,
    pub tip: I,
    pub root: I,
    pub target: EffectorTarget<I>,
    /// Per-link limits in degrees, root first. `None` uses the default profile.
    #[serde(default)]
    pub rotation_limits_degrees: Option<Vec<f32>>,
}

impl<I: BoneKey> ChainSetup<I> {
    pub fn new(name: impl Into<String>, tip: I, root: I, target: EffectorTarget<I>) -> Self {
        Self {
            name: name.into(),
            tip,
            root,
            target,
            rotation_limits_degrees: None,
        }
    }

    pub fn with_rotation_limits_degrees(mut self, degrees: Vec<f32>) -> Self {
        self.rotation_limits_degrees = Some(degrees);
        self
    }

    /// Limit profile for a built chain of `len` links
    pub fn limit_profile(&self, len: usize) -> IkResult<RotationLimitProfile> {
        let Some(degrees) = &self.rotation_limits_degrees else {
            return Ok(RotationLimitProfile::default_for(len));
        };
        if let Some((position, &degrees)) = degrees
            .iter()
            .take(len)
            .enumerate()
            .find(|(_, d)| !d.is_finite() || **d < 0.0)
        {
            return Err(IkError::InvalidRotationLimit { position, degrees });
        }
        Ok(RotationLimitProfile::fitted_degrees(degrees, len))
    }
}

/// A built chain with its resolved target and limits, valid for one tick
#[derive(Debug, Clone)]
pub struct ActiveChain<I> {
    pub name: String,
    pub chain: Chain<I>,
    pub target: Vec3,
    pub limits: RotationLimitProfile,
}

impl<I: BoneKey> ActiveChain<I> {
    pub fn new(
        name: impl Into<String>,
        chain: Chain<I>,
        target: Vec3,
        limits: RotationLimitProfile,
    ) -> IkResult<Self> {
        if limits.len() != chain.len() {
            return Err(IkError::LimitProfileMismatch {
                expected: chain.len(),
                actual: limits.len(),
            });
        }
        Ok(Self {
            name: name.into(),
            chain,
            target,
            limits,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChainStatus {
    Active,
    /// Chain could not be set up this tick; other chains were unaffected
    Skipped(IkError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChainReport {
    pub name: String,
    pub status: ChainStatus,
    /// Rotations applied to this chain during the tick
    pub rotations: usize,
    /// Tip within tolerance of the target after the tick
    pub converged: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// One entry per registered chain, in registration order
    pub chains: Vec<ChainReport>,
    /// Solver invocations performed
    pub solver_calls: usize,
    /// Whether solved transforms were written to the sink
    pub published: bool,
}

impl TickReport {
    pub fn chain(&self, name: &str) -> Option<&ChainReport> {
        self.chains.iter().find(|report| report.name == name)
    }

    pub fn total_rotations(&self) -> usize {
        self.chains.iter().map(|report| report.rotations).sum()
    }
}

/// Outcome of one pass over the relevant bones
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Any solver call reported true
    pub reported: bool,
    /// Rotations per chain, index-aligned with the chain slice
    pub rotations: Vec<usize>,
    pub solver_calls: usize,
}

/// Apply one solver step per relevant bone, first-registered-chain-wins.
pub fn run_pass<I: BoneKey>(
    chains: &mut [ActiveChain<I>],
    relevant: &[I],
    solver: &CcdSolver,
    mut observer: Option<&mut dyn StepObserver<I>>,
) -> PassSummary {
    let mut summary = PassSummary {
        rotations: vec![0; chains.len()],
        ..Default::default()
    };

    for &bone in relevant {
        let Some(index) = chains.iter().position(|active| active.chain.contains(bone)) else {
            continue;
        };

        let active = &mut chains[index];
        let outcome = solver.solve_step(
            &mut active.chain,
            active.target,
            &active.limits,
            bone,
            reborrow_observer(&mut observer),
        );
        summary.solver_calls += 1;
        summary.reported |= outcome.reported();
        if outcome.mutated() {
            summary.rotations[index] += 1;
        }
    }

    summary
}

/// Write every chain's world transforms to `sink` by source id.
///
/// Zero-length children receive their link's transform. Returns the number of
/// sink entries written.
pub fn publish<I: BoneKey, S: PoseSink<I> + ?Sized>(
    chains: &[ActiveChain<I>],
    sink: &mut S,
    mut observer: Option<&mut dyn StepObserver<I>>,
) -> usize {
    let mut written = 0;
    for active in chains {
        for link in active.chain.links() {
            if sink.write_world_transform(link.source_id, link.world_transform) {
                written += 1;
            }
            for &child in &link.zero_length_children {
                if sink.write_world_transform(child, link.world_transform) {
                    written += 1;
                }
            }
        }
        if let Some(observer) = observer.as_deref_mut() {
            observer.chain_published(&active.chain.world_positions());
        }
    }
    written
}

/// Drives several independent chains from one update loop.
#[derive(Debug, Clone)]
pub struct MultiChainController<I> {
    setups: Vec<ChainSetup<I>>,
    settings: SolverSettings,
}

impl<I: BoneKey> MultiChainController<I> {
    pub fn new(settings: SolverSettings) -> IkResult<Self> {
        settings.validate()?;
        Ok(Self {
            setups: Vec::new(),
            settings,
        })
    }

    pub fn settings(&self) -> &SolverSettings {
        &self.settings
    }

    /// Register a chain. Registration order decides which chain wins when a
    /// bone belongs to more than one. Returns the registration index.
    pub fn register(&mut self, setup: ChainSetup<I>) -> usize {
        self.setups.push(setup);
        self.setups.len() - 1
    }

    pub fn setups(&self) -> &[ChainSetup<I>] {
        &self.setups
    }

    pub fn clear(&mut self) {
        self.setups.clear();
    }

    /// Build a chain, resolve its target and derive its limits for this tick.
    pub fn activate<P>(&self, setup: &ChainSetup<I>, pose: &P) -> IkResult<ActiveChain<I>>
    where
        P: PoseSource<I> + ?Sized,
    {
        let builder = ChainBuilder::new(self.settings.max_hierarchy_depth);
        let chain = builder.build(setup.tip, setup.root, pose)?;
        let target = setup.target.resolve(pose)?;
        let limits = setup.limit_profile(chain.len())?;
        ActiveChain::new(setup.name.clone(), chain, target, limits)
    }

    /// Run one evaluation tick.
    ///
    /// `relevant` lists the host's bones of interest in processing order.
    /// Chains that fail to build are skipped for this tick and reported.
    pub fn evaluate<P, S>(
        &self,
        pose: &P,
        relevant: &[I],
        sink: &mut S,
        mut observer: Option<&mut dyn StepObserver<I>>,
    ) -> TickReport
    where
        P: PoseSource<I> + ?Sized,
        S: PoseSink<I> + ?Sized,
    {
        let solver = CcdSolver::from_settings(&self.settings);

        let mut report = TickReport::default();
        let mut active = Vec::with_capacity(self.setups.len());
        let mut report_index = Vec::with_capacity(self.setups.len());

        for setup in &self.setups {
            let status = match self.activate(setup, pose) {
                Ok(chain) => {
                    report_index.push(report.chains.len());
                    active.push(chain);
                    ChainStatus::Active
                }
                Err(err) => {
                    warn!("Skipping chain '{}' this tick: {}", setup.name, err);
                    ChainStatus::Skipped(err)
                }
            };
            report.chains.push(ChainReport {
                name: setup.name.clone(),
                status,
                rotations: 0,
                converged: false,
            });
        }

        let reported = match self.settings.mode {
            SolveMode::PerLinkTick => {
                let summary =
                    run_pass(&mut active, relevant, &solver, reborrow_observer(&mut observer));
                report.solver_calls = summary.solver_calls;
                for (index, rotations) in summary.rotations.into_iter().enumerate() {
                    report.chains[report_index[index]].rotations = rotations;
                }
                summary.reported
            }
            SolveMode::Converge => {
                let mut moved = false;
                for (index, chain) in active.iter_mut().enumerate() {
                    let solve = solver.solve(
                        &mut chain.chain,
                        chain.target,
                        &chain.limits,
                        reborrow_observer(&mut observer),
                    );
                    report.solver_calls += 1;
                    report.chains[report_index[index]].rotations = solve.rotations;
                    moved |= solve.rotations > 0;
                }
                moved
            }
        };

        for (index, chain) in active.iter().enumerate() {
            report.chains[report_index[index]].converged =
                chain.chain.tip_location().distance(chain.target) <= self.settings.precision;
        }

        if reported {
            publish(&active, sink, observer);
            report.published = true;
        }

        debug!(
            "IK tick: {} chains active, {} solver calls, {} rotations, published={}",
            active.len(),
            report.solver_calls,
            report.total_rotations(),
            report.published
        );
        report
    }
}
