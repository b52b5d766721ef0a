//! Headless tick loop
//!
//! The runner owns the skeleton and plays the host's part: each tick it hands
//! the current pose to the controller, collects the published transforms in
//! an output buffer and writes them back so the next tick starts from them.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use rk_ik::{
    BoneTransform, ChainStatus, MultiChainController, PoseSink, PoseSource, Skeleton,
    StepObserver, TickReport, reborrow_observer,
};

use crate::scene::{Scene, SceneError};

/// Final state of one chain after a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainSummary {
    pub name: String,
    /// `None` when the chain was active, otherwise the reason it was skipped
    pub skipped: Option<String>,
    pub rotations: usize,
    pub converged: bool,
    /// Tick after which the chain first reached its target
    pub converged_at: Option<u32>,
    pub tip: Option<[f32; 3]>,
    pub target: Option<[f32; 3]>,
    pub distance: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BonePose {
    pub name: String,
    pub location: [f32; 3],
    /// Quaternion as x, y, z, w
    pub rotation: [f32; 4],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub scene: String,
    pub ticks: u32,
    pub chains: Vec<ChainSummary>,
    pub bones: Vec<BonePose>,
}

pub struct Runner {
    scene_name: String,
    skeleton: Skeleton,
    controller: MultiChainController<Uuid>,
    relevant: Vec<Uuid>,
    ticks_run: u32,
    rotations: HashMap<String, usize>,
    converged_at: HashMap<String, u32>,
    last_report: TickReport,
}

impl Runner {
    pub fn from_scene(scene: &Scene) -> Result<Self, SceneError> {
        let skeleton = scene.build_skeleton()?;
        let relevant = scene.resolve_relevant(&skeleton)?;

        let mut controller = MultiChainController::new(scene.settings.clone())?;
        for setup in scene.resolve_chains(&skeleton)? {
            controller.register(setup);
        }

        info!(
            "Loaded scene '{}': {} bones, {} chains",
            scene.name,
            skeleton.len(),
            controller.setups().len()
        );

        Ok(Self {
            scene_name: scene.name.clone(),
            skeleton,
            controller,
            relevant,
            ticks_run: 0,
            rotations: HashMap::new(),
            converged_at: HashMap::new(),
            last_report: TickReport::default(),
        })
    }

    pub fn skeleton(&self) -> &Skeleton {
        &self.skeleton
    }

    pub fn ticks_run(&self) -> u32 {
        self.ticks_run
    }

    /// Run one evaluation tick and apply the published pose
    pub fn tick(&mut self, observer: Option<&mut dyn StepObserver<Uuid>>) -> &TickReport {
        let input: Vec<BoneTransform<Uuid>> = self
            .skeleton
            .bones_depth_first()
            .into_iter()
            .filter_map(|id| {
                self.skeleton
                    .world_transform_of(id)
                    .map(|transform| BoneTransform::new(id, transform))
            })
            .collect();
        let mut output = input.clone();

        let report = self
            .controller
            .evaluate(&self.skeleton, &self.relevant, &mut output, observer);

        if report.published {
            // Depth-first, so every parent is final before its children are
            // written. Untouched bones follow their parents.
            for (before, after) in input.iter().zip(&output) {
                if before != after {
                    self.skeleton.write_world_transform(after.bone, after.transform);
                }
            }
        }

        self.ticks_run += 1;
        for chain in &report.chains {
            *self.rotations.entry(chain.name.clone()).or_default() += chain.rotations;
            if chain.converged {
                self.converged_at.entry(chain.name.clone()).or_insert(self.ticks_run);
            }
        }

        debug!(
            "Tick {}: {} rotations, published={}",
            self.ticks_run,
            report.total_rotations(),
            report.published
        );
        self.last_report = report;
        &self.last_report
    }

    /// Run `ticks` ticks and summarize the final state
    pub fn run(
        &mut self,
        ticks: u32,
        mut observer: Option<&mut dyn StepObserver<Uuid>>,
    ) -> RunSummary {
        for _ in 0..ticks {
            self.tick(reborrow_observer(&mut observer));
        }
        let summary = self.summary();
        for chain in &summary.chains {
            match (&chain.skipped, chain.distance) {
                (Some(reason), _) => info!("Chain '{}' skipped: {}", chain.name, reason),
                (None, Some(distance)) => info!(
                    "Chain '{}': converged={} distance={:.4} rotations={}",
                    chain.name, chain.converged, distance, chain.rotations
                ),
                (None, None) => {}
            }
        }
        summary
    }

    pub fn summary(&self) -> RunSummary {
        let chains = self
            .controller
            .setups()
            .iter()
            .map(|setup| {
                let report = self.last_report.chain(&setup.name);
                let skipped = report.and_then(|r| match &r.status {
                    ChainStatus::Skipped(err) => Some(err.to_string()),
                    ChainStatus::Active => None,
                });
                let tip = self.skeleton.world_transform_of(setup.tip).map(|t| t.location());
                let target = setup.target.resolve(&self.skeleton).ok();
                let distance = tip.zip(target).map(|(tip, target)| tip.distance(target));

                ChainSummary {
                    name: setup.name.clone(),
                    skipped,
                    rotations: self.rotations.get(&setup.name).copied().unwrap_or(0),
                    converged: report.is_some_and(|r| r.converged),
                    converged_at: self.converged_at.get(&setup.name).copied(),
                    tip: tip.map(|v| v.to_array()),
                    target: target.map(|v| v.to_array()),
                    distance,
                }
            })
            .collect();

        let bones = self
            .skeleton
            .bones_depth_first()
            .into_iter()
            .filter_map(|id| self.skeleton.bone(id))
            .map(|bone| BonePose {
                name: bone.name.clone(),
                location: bone.world.location().to_array(),
                rotation: bone.world.rotation.to_array(),
            })
            .collect();

        RunSummary {
            scene: self.scene_name.clone(),
            ticks: self.ticks_run,
            chains,
            bones,
        }
    }
}
