//! Two-stage distribution: arc selection between producers, relays and
//! consumers, then vehicle routing over the selected corridor.

pub mod instance;
pub mod planning;
pub mod report;
pub mod routing;

use std::time::Instant;

use log::{info, warn};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::config::AppConfig;
use crate::domain::solver::{SolveOptions, Solver};
use crate::error::Result;
use crate::models::Status;

pub use instance::{DistanceMatrix, Instance, Node, NodeId, NodeRole, Vehicle};
pub use planning::{plan_distribution, Corridor, DistributionPlan, Goal, SelectedArc};
pub use routing::{plan_routes, Assignment, RoutePlan, RoutingParams};

/// Result of one stage: a usable plan, or the status that prevented one
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "result", rename_all = "lowercase")]
pub enum StageOutcome<T> {
    Solved(T),
    Unsolved(Status),
}

impl<T> StageOutcome<T> {
    pub fn plan(&self) -> Option<&T> {
        match self {
            StageOutcome::Solved(plan) => Some(plan),
            StageOutcome::Unsolved(_) => None,
        }
    }

    pub fn is_solved(&self) -> bool {
        matches!(self, StageOutcome::Solved(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineOutcome {
    #[serde(skip)]
    pub instance: Instance,
    pub stage1: StageOutcome<DistributionPlan>,
    /// `None` when stage 1 produced no plan
    pub stage2: Option<StageOutcome<RoutePlan>>,
}

/// Run both stages on an existing instance. Stage 2 only runs when stage 1 is solved.
pub fn run_stages(
    instance: Instance,
    params: &RoutingParams,
    solver: &dyn Solver,
    stage1_options: &SolveOptions,
    stage2_options: &SolveOptions,
) -> Result<PipelineOutcome> {
    let start = Instant::now();
    let stage1 = plan_distribution(&instance, solver, stage1_options)?;

    let stage2 = match stage1.plan() {
        Some(plan) => {
            let corridor = plan.corridor();
            info!(
                "Corridor: {} goal arcs, {} traversable arcs over {} nodes",
                corridor.goals.len(),
                corridor.paths.len(),
                corridor.nodes().len()
            );
            Some(plan_routes(&instance, &corridor, params, solver, stage2_options)?)
        }
        None => {
            warn!("Stage 1 was not solved; skipping routing");
            None
        }
    };

    info!("Distribution pipeline finished in {:?}", start.elapsed());
    Ok(PipelineOutcome {
        instance,
        stage1,
        stage2,
    })
}

/// Generate the seeded instance described by `config` and run both stages on it.
pub fn run_pipeline(config: &AppConfig, solver: &dyn Solver) -> Result<PipelineOutcome> {
    let settings = &config.instance;
    let mut rng = ChaCha8Rng::seed_from_u64(settings.seed);
    let instance = Instance::generate(settings, &mut rng)?;
    info!(
        "Generated instance (seed {}): {} producers, {} relays, {} consumers, {} vehicles, supply {} / demand {}",
        settings.seed,
        settings.producers,
        settings.relays,
        settings.consumers,
        settings.vehicles,
        instance.total_supply(),
        instance.total_demand()
    );

    let params = RoutingParams {
        horizon: settings.horizon,
        max_distance: settings.max_distance,
    };
    run_stages(
        instance,
        &params,
        solver,
        &SolveOptions::with_time_limit(config.stage1_time_limit),
        &SolveOptions::with_time_limit(config.stage2_time_limit),
    )
}
