use std::fmt;

use serde::Serialize;

use super::{DistributionPlan, PipelineOutcome, RoutePlan, StageOutcome};
use crate::error::Result;

pub const NO_SOLUTION: &str = "no solution";

#[derive(Debug, Serialize)]
struct Report<'a> {
    nodes: usize,
    vehicles: usize,
    total_supply: i64,
    total_demand: i64,
    stage1: &'a StageOutcome<DistributionPlan>,
    stage2: Option<&'a StageOutcome<RoutePlan>>,
}

/// Plain-text report: selected arcs, then one `vehicle,step,node` line per occupancy.
impl fmt::Display for PipelineOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Stage 1 (arc selection)")?;
        match &self.stage1 {
            StageOutcome::Solved(plan) => write!(f, "{}", plan)?,
            StageOutcome::Unsolved(_) => writeln!(f, "{}", NO_SOLUTION)?,
        }

        if let Some(stage2) = &self.stage2 {
            writeln!(f)?;
            match stage2 {
                StageOutcome::Solved(plan) => {
                    writeln!(f, "Stage 2 (routing): total cost {}", plan.objective)?;
                    write!(f, "{}", plan)?;
                }
                StageOutcome::Unsolved(_) => {
                    writeln!(f, "Stage 2 (routing)")?;
                    writeln!(f, "{}", NO_SOLUTION)?;
                }
            }
        }
        Ok(())
    }
}

pub fn render_json(outcome: &PipelineOutcome) -> Result<String> {
    let report = Report {
        nodes: outcome.instance.nodes().len(),
        vehicles: outcome.instance.vehicles().len(),
        total_supply: outcome.instance.total_supply(),
        total_demand: outcome.instance.total_demand(),
        stage1: &outcome.stage1,
        stage2: outcome.stage2.as_ref(),
    };
    Ok(serde_json::to_string_pretty(&report)?)
}
