//! Stage 1: choose which producer/relay and relay/consumer arcs carry goods.
//!
//! Each candidate arc gets an indicator `used` and an integer `volume`. The
//! product `used * volume` is linearized with a big-M pair
//! `volume <= M * used`, `volume >= used`, so an arc is used exactly when it
//! carries at least one unit.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use log::{debug, info, warn};
use serde::Serialize;

use super::instance::{Instance, NodeId};
use super::StageOutcome;
use crate::builder::{LinearExpr, ModelBuilder, Relation, VarRef};
use crate::domain::solve::solve;
use crate::domain::solver::{SolveOptions, Solver};
use crate::error::Result;
use crate::models::{IntegerProgram, SolverDirection, Status};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ArcKind {
    ProducerToRelay,
    RelayToConsumer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CandidateArc {
    pub from: NodeId,
    pub to: NodeId,
    pub kind: ArcKind,
}

/// Columns of one candidate arc
#[derive(Debug, Clone, Copy)]
pub struct ArcVars {
    pub arc: CandidateArc,
    pub used: VarRef,
    pub volume: VarRef,
}

/// Every producer x relay pair followed by every relay x consumer pair
pub fn candidate_arcs(instance: &Instance) -> Vec<CandidateArc> {
    let upstream = instance.producers().flat_map(|p| {
        instance.relays().map(move |n| CandidateArc {
            from: p,
            to: n,
            kind: ArcKind::ProducerToRelay,
        })
    });
    let downstream = instance.relays().flat_map(|n| {
        instance.consumers().map(move |c| CandidateArc {
            from: n,
            to: c,
            kind: ArcKind::RelayToConsumer,
        })
    });
    upstream.chain(downstream).collect()
}

/// Largest volume an arc can ever need to carry
fn volume_bound(instance: &Instance, arc: &CandidateArc) -> i32 {
    match arc.kind {
        ArcKind::ProducerToRelay => (instance.supply(arc.from) as i64).min(instance.total_demand()) as i32,
        ArcKind::RelayToConsumer => instance.demand(arc.to),
    }
}

pub fn build_program(instance: &Instance) -> (IntegerProgram, Vec<ArcVars>) {
    let mut builder = ModelBuilder::new();
    let arcs: Vec<ArcVars> = candidate_arcs(instance)
        .into_iter()
        .map(|arc| {
            let used = builder.add_binary(format!("used[{}->{}]", arc.from, arc.to));
            let volume = builder.add_variable(
                format!("volume[{}->{}]", arc.from, arc.to),
                0,
                volume_bound(instance, &arc),
            );
            ArcVars { arc, used, volume }
        })
        .collect();

    let node_count = instance.nodes().len();
    let mut outflow = vec![LinearExpr::new(); node_count];
    let mut inflow = vec![LinearExpr::new(); node_count];
    let mut net_inflow = vec![LinearExpr::new(); node_count];

    for vars in &arcs {
        let big_m = volume_bound(instance, &vars.arc);
        builder.add_constraint(
            LinearExpr::new().term(vars.volume, 1).term(vars.used, -big_m),
            Relation::Le,
            0,
        );
        builder.add_constraint(
            LinearExpr::new().term(vars.volume, 1).term(vars.used, -1),
            Relation::Ge,
            0,
        );
        outflow[vars.arc.from].add_term(vars.volume, 1);
        inflow[vars.arc.to].add_term(vars.volume, 1);
        net_inflow[vars.arc.to].add_term(vars.volume, 1);
        net_inflow[vars.arc.from].add_term(vars.volume, -1);
    }

    for p in instance.producers() {
        builder.add_constraint(outflow[p].clone(), Relation::Le, instance.supply(p));
    }
    for n in instance.relays() {
        builder.add_constraint(net_inflow[n].clone(), Relation::Eq, 0);
    }
    for c in instance.consumers() {
        builder.add_constraint(inflow[c].clone(), Relation::Eq, instance.demand(c));
    }

    let objective = arcs
        .iter()
        .map(|vars| (vars.used, instance.distance(vars.arc.from, vars.arc.to)))
        .collect();
    builder.set_objective(objective, SolverDirection::Minimize);

    (builder.build(), arcs)
}

/// An arc chosen in stage 1 together with the volume it must carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SelectedArc {
    pub from: NodeId,
    pub to: NodeId,
    pub volume: i64,
    pub distance: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionPlan {
    pub status: Status,
    /// Sum of distances over selected arcs
    pub objective: i64,
    pub selected: Vec<SelectedArc>,
}

/// Volume target for one selected arc
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Goal {
    pub from: NodeId,
    pub to: NodeId,
    pub target: i64,
}

/// Arcs vehicles may traverse in stage 2: every goal arc in both directions
/// plus a self-loop at each endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Corridor {
    pub goals: Vec<Goal>,
    pub paths: BTreeSet<(NodeId, NodeId)>,
}

impl Corridor {
    pub fn new(goals: Vec<Goal>) -> Self {
        let mut paths = BTreeSet::new();
        for goal in &goals {
            paths.insert((goal.from, goal.to));
            paths.insert((goal.to, goal.from));
            paths.insert((goal.from, goal.from));
            paths.insert((goal.to, goal.to));
        }
        Corridor { goals, paths }
    }

    /// Endpoints of all traversable arcs, ascending
    pub fn nodes(&self) -> BTreeSet<NodeId> {
        self.paths.iter().flat_map(|&(i, j)| [i, j]).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.goals.is_empty()
    }
}

impl DistributionPlan {
    pub fn corridor(&self) -> Corridor {
        Corridor::new(
            self.selected
                .iter()
                .map(|arc| Goal {
                    from: arc.from,
                    to: arc.to,
                    target: arc.volume,
                })
                .collect(),
        )
    }

    /// Check supplies, relay balance, exact demand and the reported objective.
    pub fn verify(&self, instance: &Instance) -> std::result::Result<(), String> {
        let mut outflow: BTreeMap<NodeId, i64> = BTreeMap::new();
        let mut inflow: BTreeMap<NodeId, i64> = BTreeMap::new();
        let mut distance = 0i64;

        for arc in &self.selected {
            let valid = (instance.producers().any(|p| p == arc.from) && instance.relays().any(|n| n == arc.to))
                || (instance.relays().any(|n| n == arc.from) && instance.consumers().any(|c| c == arc.to));
            if !valid {
                return Err(format!("{} -> {} is not a candidate arc", arc.from, arc.to));
            }
            if arc.volume < 1 {
                return Err(format!("Selected arc {} -> {} carries {}", arc.from, arc.to, arc.volume));
            }
            *outflow.entry(arc.from).or_default() += arc.volume;
            *inflow.entry(arc.to).or_default() += arc.volume;
            distance += instance.distance(arc.from, arc.to) as i64;
        }

        for p in instance.producers() {
            let shipped = outflow.get(&p).copied().unwrap_or(0);
            if shipped > instance.supply(p) as i64 {
                return Err(format!("Producer {} ships {} above supply {}", p, shipped, instance.supply(p)));
            }
        }
        for n in instance.relays() {
            let received = inflow.get(&n).copied().unwrap_or(0);
            let sent = outflow.get(&n).copied().unwrap_or(0);
            if received != sent {
                return Err(format!("Relay {} receives {} but sends {}", n, received, sent));
            }
        }
        for c in instance.consumers() {
            let received = inflow.get(&c).copied().unwrap_or(0);
            if received != instance.demand(c) as i64 {
                return Err(format!("Consumer {} receives {} but demands {}", c, received, instance.demand(c)));
            }
        }

        if distance != self.objective {
            return Err(format!("Reported distance {} differs from recomputed {}", self.objective, distance));
        }
        Ok(())
    }
}

impl fmt::Display for DistributionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Selected arcs: {}  total distance: {}", self.selected.len(), self.objective)?;
        for arc in &self.selected {
            writeln!(f, "{:>4} -> {:<4} volume {:>5}  distance {:>3}", arc.from, arc.to, arc.volume, arc.distance)?;
        }
        Ok(())
    }
}

/// Select arcs so every consumer receives its demand at minimum total arc distance.
pub fn plan_distribution(
    instance: &Instance,
    solver: &dyn Solver,
    options: &SolveOptions,
) -> Result<StageOutcome<DistributionPlan>> {
    let supply = instance.total_supply();
    let demand = instance.total_demand();
    if supply < demand {
        warn!("Total supply {} cannot cover total demand {}", supply, demand);
        return Ok(StageOutcome::Unsolved(Status::Infeasible));
    }

    let (program, arcs) = build_program(instance);
    debug!(
        "Arc selection model: {} candidate arcs, {} variables, {} rows",
        arcs.len(),
        program.num_variables(),
        program.num_rows()
    );

    let solution = solve(solver, &program, options)?;
    if !solution.status.is_usable() {
        info!("Arc selection ended with status {:?}", solution.status);
        return Ok(StageOutcome::Unsolved(solution.status));
    }

    let value = |var: VarRef| solution.value(&program.polyhedron.variables[var.index()].id);
    let selected: Vec<SelectedArc> = arcs
        .iter()
        .filter(|vars| value(vars.used) == 1)
        .map(|vars| SelectedArc {
            from: vars.arc.from,
            to: vars.arc.to,
            volume: value(vars.volume),
            distance: instance.distance(vars.arc.from, vars.arc.to),
        })
        .collect();

    info!(
        "Selected {} of {} arcs, total distance {}",
        selected.len(),
        arcs.len(),
        solution.objective
    );
    Ok(StageOutcome::Solved(DistributionPlan {
        status: solution.status,
        objective: solution.objective,
        selected,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::instance::DistanceMatrix;
    use crate::domain::solvers::MicrolpSolver;

    /// One producer feeding one consumer through either of two relays
    fn two_relay_instance(supply: i32, demand: i32) -> Instance {
        let mut distances = DistanceMatrix::new(4);
        distances.set_symmetric(0, 1, 5);
        distances.set_symmetric(0, 2, 9);
        distances.set_symmetric(1, 3, 20);
        distances.set_symmetric(2, 3, 7);
        Instance::from_parts(&[supply], 2, &[demand], Vec::new(), distances).unwrap()
    }

    #[test]
    fn test_candidate_arcs_order() {
        let arcs = candidate_arcs(&two_relay_instance(10, 5));
        let pairs: Vec<(NodeId, NodeId)> = arcs.iter().map(|a| (a.from, a.to)).collect();
        assert_eq!(pairs, vec![(0, 1), (0, 2), (1, 3), (2, 3)]);
        assert_eq!(arcs[1].kind, ArcKind::ProducerToRelay);
        assert_eq!(arcs[2].kind, ArcKind::RelayToConsumer);
    }

    #[test]
    fn test_program_shape() {
        let (program, arcs) = build_program(&two_relay_instance(10, 5));
        assert_eq!(arcs.len(), 4);
        assert_eq!(program.num_variables(), 8);
        // two linking rows per arc, one producer row, relay and consumer equalities as pairs
        assert_eq!(program.num_rows(), 8 + 1 + 2 * 2 + 2);
        let volume = &program.polyhedron.variables[arcs[0].volume.index()];
        assert_eq!(volume.bound, (0, 5));
    }

    #[test]
    fn test_picks_cheapest_relay() {
        let instance = two_relay_instance(10, 5);
        let outcome = plan_distribution(&instance, &MicrolpSolver::new(), &SolveOptions::default()).unwrap();
        let plan = outcome.plan().unwrap();

        assert_eq!(plan.objective, 16);
        let pairs: Vec<(NodeId, NodeId)> = plan.selected.iter().map(|a| (a.from, a.to)).collect();
        assert_eq!(pairs, vec![(0, 2), (2, 3)]);
        assert!(plan.selected.iter().all(|a| a.volume == 5));
        assert_eq!(plan.verify(&instance), Ok(()));
    }

    #[test]
    fn test_short_supply_is_infeasible_without_solving() {
        let instance = two_relay_instance(3, 5);
        let outcome = plan_distribution(&instance, &MicrolpSolver::new(), &SolveOptions::default()).unwrap();
        assert_eq!(outcome, StageOutcome::Unsolved(Status::Infeasible));
    }

    #[test]
    fn test_zero_demand_selects_nothing() {
        let instance = two_relay_instance(10, 0);
        let outcome = plan_distribution(&instance, &MicrolpSolver::new(), &SolveOptions::default()).unwrap();
        let plan = outcome.plan().unwrap();
        assert!(plan.selected.is_empty());
        assert_eq!(plan.objective, 0);
        assert!(plan.corridor().is_empty());
    }

    #[test]
    fn test_corridor_adds_reverse_arcs_and_self_loops() {
        let corridor = Corridor::new(vec![
            Goal { from: 0, to: 2, target: 5 },
            Goal { from: 2, to: 3, target: 5 },
        ]);
        let paths: Vec<(NodeId, NodeId)> = corridor.paths.iter().copied().collect();
        assert_eq!(paths, vec![(0, 0), (0, 2), (2, 0), (2, 2), (2, 3), (3, 2), (3, 3)]);
        assert_eq!(corridor.nodes().into_iter().collect::<Vec<_>>(), vec![0, 2, 3]);
    }

    #[test]
    fn test_verify_flags_unmet_demand() {
        let instance = two_relay_instance(10, 5);
        let plan = DistributionPlan {
            status: Status::Optimal,
            objective: 16,
            selected: vec![
                SelectedArc { from: 0, to: 2, volume: 4, distance: 9 },
                SelectedArc { from: 2, to: 3, volume: 4, distance: 7 },
            ],
        };
        assert!(plan.verify(&instance).unwrap_err().contains("Consumer 3"));
    }
}
