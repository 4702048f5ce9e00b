//! Stage 2: route vehicles along the corridor so every goal arc is covered.
//!
//! `at[v,t,n]` places vehicle `v` on node `n` at step `t`. A transition
//! binary `move[v,t,i,j]` stands for `at[v,t,i] AND at[v,t+1,j]` (successor
//! taken modulo the horizon) and is tied to its operands by three
//! inequalities. Only transitions inside `t < H - 1` count toward coverage,
//! distance and cost; the wrap-around step just has to stay on the corridor.

use std::collections::BTreeMap;
use std::fmt;

use log::{debug, info};
use serde::Serialize;

use super::instance::{Instance, NodeId};
use super::planning::Corridor;
use super::StageOutcome;
use crate::builder::{LinearExpr, ModelBuilder, Relation, VarRef};
use crate::domain::solve::solve;
use crate::domain::solver::{SolveOptions, Solver};
use crate::error::Result;
use crate::models::{IntegerProgram, SolverDirection, Status};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoutingParams {
    /// Number of time steps in a tour
    pub horizon: usize,
    /// Per-vehicle distance budget
    pub max_distance: i32,
}

/// Columns of the routing model, indexed `[vehicle][step][position]`
#[derive(Debug, Clone)]
pub struct RoutingVars {
    /// Corridor nodes; positions in `at` follow this order
    pub nodes: Vec<NodeId>,
    /// Traversable arcs; positions in `moves` follow this order
    pub paths: Vec<(NodeId, NodeId)>,
    pub at: Vec<Vec<Vec<VarRef>>>,
    pub moves: Vec<Vec<Vec<VarRef>>>,
}

pub fn build_program(
    instance: &Instance,
    corridor: &Corridor,
    params: &RoutingParams,
) -> (IntegerProgram, RoutingVars) {
    let nodes: Vec<NodeId> = corridor.nodes().into_iter().collect();
    let paths: Vec<(NodeId, NodeId)> = corridor.paths.iter().copied().collect();
    let position: BTreeMap<NodeId, usize> = nodes.iter().enumerate().map(|(k, &n)| (n, k)).collect();
    let horizon = params.horizon;
    let counted_steps = horizon.saturating_sub(1);

    let mut builder = ModelBuilder::new();
    let mut at = Vec::with_capacity(instance.vehicles().len());
    let mut moves = Vec::with_capacity(instance.vehicles().len());

    for vehicle in instance.vehicles() {
        let v = vehicle.id;
        let vehicle_at: Vec<Vec<VarRef>> = (0..horizon)
            .map(|t| {
                nodes
                    .iter()
                    .map(|n| builder.add_binary(format!("at[{},{},{}]", v, t, n)))
                    .collect()
            })
            .collect();

        for step in &vehicle_at {
            let occupancy = step.iter().map(|&var| (var, 1)).collect();
            builder.add_constraint(occupancy, Relation::Eq, 1);
        }

        let mut vehicle_moves = Vec::with_capacity(horizon);
        for t in 0..horizon {
            let next = (t + 1) % horizon;
            let mut step_moves = Vec::with_capacity(paths.len());
            for &(i, j) in &paths {
                let from = vehicle_at[t][position[&i]];
                let to = vehicle_at[next][position[&j]];
                let transition = builder.add_binary(format!("move[{},{},{},{}]", v, t, i, j));

                builder.add_constraint(
                    LinearExpr::new().term(transition, 1).term(from, -1),
                    Relation::Le,
                    0,
                );
                builder.add_constraint(
                    LinearExpr::new().term(transition, 1).term(to, -1),
                    Relation::Le,
                    0,
                );
                builder.add_constraint(
                    LinearExpr::new().term(from, 1).term(to, 1).term(transition, -1),
                    Relation::Le,
                    1,
                );
                step_moves.push(transition);
            }

            let follow_corridor = step_moves.iter().map(|&var| (var, 1)).collect();
            builder.add_constraint(follow_corridor, Relation::Eq, 1);
            vehicle_moves.push(step_moves);
        }

        if horizon >= 2 {
            for k in 0..nodes.len() {
                builder.add_constraint(
                    LinearExpr::new()
                        .term(vehicle_at[0][k], 1)
                        .term(vehicle_at[horizon - 1][k], -1),
                    Relation::Eq,
                    0,
                );
            }
        }

        let travelled = vehicle_moves[..counted_steps]
            .iter()
            .flat_map(|step| step.iter().zip(&paths))
            .map(|(&var, &(i, j))| (var, instance.distance(i, j)))
            .collect();
        builder.add_constraint(travelled, Relation::Le, params.max_distance);

        at.push(vehicle_at);
        moves.push(vehicle_moves);
    }

    for goal in &corridor.goals {
        // a goal outside the traversable arcs keeps an empty row and can never be covered
        let coverage = match paths.iter().position(|&arc| arc == (goal.from, goal.to)) {
            Some(k) => instance
                .vehicles()
                .iter()
                .zip(&moves)
                .flat_map(|(vehicle, vehicle_moves)| {
                    vehicle_moves[..counted_steps]
                        .iter()
                        .map(move |step| (step[k], vehicle.capacity))
                })
                .collect(),
            None => LinearExpr::new(),
        };
        builder.add_constraint(coverage, Relation::Ge, goal.target.min(i32::MAX as i64) as i32);
    }

    let objective = instance
        .vehicles()
        .iter()
        .zip(&moves)
        .flat_map(|(vehicle, vehicle_moves)| {
            let paths = &paths;
            vehicle_moves[..counted_steps].iter().flat_map(move |step| {
                step.iter()
                    .zip(paths)
                    .map(move |(&var, &(i, j))| (var, instance.distance(i, j) * vehicle.cost_per_distance))
            })
        })
        .collect();
    builder.set_objective(objective, SolverDirection::Minimize);

    (
        builder.build(),
        RoutingVars {
            nodes,
            paths,
            at,
            moves,
        },
    )
}

/// Vehicle `vehicle` is on `node` at `step`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Assignment {
    pub vehicle: usize,
    pub step: usize,
    pub node: NodeId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutePlan {
    pub status: Status,
    /// Total travel cost over all vehicles
    pub objective: i64,
    /// Ordered by vehicle, then step
    pub assignments: Vec<Assignment>,
}

impl RoutePlan {
    fn empty() -> Self {
        RoutePlan {
            status: Status::Optimal,
            objective: 0,
            assignments: Vec::new(),
        }
    }

    /// Nodes visited by `vehicle`, one per step
    pub fn route(&self, vehicle: usize) -> Vec<NodeId> {
        self.assignments
            .iter()
            .filter(|a| a.vehicle == vehicle)
            .map(|a| a.node)
            .collect()
    }

    /// Distance travelled by `vehicle` over the counted steps
    pub fn route_distance(&self, instance: &Instance, vehicle: usize) -> i64 {
        self.route(vehicle)
            .windows(2)
            .map(|pair| instance.distance(pair[0], pair[1]) as i64)
            .sum()
    }

    /// Check tours, corridor adherence, distance budgets, coverage and the reported cost.
    pub fn verify(
        &self,
        instance: &Instance,
        corridor: &Corridor,
        params: &RoutingParams,
    ) -> std::result::Result<(), String> {
        if corridor.is_empty() {
            return if self.assignments.is_empty() && self.objective == 0 {
                Ok(())
            } else {
                Err("Routes reported for an empty corridor".to_string())
            };
        }

        let mut covered: BTreeMap<(NodeId, NodeId), i64> = BTreeMap::new();
        let mut cost = 0i64;

        for vehicle in instance.vehicles() {
            let route = self.route(vehicle.id);
            if route.len() != params.horizon {
                return Err(format!(
                    "Vehicle {} has {} steps instead of {}",
                    vehicle.id,
                    route.len(),
                    params.horizon
                ));
            }
            if route.first() != route.last() {
                return Err(format!("Vehicle {} does not close its tour", vehicle.id));
            }
            for t in 0..route.len() {
                let arc = (route[t], route[(t + 1) % route.len()]);
                if !corridor.paths.contains(&arc) {
                    return Err(format!(
                        "Vehicle {} leaves the corridor at step {}: {} -> {}",
                        vehicle.id, t, arc.0, arc.1
                    ));
                }
            }
            for pair in route.windows(2) {
                *covered.entry((pair[0], pair[1])).or_default() += vehicle.capacity as i64;
            }

            let distance = self.route_distance(instance, vehicle.id);
            if distance > params.max_distance as i64 {
                return Err(format!(
                    "Vehicle {} travels {} above the limit {}",
                    vehicle.id, distance, params.max_distance
                ));
            }
            cost += distance * vehicle.cost_per_distance as i64;
        }

        for goal in &corridor.goals {
            let moved = covered.get(&(goal.from, goal.to)).copied().unwrap_or(0);
            if moved < goal.target {
                return Err(format!(
                    "Arc {} -> {} is covered for {} of {}",
                    goal.from, goal.to, moved, goal.target
                ));
            }
        }

        if cost != self.objective {
            return Err(format!("Reported cost {} differs from recomputed {}", self.objective, cost));
        }
        Ok(())
    }
}

impl fmt::Display for RoutePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for a in &self.assignments {
            writeln!(f, "{},{},{}", a.vehicle, a.step, a.node)?;
        }
        Ok(())
    }
}

/// Route the fleet so each goal arc is traversed with enough capacity at minimum cost.
pub fn plan_routes(
    instance: &Instance,
    corridor: &Corridor,
    params: &RoutingParams,
    solver: &dyn Solver,
    options: &SolveOptions,
) -> Result<StageOutcome<RoutePlan>> {
    if corridor.is_empty() {
        info!("No goal arcs to cover; routing is trivial");
        return Ok(StageOutcome::Solved(RoutePlan::empty()));
    }

    let (program, vars) = build_program(instance, corridor, params);
    debug!(
        "Routing model: {} vehicles, horizon {}, {} nodes, {} arcs, {} variables, {} rows",
        instance.vehicles().len(),
        params.horizon,
        vars.nodes.len(),
        vars.paths.len(),
        program.num_variables(),
        program.num_rows()
    );

    let solution = solve(solver, &program, options)?;
    if !solution.status.is_usable() {
        info!("Routing ended with status {:?}", solution.status);
        return Ok(StageOutcome::Unsolved(solution.status));
    }

    let value = |var: VarRef| solution.value(&program.polyhedron.variables[var.index()].id);
    let mut assignments = Vec::new();
    for (vehicle, steps) in instance.vehicles().iter().zip(&vars.at) {
        for (step, occupancy) in steps.iter().enumerate() {
            for (&node, &var) in vars.nodes.iter().zip(occupancy) {
                if value(var) == 1 {
                    assignments.push(Assignment {
                        vehicle: vehicle.id,
                        step,
                        node,
                    });
                }
            }
        }
    }
    assignments.sort();

    info!(
        "Routed {} vehicles, total cost {}",
        instance.vehicles().len(),
        solution.objective
    );
    Ok(StageOutcome::Solved(RoutePlan {
        status: solution.status,
        objective: solution.objective,
        assignments,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::instance::{DistanceMatrix, Vehicle};
    use crate::distribution::planning::Goal;
    use crate::domain::solvers::MicrolpSolver;

    fn instance(vehicles: usize) -> Instance {
        let mut distances = DistanceMatrix::new(3);
        distances.set_symmetric(0, 1, 10);
        distances.set_symmetric(1, 2, 20);
        let fleet = (0..vehicles)
            .map(|id| Vehicle {
                id,
                capacity: 50,
                cost_per_distance: 4,
            })
            .collect();
        Instance::from_parts(&[100], 1, &[50], fleet, distances).unwrap()
    }

    fn corridor(target: i64) -> Corridor {
        Corridor::new(vec![Goal { from: 0, to: 1, target }])
    }

    #[test]
    fn test_program_shape() {
        let params = RoutingParams {
            horizon: 3,
            max_distance: 100,
        };
        let (program, vars) = build_program(&instance(1), &corridor(50), &params);

        assert_eq!(vars.nodes, vec![0, 1]);
        assert_eq!(vars.paths, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
        // 3 steps x 2 nodes occupancy, 3 steps x 4 transitions
        assert_eq!(program.num_variables(), 6 + 12);
        assert_eq!(vars.moves[0].len(), 3);
    }

    #[test]
    fn test_single_vehicle_round_trip() {
        let instance = instance(1);
        let corridor = corridor(50);
        let params = RoutingParams {
            horizon: 3,
            max_distance: 500,
        };
        let outcome = plan_routes(&instance, &corridor, &params, &MicrolpSolver::new(), &SolveOptions::default()).unwrap();
        let plan = outcome.plan().unwrap();

        assert_eq!(plan.objective, 80);
        let route = plan.route(0);
        assert_eq!(route.len(), 3);
        assert_eq!(route[0], route[2]);
        assert_ne!(route[0], route[1]);
        assert_eq!(plan.route_distance(&instance, 0), 20);
        assert_eq!(plan.verify(&instance, &corridor, &params), Ok(()));

        let printed = plan.to_string();
        assert_eq!(printed.lines().count(), 3);
        assert!(printed.starts_with(&format!("0,0,{}\n", route[0])));
    }

    #[test]
    fn test_distance_budget_can_make_routing_infeasible() {
        let params = RoutingParams {
            horizon: 3,
            max_distance: 10,
        };
        let outcome = plan_routes(&instance(1), &corridor(50), &params, &MicrolpSolver::new(), &SolveOptions::default()).unwrap();
        assert_eq!(outcome, StageOutcome::Unsolved(Status::Infeasible));
    }

    #[test]
    fn test_zero_horizon_is_infeasible() {
        let params = RoutingParams {
            horizon: 0,
            max_distance: 500,
        };
        let outcome = plan_routes(&instance(1), &corridor(50), &params, &MicrolpSolver::new(), &SolveOptions::default()).unwrap();
        assert_eq!(outcome, StageOutcome::Unsolved(Status::Infeasible));
    }

    #[test]
    fn test_empty_corridor_is_trivial() {
        let params = RoutingParams {
            horizon: 4,
            max_distance: 500,
        };
        let empty = Corridor::new(Vec::new());
        let outcome = plan_routes(&instance(2), &empty, &params, &MicrolpSolver::new(), &SolveOptions::default()).unwrap();
        let plan = outcome.plan().unwrap();
        assert_eq!(plan.objective, 0);
        assert!(plan.assignments.is_empty());
        assert_eq!(plan.verify(&instance(2), &empty, &params), Ok(()));
    }

    #[test]
    fn test_verify_rejects_open_tour() {
        let instance = instance(1);
        let params = RoutingParams {
            horizon: 3,
            max_distance: 500,
        };
        let plan = RoutePlan {
            status: Status::Optimal,
            objective: 40,
            assignments: vec![
                Assignment { vehicle: 0, step: 0, node: 0 },
                Assignment { vehicle: 0, step: 1, node: 1 },
                Assignment { vehicle: 0, step: 2, node: 1 },
            ],
        };
        assert!(plan.verify(&instance, &corridor(50), &params).unwrap_err().contains("close"));
    }
}
