//! Min-cost flow over a capacitated directed network.
//!
//! Flow on each arc is an integer column bounded by the arc capacity; every
//! node gets a conservation equality `outflow - inflow = supply`.

use std::fmt;

use log::{info, warn};
use serde::Serialize;

use crate::builder::{LinearExpr, ModelBuilder, Relation, VarRef};
use crate::domain::solve::solve;
use crate::domain::solver::{SolveOptions, Solver};
use crate::error::{Error, Result};
use crate::models::{IntegerProgram, SolverDirection, Status};

pub const FAILURE_MESSAGE: &str = "There was an issue with the min cost flow input.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Arc {
    pub tail: usize,
    pub head: usize,
    pub capacity: i32,
    pub unit_cost: i32,
}

/// Arcs plus sparse node supplies; nodes without a supply default to zero
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowNetwork {
    arcs: Vec<Arc>,
    supplies: Vec<i32>,
}

impl FlowNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an arc and return its index. Parallel arcs are kept separate.
    pub fn add_arc_with_capacity_and_unit_cost(
        &mut self,
        tail: usize,
        head: usize,
        capacity: i32,
        unit_cost: i32,
    ) -> Result<usize> {
        if capacity < 0 {
            return Err(Error::InvalidInput(format!(
                "Arc {} -> {} has negative capacity {}",
                tail, head, capacity
            )));
        }
        self.arcs.push(Arc {
            tail,
            head,
            capacity,
            unit_cost,
        });
        Ok(self.arcs.len() - 1)
    }

    pub fn set_node_supply(&mut self, node: usize, supply: i32) {
        if node >= self.supplies.len() {
            self.supplies.resize(node + 1, 0);
        }
        self.supplies[node] = supply;
    }

    /// Build a network from parallel arc arrays and a supply list indexed by node.
    pub fn from_arrays(
        start_nodes: &[usize],
        end_nodes: &[usize],
        capacities: &[i32],
        unit_costs: &[i32],
        supplies: &[i32],
    ) -> Result<Self> {
        let arcs = start_nodes.len();
        if end_nodes.len() != arcs || capacities.len() != arcs || unit_costs.len() != arcs {
            return Err(Error::InvalidInput(format!(
                "Arc arrays differ in length: {} start nodes, {} end nodes, {} capacities, {} unit costs",
                arcs,
                end_nodes.len(),
                capacities.len(),
                unit_costs.len(),
            )));
        }

        let mut network = FlowNetwork::new();
        for i in 0..arcs {
            network.add_arc_with_capacity_and_unit_cost(
                start_nodes[i],
                end_nodes[i],
                capacities[i],
                unit_costs[i],
            )?;
        }
        for (node, &supply) in supplies.iter().enumerate() {
            network.set_node_supply(node, supply);
        }
        Ok(network)
    }

    pub fn arcs(&self) -> &[Arc] {
        &self.arcs
    }

    pub fn num_arcs(&self) -> usize {
        self.arcs.len()
    }

    pub fn num_nodes(&self) -> usize {
        let from_arcs = self
            .arcs
            .iter()
            .map(|arc| arc.tail.max(arc.head) + 1)
            .max()
            .unwrap_or(0);
        from_arcs.max(self.supplies.len())
    }

    pub fn supply(&self, node: usize) -> i32 {
        self.supplies.get(node).copied().unwrap_or(0)
    }

    pub fn total_supply(&self) -> i64 {
        self.supplies.iter().map(|&s| s as i64).sum()
    }

    /// Integer program: `flow[k]` in `[0, capacity]`, conservation per node, min total cost.
    pub fn build_program(&self) -> (IntegerProgram, Vec<VarRef>) {
        let mut builder = ModelBuilder::new();
        let flows: Vec<VarRef> = self
            .arcs
            .iter()
            .enumerate()
            .map(|(k, arc)| {
                builder.add_variable(format!("flow[{}:{}->{}]", k, arc.tail, arc.head), 0, arc.capacity)
            })
            .collect();

        let mut balance: Vec<LinearExpr> = vec![LinearExpr::new(); self.num_nodes()];
        for (arc, &flow) in self.arcs.iter().zip(&flows) {
            balance[arc.tail].add_term(flow, 1);
            balance[arc.head].add_term(flow, -1);
        }
        for (node, expr) in balance.into_iter().enumerate() {
            builder.add_constraint(expr, Relation::Eq, self.supply(node));
        }

        let objective = self
            .arcs
            .iter()
            .zip(&flows)
            .map(|(arc, &flow)| (flow, arc.unit_cost))
            .collect();
        builder.set_objective(objective, SolverDirection::Minimize);

        (builder.build(), flows)
    }
}

/// Outcome of a min-cost flow run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FlowStatus {
    Optimal,
    Infeasible,
    /// Supplies do not sum to zero
    Unbalanced,
    NotSolved(Status),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArcFlow {
    pub tail: usize,
    pub head: usize,
    pub flow: i64,
    pub capacity: i32,
    pub unit_cost: i32,
}

impl ArcFlow {
    pub fn cost(&self) -> i64 {
        self.flow * self.unit_cost as i64
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MinCostFlow {
    pub status: FlowStatus,
    pub optimal_cost: i64,
    pub arcs: Vec<ArcFlow>,
}

impl MinCostFlow {
    fn failed(status: FlowStatus) -> Self {
        MinCostFlow {
            status,
            optimal_cost: 0,
            arcs: Vec::new(),
        }
    }

    pub fn is_optimal(&self) -> bool {
        self.status == FlowStatus::Optimal
    }

    /// Check capacity bounds, conservation and the reported cost against the network.
    pub fn verify(&self, network: &FlowNetwork) -> std::result::Result<(), String> {
        if self.arcs.len() != network.num_arcs() {
            return Err(format!(
                "{} arc flows reported for {} arcs",
                self.arcs.len(),
                network.num_arcs()
            ));
        }

        let mut net_outflow = vec![0i64; network.num_nodes()];
        for (k, arc_flow) in self.arcs.iter().enumerate() {
            if arc_flow.flow < 0 || arc_flow.flow > arc_flow.capacity as i64 {
                return Err(format!(
                    "Arc {} ({} -> {}) carries {} outside [0, {}]",
                    k, arc_flow.tail, arc_flow.head, arc_flow.flow, arc_flow.capacity
                ));
            }
            net_outflow[arc_flow.tail] += arc_flow.flow;
            net_outflow[arc_flow.head] -= arc_flow.flow;
        }
        for (node, &net) in net_outflow.iter().enumerate() {
            if net != network.supply(node) as i64 {
                return Err(format!(
                    "Node {} has net outflow {} but supply {}",
                    node,
                    net,
                    network.supply(node)
                ));
            }
        }

        let recomputed: i64 = self.arcs.iter().map(ArcFlow::cost).sum();
        if recomputed != self.optimal_cost {
            return Err(format!(
                "Reported cost {} differs from recomputed {}",
                self.optimal_cost, recomputed
            ));
        }
        Ok(())
    }
}

impl fmt::Display for MinCostFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_optimal() {
            return writeln!(f, "{}", FAILURE_MESSAGE);
        }
        writeln!(f, "Minimum cost: {}", self.optimal_cost)?;
        writeln!(f)?;
        writeln!(f, "  Arc    Flow / Capacity  Cost")?;
        for arc in &self.arcs {
            writeln!(
                f,
                "{:>1} -> {:>1}   {:>3}  / {:>3}       {:>3}",
                arc.tail,
                arc.head,
                arc.flow,
                arc.capacity,
                arc.cost()
            )?;
        }
        Ok(())
    }
}

pub fn solve_min_cost_flow(
    network: &FlowNetwork,
    solver: &dyn Solver,
    options: &SolveOptions,
) -> Result<MinCostFlow> {
    let total_supply = network.total_supply();
    if total_supply != 0 {
        warn!("Node supplies sum to {} instead of 0", total_supply);
        return Ok(MinCostFlow::failed(FlowStatus::Unbalanced));
    }

    let (program, flows) = network.build_program();
    info!(
        "Min-cost flow: {} nodes, {} arcs",
        network.num_nodes(),
        network.num_arcs()
    );
    let solution = solve(solver, &program, options)?;

    match solution.status {
        Status::Optimal => {}
        Status::Infeasible => return Ok(MinCostFlow::failed(FlowStatus::Infeasible)),
        other => return Ok(MinCostFlow::failed(FlowStatus::NotSolved(other))),
    }

    let arcs: Vec<ArcFlow> = network
        .arcs
        .iter()
        .zip(&flows)
        .map(|(arc, &flow)| ArcFlow {
            tail: arc.tail,
            head: arc.head,
            flow: solution.value(&program.polyhedron.variables[flow.index()].id),
            capacity: arc.capacity,
            unit_cost: arc.unit_cost,
        })
        .collect();

    Ok(MinCostFlow {
        status: FlowStatus::Optimal,
        optimal_cost: arcs.iter().map(ArcFlow::cost).sum(),
        arcs,
    })
}

/// The hardcoded five-node instance solved by the `min-cost-flow` binary
pub fn reference_network() -> Result<FlowNetwork> {
    FlowNetwork::from_arrays(
        &[0, 0, 1, 1, 1, 2, 2, 3, 4],
        &[1, 2, 2, 3, 4, 3, 4, 4, 2],
        &[15, 8, 100, 100, 100, 100, 100, 100, 100],
        &[0, 0, 2, 2, 6, 1, 3, 2, 3],
        &[20, 0, 0, -5, -15],
    )
}
