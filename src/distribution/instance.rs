use std::collections::HashSet;

use rand::Rng;
use serde::Serialize;

use crate::config::InstanceConfig;
use crate::error::{Error, Result};

pub type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum NodeRole {
    Producer { supply: i32 },
    Relay,
    Consumer { demand: i32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Node {
    pub id: NodeId,
    pub role: NodeRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Vehicle {
    pub id: usize,
    /// Volume moved per traversal
    pub capacity: i32,
    pub cost_per_distance: i32,
}

/// Dense distance table; pairs never drawn read as zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistanceMatrix {
    data: Vec<Option<i32>>,
    size: usize,
}

impl DistanceMatrix {
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![None; size * size],
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn set(&mut self, from: NodeId, to: NodeId, distance: i32) {
        self.data[from * self.size + to] = Some(distance);
    }

    /// Set both directions at once
    pub fn set_symmetric(&mut self, a: NodeId, b: NodeId, distance: i32) {
        self.set(a, b, distance);
        self.set(b, a, distance);
    }

    /// Distance from `from` to `to`; zero on the diagonal and for undefined pairs.
    pub fn get(&self, from: NodeId, to: NodeId) -> i32 {
        if from == to {
            return 0;
        }
        self.data[from * self.size + to].unwrap_or(0)
    }

    pub fn is_defined(&self, from: NodeId, to: NodeId) -> bool {
        from == to || self.data[from * self.size + to].is_some()
    }

    /// Largest absolute defined distance, zero for an empty table
    pub fn max_abs(&self) -> i64 {
        self.data
            .iter()
            .flatten()
            .map(|&d| (d as i64).abs())
            .max()
            .unwrap_or(0)
    }
}

/// Producers, relays and consumers with contiguous id ranges, plus the fleet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Instance {
    nodes: Vec<Node>,
    producers: usize,
    relays: usize,
    vehicles: Vec<Vehicle>,
    distances: DistanceMatrix,
}

impl Instance {
    /// Assemble an instance; ids are assigned producers first, then relays, then consumers.
    pub fn from_parts(
        supplies: &[i32],
        relays: usize,
        demands: &[i32],
        vehicles: Vec<Vehicle>,
        distances: DistanceMatrix,
    ) -> Result<Self> {
        let node_count = supplies.len() + relays + demands.len();
        if distances.size() != node_count {
            return Err(Error::InvalidInput(format!(
                "Distance matrix covers {} nodes but the instance has {}",
                distances.size(),
                node_count
            )));
        }
        if let Some(&supply) = supplies.iter().find(|&&s| s < 0) {
            return Err(Error::InvalidInput(format!("Negative supply {}", supply)));
        }
        if let Some(&demand) = demands.iter().find(|&&d| d < 0) {
            return Err(Error::InvalidInput(format!("Negative demand {}", demand)));
        }
        if let Some(vehicle) = vehicles.iter().find(|v| v.capacity < 0 || v.cost_per_distance < 0) {
            return Err(Error::InvalidInput(format!(
                "Vehicle {} has negative capacity or cost",
                vehicle.id
            )));
        }
        let mut ids = HashSet::with_capacity(vehicles.len());
        if let Some(vehicle) = vehicles.iter().find(|v| !ids.insert(v.id)) {
            return Err(Error::InvalidInput(format!("Vehicle id {} is used twice", vehicle.id)));
        }
        // routing cost coefficients are distance * cost_per_distance
        let max_cost = vehicles.iter().map(|v| v.cost_per_distance as i64).max().unwrap_or(0);
        if distances.max_abs() * max_cost > i32::MAX as i64 {
            return Err(Error::InvalidInput(format!(
                "Distance {} times cost per distance {} exceeds the coefficient range",
                distances.max_abs(),
                max_cost
            )));
        }

        let roles = supplies
            .iter()
            .map(|&supply| NodeRole::Producer { supply })
            .chain(std::iter::repeat(NodeRole::Relay).take(relays))
            .chain(demands.iter().map(|&demand| NodeRole::Consumer { demand }));
        let nodes = roles.enumerate().map(|(id, role)| Node { id, role }).collect();

        Ok(Instance {
            nodes,
            producers: supplies.len(),
            relays,
            vehicles,
            distances,
        })
    }

    /// Draw an instance from `rng`.
    ///
    /// Draw order is fixed: producer supplies, consumer demands, then one distance
    /// per ordered producer/relay and relay/consumer pair in row-major order.
    pub fn generate<R: Rng>(config: &InstanceConfig, rng: &mut R) -> Result<Self> {
        for (name, (low, high)) in [
            ("supply", config.supply_range),
            ("demand", config.demand_range),
            ("distance", config.distance_range),
        ] {
            if low > high {
                return Err(Error::InvalidInput(format!(
                    "Empty {} range {}..={}",
                    name, low, high
                )));
            }
        }

        let supplies: Vec<i32> = (0..config.producers)
            .map(|_| rng.gen_range(config.supply_range.0..=config.supply_range.1))
            .collect();
        let demands: Vec<i32> = (0..config.consumers)
            .map(|_| rng.gen_range(config.demand_range.0..=config.demand_range.1))
            .collect();

        let node_count = config.producers + config.relays + config.consumers;
        let role_of = |id: NodeId| {
            if id < config.producers {
                Role::Producer
            } else if id < config.producers + config.relays {
                Role::Relay
            } else {
                Role::Consumer
            }
        };

        let mut distances = DistanceMatrix::new(node_count);
        for i in 0..node_count {
            for j in 0..node_count {
                if i == j {
                    continue;
                }
                let drawn = matches!(
                    (role_of(i), role_of(j)),
                    (Role::Relay, Role::Producer)
                        | (Role::Producer, Role::Relay)
                        | (Role::Relay, Role::Consumer)
                        | (Role::Consumer, Role::Relay)
                );
                if drawn {
                    distances.set(i, j, rng.gen_range(config.distance_range.0..=config.distance_range.1));
                }
            }
        }

        let vehicles = (0..config.vehicles)
            .map(|id| Vehicle {
                id,
                capacity: config.vehicle_capacity,
                cost_per_distance: config.vehicle_cost,
            })
            .collect();

        Self::from_parts(&supplies, config.relays, &demands, vehicles, distances)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn producers(&self) -> impl Iterator<Item = NodeId> {
        0..self.producers
    }

    pub fn relays(&self) -> impl Iterator<Item = NodeId> {
        self.producers..self.producers + self.relays
    }

    pub fn consumers(&self) -> impl Iterator<Item = NodeId> {
        self.producers + self.relays..self.nodes.len()
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn distances(&self) -> &DistanceMatrix {
        &self.distances
    }

    pub fn distance(&self, from: NodeId, to: NodeId) -> i32 {
        self.distances.get(from, to)
    }

    /// Supply of a producer, zero for every other role
    pub fn supply(&self, id: NodeId) -> i32 {
        match self.nodes[id].role {
            NodeRole::Producer { supply } => supply,
            _ => 0,
        }
    }

    /// Demand of a consumer, zero for every other role
    pub fn demand(&self, id: NodeId) -> i32 {
        match self.nodes[id].role {
            NodeRole::Consumer { demand } => demand,
            _ => 0,
        }
    }

    pub fn total_supply(&self) -> i64 {
        self.producers().map(|p| self.supply(p) as i64).sum()
    }

    pub fn total_demand(&self) -> i64 {
        self.consumers().map(|c| self.demand(c) as i64).sum()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Role {
    Producer,
    Relay,
    Consumer,
}
