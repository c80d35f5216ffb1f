//! Module for parsing and representing CVRP instances.
//!
//! Datasets use a plain text layout: the node count on the first line, the
//! demand of every node on the second, the vehicle capacity on the third,
//! followed by one row of the travel cost matrix per node. Node 0 is the depot.

use std::fs;
use std::path::Path;
use serde::{Deserialize, Serialize};

use crate::error::InstanceError;
use crate::route::DEPOT;

/// Travel cost between two nodes.
///
/// Ants share the oracle across worker threads, hence the `Sync` bound.
pub trait CostOracle: Sync {
    fn cost(&self, from: usize, to: usize) -> f64;
}

/// Adapts any `Fn(from, to) -> cost` closure into a [`CostOracle`].
pub struct FnCost<F>(pub F);

impl<F> CostOracle for FnCost<F>
where
    F: Fn(usize, usize) -> f64 + Sync,
{
    #[inline]
    fn cost(&self, from: usize, to: usize) -> f64 {
        (self.0)(from, to)
    }
}

/// Represents a complete CVRP instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CvrpInstance {
    /// Name of the instance (file stem when loaded from disk)
    pub name: String,
    /// Number of nodes (including depot)
    pub dimension: usize,
    /// Vehicle capacity
    pub capacity: i32,
    /// Demand per node: positive = delivery, negative = pickup, 0 at the depot
    pub demand: Vec<i32>,
    /// Travel cost matrix indexed by (from, to)
    pub distance_matrix: Vec<Vec<f64>>,
    /// Best-known cost from the literature, if any
    pub best_known: Option<f64>,
}

impl CvrpInstance {
    /// Build an instance from already parsed data, checking its shape.
    pub fn new(
        name: impl Into<String>,
        demand: Vec<i32>,
        capacity: i32,
        distance_matrix: Vec<Vec<f64>>,
    ) -> Result<Self, InstanceError> {
        let dimension = demand.len();
        if dimension == 0 {
            return Err(InstanceError::Dimension("instance has no nodes".to_string()));
        }
        if distance_matrix.len() != dimension {
            return Err(InstanceError::Dimension(format!(
                "{} demand values but {} matrix rows",
                dimension,
                distance_matrix.len()
            )));
        }
        for (i, row) in distance_matrix.iter().enumerate() {
            if row.len() != dimension {
                return Err(InstanceError::Dimension(format!(
                    "matrix row {} has {} columns, expected {}",
                    i,
                    row.len(),
                    dimension
                )));
            }
            if let Some(&d) = row.iter().find(|d| !d.is_finite() || **d < 0.0) {
                return Err(InstanceError::Dimension(format!(
                    "matrix row {} contains invalid cost {}",
                    i, d
                )));
            }
        }
        if demand[DEPOT] != 0 {
            return Err(InstanceError::Invalid(format!(
                "depot demand must be 0, found {}",
                demand[DEPOT]
            )));
        }
        if capacity <= 0 {
            return Err(InstanceError::Invalid(format!(
                "capacity must be positive, found {}",
                capacity
            )));
        }
        // the magnitude of every demand must fit in an i32
        if let Some(node) = demand.iter().position(|&d| d == i32::MIN) {
            return Err(InstanceError::Invalid(format!("demand of node {} is out of range", node)));
        }

        Ok(CvrpInstance {
            name: name.into(),
            dimension,
            capacity,
            demand,
            distance_matrix,
            best_known: None,
        })
    }

    /// Parse an instance from a dataset file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, InstanceError> {
        let content = fs::read_to_string(&path)?;
        let name = path
            .as_ref()
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::parse(name, &content)
    }

    /// Parse an instance from the text of a dataset file
    pub fn parse(name: impl Into<String>, content: &str) -> Result<Self, InstanceError> {
        let mut lines = content
            .lines()
            .enumerate()
            .map(|(i, l)| (i + 1, l.trim()))
            .filter(|(_, l)| !l.is_empty());

        let (line_no, line) = lines.next().ok_or_else(|| InstanceError::Parse {
            line: 1,
            message: "missing node count".to_string(),
        })?;
        let dimension: usize = parse_token(line, line_no, "node count")?;

        let (line_no, line) = lines.next().ok_or_else(|| InstanceError::Parse {
            line: line_no + 1,
            message: "missing demand line".to_string(),
        })?;
        let demand = line
            .split_whitespace()
            .map(|t| parse_token::<i32>(t, line_no, "demand"))
            .collect::<Result<Vec<_>, _>>()?;
        if demand.len() != dimension {
            return Err(InstanceError::Dimension(format!(
                "declared {} nodes but found {} demand values",
                dimension,
                demand.len()
            )));
        }

        let (line_no, line) = lines.next().ok_or_else(|| InstanceError::Parse {
            line: line_no + 1,
            message: "missing capacity".to_string(),
        })?;
        let capacity: i32 = parse_token(line, line_no, "capacity")?;

        let mut distance_matrix = Vec::with_capacity(dimension);
        for (line_no, line) in lines {
            let row = line
                .split_whitespace()
                .map(|t| parse_token::<f64>(t, line_no, "distance"))
                .collect::<Result<Vec<_>, _>>()?;
            distance_matrix.push(row);
        }

        Self::new(name, demand, capacity, distance_matrix)
    }

    /// Attach the best-known cost used to compute gaps.
    pub fn with_best_known(mut self, best: f64) -> Self {
        self.best_known = Some(best);
        self
    }

    /// Get the distance between two nodes
    #[inline]
    pub fn distance(&self, i: usize, j: usize) -> f64 {
        self.distance_matrix[i][j]
    }

    /// Get the number of customer nodes (excluding depot)
    pub fn num_customers(&self) -> usize {
        self.dimension - 1
    }

    /// Get all delivery nodes (positive demand)
    pub fn delivery_nodes(&self) -> Vec<usize> {
        (1..self.dimension).filter(|&i| self.demand[i] > 0).collect()
    }

    /// Get all pickup nodes (negative demand)
    pub fn pickup_nodes(&self) -> Vec<usize> {
        (1..self.dimension).filter(|&i| self.demand[i] < 0).collect()
    }

    /// Whether the cost matrix is symmetric
    pub fn is_symmetric(&self) -> bool {
        (0..self.dimension).all(|i| {
            (i + 1..self.dimension)
                .all(|j| (self.distance(i, j) - self.distance(j, i)).abs() < 1e-9)
        })
    }

    /// Get statistics about the instance
    pub fn statistics(&self) -> InstanceStatistics {
        let deliveries = self.delivery_nodes();
        let pickups = self.pickup_nodes();
        let total_delivery: i64 = deliveries.iter().map(|&i| i64::from(self.demand[i])).sum();
        let total_pickup: i64 = pickups.iter().map(|&i| -i64::from(self.demand[i])).sum();

        let mut distances: Vec<f64> = Vec::new();
        for i in 0..self.dimension {
            for j in 0..self.dimension {
                if i != j {
                    distances.push(self.distance(i, j));
                }
            }
        }
        let avg_distance = if distances.is_empty() {
            0.0
        } else {
            distances.iter().sum::<f64>() / distances.len() as f64
        };
        let max_distance = distances.iter().cloned().fold(0.0, f64::max);

        let capacity = i64::from(self.capacity);
        let min_vehicles = (total_delivery.max(total_pickup) + capacity - 1) / capacity;

        InstanceStatistics {
            name: self.name.clone(),
            dimension: self.dimension,
            num_customers: self.num_customers(),
            capacity: self.capacity,
            num_deliveries: deliveries.len(),
            num_pickups: pickups.len(),
            total_delivery,
            total_pickup,
            min_vehicles: min_vehicles as usize,
            avg_distance,
            max_distance,
            symmetric: self.is_symmetric(),
            best_known: self.best_known,
        }
    }
}

impl CostOracle for CvrpInstance {
    #[inline]
    fn cost(&self, from: usize, to: usize) -> f64 {
        self.distance(from, to)
    }
}

fn parse_token<T: std::str::FromStr>(token: &str, line: usize, what: &str) -> Result<T, InstanceError> {
    token.trim().parse().map_err(|_| InstanceError::Parse {
        line,
        message: format!("invalid {} '{}'", what, token),
    })
}

/// Statistics about a CVRP instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceStatistics {
    pub name: String,
    pub dimension: usize,
    pub num_customers: usize,
    pub capacity: i32,
    pub num_deliveries: usize,
    pub num_pickups: usize,
    pub total_delivery: i64,
    pub total_pickup: i64,
    /// Lower bound on the number of depot-to-depot routes
    pub min_vehicles: usize,
    pub avg_distance: f64,
    pub max_distance: f64,
    pub symmetric: bool,
    pub best_known: Option<f64>,
}

impl std::fmt::Display for InstanceStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Instance: {}", self.name)?;
        writeln!(f, "  Nodes: {} (1 depot + {} customers)", self.dimension, self.num_customers)?;
        writeln!(f, "  Capacity: {}", self.capacity)?;
        writeln!(f, "  Delivery nodes: {} (total {})", self.num_deliveries, self.total_delivery)?;
        writeln!(f, "  Pickup nodes: {} (total {})", self.num_pickups, self.total_pickup)?;
        writeln!(f, "  Minimum routes: {}", self.min_vehicles)?;
        writeln!(f, "  Symmetric costs: {}", self.symmetric)?;
        if let Some(best) = self.best_known {
            writeln!(f, "  Best known: {:.2}", best)?;
        }
        writeln!(f, "  Avg distance: {:.2}", self.avg_distance)?;
        writeln!(f, "  Max distance: {:.2}", self.max_distance)
    }
}
