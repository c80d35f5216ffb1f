//! Solution representation and validation for the CVRP.
//!
//! A solution is a set of depot-to-depot routes together with the total
//! travel cost, plus bookkeeping about the run that produced it.

use crate::instance::{CostOracle, CvrpInstance};
use crate::route::{self, DEPOT};
use serde::{Deserialize, Serialize};

/// Represents a solution to the CVRP
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solution {
    /// Routes, each starting and ending at the depot
    pub routes: Vec<Vec<usize>>,
    /// Total travel cost over all routes
    pub cost: f64,
    /// Algorithm that generated this solution
    pub algorithm: String,
    /// Computation time in seconds
    pub computation_time: f64,
    /// Number of iterations (if applicable)
    pub iterations: Option<usize>,
    /// Consecutive iterations without improvement when the run stopped
    pub stagnation: Option<usize>,
}

impl Solution {
    /// Create a solution from routes, computing the cost with `cost`
    pub fn from_routes<C: CostOracle + ?Sized>(cost: &C, routes: Vec<Vec<usize>>, algorithm: &str) -> Self {
        let total = route::total_cost(cost, &routes);
        Solution {
            routes,
            cost: total,
            algorithm: algorithm.to_string(),
            computation_time: 0.0,
            iterations: None,
            stagnation: None,
        }
    }

    /// Number of routes (vehicles)
    pub fn num_routes(&self) -> usize {
        self.routes.len()
    }

    /// All routes concatenated
    pub fn tour(&self) -> Vec<usize> {
        route::flatten(&self.routes)
    }

    /// Every customer appears exactly once over all routes
    pub fn is_complete(&self, instance: &CvrpInstance) -> bool {
        let mut seen = vec![0usize; instance.dimension];
        for &node in self.routes.iter().flatten() {
            if node >= instance.dimension {
                return false;
            }
            seen[node] += 1;
        }
        seen.iter().skip(1).all(|&count| count == 1)
    }

    /// Every route begins and ends at the depot and visits at least one customer
    pub fn is_depot_closed(&self) -> bool {
        self.routes.iter().all(|r| {
            r.len() >= 3 && r[0] == DEPOT && r[r.len() - 1] == DEPOT
                && r[1..r.len() - 1].iter().all(|&n| n != DEPOT)
        })
    }

    /// Every route keeps its running load within `[0, capacity]`
    pub fn respects_capacity(&self, instance: &CvrpInstance) -> bool {
        self.routes
            .iter()
            .all(|r| route::check_demand(r, &instance.demand, instance.capacity))
    }

    /// Complete, depot-closed and within capacity
    pub fn is_feasible(&self, instance: &CvrpInstance) -> bool {
        self.is_complete(instance) && self.is_depot_closed() && self.respects_capacity(instance)
    }

    /// Load profile of each route, one entry per visited node
    pub fn load_profiles(&self, instance: &CvrpInstance) -> Vec<Vec<i64>> {
        self.routes
            .iter()
            .map(|r| {
                r.iter()
                    .scan(0i64, |load, &node| {
                        *load += i64::from(instance.demand[node]);
                        Some(*load)
                    })
                    .collect()
            })
            .collect()
    }

    /// Relative gap to a best-known cost in percent, rounded to 2 decimals
    pub fn gap_to(&self, best_known: f64) -> f64 {
        (((self.cost / best_known) - 1.0) * 100.0 * 100.0).round() / 100.0
    }
}

impl std::fmt::Display for Solution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Solution ({})", self.algorithm)?;
        writeln!(f, "  Cost: {:.2}", self.cost)?;
        writeln!(f, "  Routes: {}", self.routes.len())?;
        writeln!(f, "  Time: {:.4}s", self.computation_time)?;
        if let Some(iter) = self.iterations {
            writeln!(f, "  Iterations: {}", iter)?;
        }
        if let Some(stagnation) = self.stagnation {
            writeln!(f, "  Stagnation: {}", stagnation)?;
        }
        for (i, r) in self.routes.iter().enumerate() {
            writeln!(f, "  Route {}: {:?}", i + 1, r)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_instance() -> CvrpInstance {
        CvrpInstance::new(
            "test",
            vec![0, 4, 3, 5],
            10,
            vec![
                vec![0.0, 1.0, 1.0, 1.0],
                vec![1.0, 0.0, 1.0, 1.0],
                vec![1.0, 1.0, 0.0, 1.0],
                vec![1.0, 1.0, 1.0, 0.0],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_solution_from_routes() {
        let instance = create_test_instance();
        let sol = Solution::from_routes(&instance, vec![vec![0, 1, 2, 0], vec![0, 3, 0]], "test");

        assert_eq!(sol.cost, 5.0);
        assert_eq!(sol.num_routes(), 2);
        assert!(sol.is_feasible(&instance));
        assert_eq!(sol.load_profiles(&instance)[0], vec![0, 4, 7, 7]);
        assert_eq!(sol.tour(), vec![0, 1, 2, 0, 0, 3, 0]);
    }

    #[test]
    fn test_detects_missing_and_duplicate_nodes() {
        let instance = create_test_instance();
        let missing = Solution::from_routes(&instance, vec![vec![0, 1, 2, 0]], "test");
        let duplicate = Solution::from_routes(&instance, vec![vec![0, 1, 2, 0], vec![0, 3, 1, 0]], "test");

        assert!(!missing.is_complete(&instance));
        assert!(!duplicate.is_complete(&instance));
    }

    #[test]
    fn test_detects_capacity_violation() {
        let instance = create_test_instance();
        let sol = Solution::from_routes(&instance, vec![vec![0, 1, 2, 3, 0]], "test");

        assert!(sol.is_complete(&instance));
        assert!(!sol.respects_capacity(&instance));
    }

    #[test]
    fn test_gap() {
        let instance = create_test_instance();
        let mut sol = Solution::from_routes(&instance, vec![vec![0, 1, 2, 3, 0]], "test");
        sol.cost = 10_500.0;
        assert_eq!(sol.gap_to(10_000.0), 5.0);
    }
}
