//! Local search improvement of route sets.
//!
//! Each ant runs these operators once on its own routes after construction:
//! - route reversal (useful with asymmetric costs)
//! - exhaustive 2-opt inside every route
//!
//! Operators only replace a route by a strictly cheaper, demand-feasible
//! variant, so they never increase the total cost.

use crate::instance::CostOracle;
use crate::route::{self, DEPOT};

/// Data an operator needs to evaluate routes
pub struct RouteContext<'a> {
    pub cost: &'a dyn CostOracle,
    pub demand: &'a [i32],
    pub capacity: i32,
}

impl<'a> RouteContext<'a> {
    pub fn new(cost: &'a dyn CostOracle, demand: &'a [i32], capacity: i32) -> Self {
        RouteContext { cost, demand, capacity }
    }

    #[inline]
    fn route_cost(&self, r: &[usize]) -> f64 {
        route::route_cost(self.cost, r)
    }

    #[inline]
    fn feasible(&self, r: &[usize]) -> bool {
        route::check_demand(r, self.demand, self.capacity)
    }
}

/// Trait for route improvement methods
pub trait RouteImprovement {
    /// Improve `routes` in place. Returns whether any route changed.
    fn improve(&self, ctx: &RouteContext<'_>, routes: &mut [Vec<usize>]) -> bool;
    fn name(&self) -> &str;
}

/// Replace a route by its reversal when that is feasible and cheaper.
///
/// Round trips with a single customer are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct InverseRouteSearch;

impl RouteImprovement for InverseRouteSearch {
    fn improve(&self, ctx: &RouteContext<'_>, routes: &mut [Vec<usize>]) -> bool {
        let mut improved = false;

        for r in routes.iter_mut() {
            if r.len() <= 3 {
                continue;
            }
            let inverted: Vec<usize> = r.iter().rev().copied().collect();
            if !ctx.feasible(&inverted) {
                continue;
            }
            if ctx.route_cost(&inverted) < ctx.route_cost(r) {
                *r = inverted;
                improved = true;
            }
        }

        improved
    }

    fn name(&self) -> &str {
        "Inverse"
    }
}

/// Best-improvement 2-opt inside each route.
///
/// The depot endpoints are stripped, every segment `[i..=j]` of the customer
/// sequence is reversed in turn, and the cheapest demand-feasible candidate
/// (including the two depot connections) replaces the route if it beats the
/// original cost.
#[derive(Debug, Clone, Copy, Default)]
pub struct TwoOptSearch;

impl TwoOptSearch {
    fn best_swap(&self, ctx: &RouteContext<'_>, r: &[usize]) -> Option<Vec<usize>> {
        let customers: Vec<usize> = r.iter().copied().filter(|&n| n != DEPOT).collect();
        let k = customers.len();
        if k < 2 {
            return None;
        }

        let mut best_cost = ctx.route_cost(r);
        let mut best: Option<Vec<usize>> = None;
        let mut candidate = customers.clone();

        for i in 0..k - 1 {
            for j in i + 1..k {
                candidate.copy_from_slice(&customers);
                candidate[i..=j].reverse();

                if !ctx.feasible(&candidate) {
                    continue;
                }

                let cost = ctx.route_cost(&candidate)
                    + ctx.cost.cost(DEPOT, candidate[0])
                    + ctx.cost.cost(candidate[k - 1], DEPOT);

                if cost < best_cost {
                    best_cost = cost;
                    best = Some(candidate.clone());
                }
            }
        }

        best.map(|inner| {
            let mut improved = Vec::with_capacity(k + 2);
            improved.push(DEPOT);
            improved.extend(inner);
            improved.push(DEPOT);
            improved
        })
    }
}

impl RouteImprovement for TwoOptSearch {
    fn improve(&self, ctx: &RouteContext<'_>, routes: &mut [Vec<usize>]) -> bool {
        let mut improved = false;

        for r in routes.iter_mut() {
            if let Some(better) = self.best_swap(ctx, r) {
                *r = better;
                improved = true;
            }
        }

        improved
    }

    fn name(&self) -> &str {
        "2-Opt"
    }
}

/// Runs a fixed sequence of operators once each
pub struct RouteOptimizer {
    operators: Vec<Box<dyn RouteImprovement + Send + Sync>>,
}

impl RouteOptimizer {
    pub fn new() -> Self {
        RouteOptimizer { operators: Vec::new() }
    }

    /// Reversal pass followed by the 2-opt pass
    pub fn with_standard_operators() -> Self {
        let mut optimizer = Self::new();
        optimizer.add_operator(InverseRouteSearch);
        optimizer.add_operator(TwoOptSearch);
        optimizer
    }

    pub fn add_operator<L: RouteImprovement + Send + Sync + 'static>(&mut self, op: L) {
        self.operators.push(Box::new(op));
    }

    /// Improve `routes` in place and return their total cost afterwards
    pub fn optimize(&self, ctx: &RouteContext<'_>, routes: &mut [Vec<usize>]) -> f64 {
        for op in &self.operators {
            if op.improve(ctx, routes) {
                log::trace!("{} improved the route set", op.name());
            }
        }
        route::total_cost(ctx.cost, routes)
    }
}

impl Default for RouteOptimizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::CvrpInstance;
    use rand::prelude::*;
    use rand_chacha::ChaCha8Rng;

    /// Customers on a line at x = 1..=4, depot at x = 0
    fn create_line_instance() -> CvrpInstance {
        let xs = [0.0, 1.0, 2.0, 3.0, 4.0];
        let matrix = xs
            .iter()
            .map(|a| xs.iter().map(|b| f64::abs(a - b)).collect())
            .collect();
        CvrpInstance::new("line", vec![0, 1, 1, 1, 1], 10, matrix).unwrap()
    }

    #[test]
    fn test_two_opt_untangles_route() {
        let instance = create_line_instance();
        let ctx = RouteContext::new(&instance, &instance.demand, instance.capacity);
        let mut routes = vec![vec![0, 3, 1, 2, 4, 0]];
        let before = route::total_cost(&instance, &routes);

        assert!(TwoOptSearch.improve(&ctx, &mut routes));

        let after = route::total_cost(&instance, &routes);
        assert!(after < before);
        assert_eq!(routes[0].first(), Some(&DEPOT));
        assert_eq!(routes[0].last(), Some(&DEPOT));
        let mut customers = routes[0][1..routes[0].len() - 1].to_vec();
        customers.sort_unstable();
        assert_eq!(customers, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_two_opt_keeps_optimal_route() {
        let instance = create_line_instance();
        let ctx = RouteContext::new(&instance, &instance.demand, instance.capacity);
        let mut routes = vec![vec![0, 1, 2, 3, 4, 0]];

        assert!(!TwoOptSearch.improve(&ctx, &mut routes));
        assert_eq!(routes[0], vec![0, 1, 2, 3, 4, 0]);
    }

    #[test]
    fn test_two_opt_respects_demand() {
        // the only cheaper order would pick up before anything is loaded
        let matrix = vec![
            vec![0.0, 10.0, 1.0],
            vec![10.0, 0.0, 1.0],
            vec![1.0, 1.0, 0.0],
        ];
        let instance = CvrpInstance::new("pickup", vec![0, 5, -3], 10, matrix).unwrap();
        let ctx = RouteContext::new(&instance, &instance.demand, instance.capacity);
        let mut routes = vec![vec![0, 1, 2, 0]];

        assert!(!TwoOptSearch.improve(&ctx, &mut routes));
        assert_eq!(routes[0], vec![0, 1, 2, 0]);
    }

    #[test]
    fn test_inverse_on_asymmetric_costs() {
        // going 0 -> 2 -> 1 -> 0 is cheap, the other direction is expensive
        let matrix = vec![
            vec![0.0, 9.0, 1.0],
            vec![1.0, 0.0, 9.0],
            vec![9.0, 1.0, 0.0],
        ];
        let instance = CvrpInstance::new("asym", vec![0, 2, 2], 10, matrix).unwrap();
        let ctx = RouteContext::new(&instance, &instance.demand, instance.capacity);
        let mut routes = vec![vec![0, 1, 2, 0]];

        assert!(InverseRouteSearch.improve(&ctx, &mut routes));
        assert_eq!(routes[0], vec![0, 2, 1, 0]);
    }

    #[test]
    fn test_inverse_skips_single_customer() {
        let matrix = vec![vec![0.0, 1.0], vec![5.0, 0.0]];
        let instance = CvrpInstance::new("single", vec![0, 1], 10, matrix).unwrap();
        let ctx = RouteContext::new(&instance, &instance.demand, instance.capacity);
        let mut routes = vec![vec![0, 1, 0]];

        assert!(!InverseRouteSearch.improve(&ctx, &mut routes));
    }

    #[test]
    fn test_optimizer_never_increases_cost() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let optimizer = RouteOptimizer::with_standard_operators();

        for _ in 0..50 {
            let n = 9;
            let matrix: Vec<Vec<f64>> = (0..n)
                .map(|i| (0..n).map(|j| if i == j { 0.0 } else { rng.gen_range(1.0..100.0) }).collect())
                .collect();
            let mut demand: Vec<i32> = (0..n).map(|_| rng.gen_range(1..5)).collect();
            demand[0] = 0;
            let instance = CvrpInstance::new("random", demand, 12, matrix).unwrap();
            let ctx = RouteContext::new(&instance, &instance.demand, instance.capacity);

            let mut customers: Vec<usize> = (1..n).collect();
            customers.shuffle(&mut rng);
            let mut routes: Vec<Vec<usize>> = customers
                .chunks(3)
                .map(|c| {
                    let mut r = vec![DEPOT];
                    r.extend_from_slice(c);
                    r.push(DEPOT);
                    r
                })
                .collect();

            let before = route::total_cost(&instance, &routes);
            let after = optimizer.optimize(&ctx, &mut routes);

            assert!(after <= before + 1e-9);
            assert!(routes.iter().all(|r| route::check_demand(r, &instance.demand, instance.capacity)));
            let mut visited = route::flatten(&routes);
            visited.retain(|&n| n != DEPOT);
            visited.sort_unstable();
            assert_eq!(visited, (1..n).collect::<Vec<_>>());
        }
    }
}
