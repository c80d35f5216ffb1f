//! Route utilities shared by the ants, the local search and the solution checks.
//!
//! A visitation sequence is the full walk of one ant, e.g. `[0, 3, 1, 0, 2, 0]`.
//! It is split into depot-to-depot routes (`[0, 3, 1, 0]`, `[0, 2, 0]`).

use crate::instance::CostOracle;

/// Node id of the depot (nest).
pub const DEPOT: usize = 0;

/// Split a depot-delimited visitation sequence into single routes.
///
/// Every returned route opens and closes at the depot and holds at least one
/// customer. Fragments without customers (the trailing depot) are dropped.
pub fn split_route(sequence: &[usize]) -> Vec<Vec<usize>> {
    sequence
        .split(|&node| node == DEPOT)
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let mut route = Vec::with_capacity(segment.len() + 2);
            route.push(DEPOT);
            route.extend_from_slice(segment);
            route.push(DEPOT);
            route
        })
        .collect()
}

/// Sum of the costs of consecutive node pairs.
pub fn route_cost<C: CostOracle + ?Sized>(cost: &C, route: &[usize]) -> f64 {
    route.windows(2).map(|w| cost.cost(w[0], w[1])).sum()
}

/// Total cost of a set of routes.
pub fn total_cost<C: CostOracle + ?Sized>(cost: &C, routes: &[Vec<usize>]) -> f64 {
    routes.iter().map(|r| route_cost(cost, r)).sum()
}

/// Check that the running demand stays within `[0, capacity]` at every prefix.
///
/// The load is accumulated in `i64`, so no prefix of `i32` demands can overflow.
pub fn check_demand(route: &[usize], demand: &[i32], capacity: i32) -> bool {
    let capacity = i64::from(capacity);
    let mut load = 0i64;
    for &node in route {
        load += i64::from(demand[node]);
        if load > capacity || load < 0 {
            return false;
        }
    }
    true
}

/// Concatenate routes into a single node list.
pub fn flatten(routes: &[Vec<usize>]) -> Vec<usize> {
    routes.iter().flatten().copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::FnCost;

    #[test]
    fn test_split_route() {
        let routes = split_route(&[0, 3, 1, 0, 2, 0]);
        assert_eq!(routes, vec![vec![0, 3, 1, 0], vec![0, 2, 0]]);
    }

    #[test]
    fn test_split_drops_empty_fragments() {
        assert!(split_route(&[0]).is_empty());
        assert_eq!(split_route(&[0, 0, 4, 0, 0]), vec![vec![0, 4, 0]]);
    }

    #[test]
    fn test_route_cost() {
        let cost = FnCost(|a: usize, b: usize| (a as f64 - b as f64).abs());
        assert_eq!(route_cost(&cost, &[0, 2, 5, 0]), 2.0 + 3.0 + 5.0);
        assert_eq!(route_cost(&cost, &[0]), 0.0);
        assert_eq!(total_cost(&cost, &[vec![0, 1, 0], vec![0, 3, 0]]), 8.0);
    }

    #[test]
    fn test_check_demand() {
        let demand = [0, 4, 3, 5, -6];
        assert!(check_demand(&[0, 1, 2, 0], &demand, 10));
        assert!(!check_demand(&[0, 1, 2, 3, 0], &demand, 10));
        // a pickup first drives the running load below zero
        assert!(!check_demand(&[0, 4, 1, 0], &demand, 10));
        assert!(check_demand(&[0, 1, 3, 4, 0], &demand, 10));
    }

    #[test]
    fn test_check_demand_near_i32_limits() {
        let demand = [0, i32::MAX, 1, -i32::MAX];
        assert!(check_demand(&[0, 1, 3, 0], &demand, i32::MAX));
        // i32::MAX + 1 exceeds the capacity instead of wrapping around
        assert!(!check_demand(&[0, 1, 2, 0], &demand, i32::MAX));
    }

    #[test]
    fn test_flatten() {
        assert_eq!(flatten(&[vec![0, 1, 0], vec![0, 2, 0]]), vec![0, 1, 0, 0, 2, 0]);
    }
}
