//! A single ant: one construction pass over all customers.
//!
//! The ant starts at the depot and repeatedly picks one of the two most
//! desirable unvisited nodes. Desirability mixes four factors:
//! - `tau`: pheromone on the edge, raised to `alpha`
//! - `eta`: inverse distance, raised to `beta`
//! - `mi`: saving of visiting the node from here rather than from the depot, raised to `gamma`
//! - `k`: capacity usage after serving the node, raised to `lambda`
//!
//! Whenever the next node does not fit in the vehicle, or reaching it
//! through the depot is cheaper, the ant goes back to the depot first.

use ordered_float::OrderedFloat;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::error::AcoError;
use crate::heuristics::local_search::{RouteContext, RouteOptimizer};
use crate::heuristics::pheromone::PheromoneMatrix;
use crate::instance::{CostOracle, CvrpInstance};
use crate::route::{self, DEPOT};

/// Exponents of the desirability model and the construction retry bound
#[derive(Debug, Clone, Copy)]
pub struct AntParams {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    pub lambda: f64,
    /// Forced returns allowed without progress; `None` means the node count
    pub max_retries: Option<usize>,
}

/// Everything an ant reads during one iteration. Shared by all ants.
pub struct AntContext<'a, C: CostOracle> {
    pub instance: &'a CvrpInstance,
    pub cost: &'a C,
    pub pheromone: &'a PheromoneMatrix,
    pub params: &'a AntParams,
    pub optimizer: &'a RouteOptimizer,
    pub iteration: usize,
}

/// Routes produced by one ant, after local search
#[derive(Debug, Clone)]
pub struct AntTour {
    pub routes: Vec<Vec<usize>>,
    /// Total cost after local search
    pub cost: f64,
    /// Cost of the raw visitation sequence
    pub construction_cost: f64,
}

/// `ln(base^exponent)`, with a zero (or negative) factor floored to the
/// smallest positive `f64`.
#[inline]
fn floored_ln_pow(base: f64, exponent: f64) -> f64 {
    if exponent == 0.0 {
        return 0.0;
    }
    let floor = f64::MIN_POSITIVE.ln();
    if base.is_nan() || base <= 0.0 {
        return floor;
    }
    let value = exponent * base.min(f64::MAX).ln();
    if value.is_nan() {
        floor
    } else {
        value.max(floor)
    }
}

/// Log-desirability of moving from `current` to `candidate` with `load` on board.
pub fn log_desirability(
    instance: &CvrpInstance,
    pheromone: &PheromoneMatrix,
    params: &AntParams,
    current: usize,
    candidate: usize,
    load: i64,
) -> f64 {
    let distance = instance.distance(current, candidate);
    let inverse_distance = if distance > 0.0 { 1.0 / distance } else { f64::MAX };
    let saving = instance.distance(current, DEPOT) + instance.distance(DEPOT, candidate) - distance;
    let usage = (load as f64 + instance.demand[candidate].unsigned_abs() as f64) / instance.capacity as f64;

    floored_ln_pow(pheromone.get(current, candidate), params.alpha)
        + floored_ln_pow(inverse_distance, params.beta)
        + floored_ln_pow(saving, params.gamma)
        + floored_ln_pow(usage, params.lambda)
}

/// One worker of the colony. Reused across iterations through [`Ant::reset`].
#[derive(Debug, Clone)]
pub struct Ant {
    id: usize,
    current: usize,
    route: Vec<usize>,
    unvisited: Vec<bool>,
    remaining: usize,
    /// Widened so that a full vehicle plus any demand cannot overflow
    load: i64,
    cost: f64,
    probabilities: Vec<f64>,
    rng: ChaCha8Rng,
}

impl Ant {
    pub fn new(id: usize, dimension: usize, seed: u64) -> Self {
        let mut ant = Ant {
            id,
            current: DEPOT,
            route: Vec::with_capacity(2 * dimension),
            unvisited: vec![false; dimension],
            remaining: 0,
            load: 0,
            cost: 0.0,
            probabilities: vec![0.0; dimension],
            rng: ChaCha8Rng::seed_from_u64(seed),
        };
        ant.reset(seed);
        ant
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Discard the previous pass and reseed the ant
    pub fn reset(&mut self, seed: u64) {
        self.current = DEPOT;
        self.route.clear();
        self.route.push(DEPOT);
        self.unvisited.iter_mut().for_each(|u| *u = true);
        if let Some(depot) = self.unvisited.get_mut(DEPOT) {
            *depot = false;
        }
        self.remaining = self.unvisited.len().saturating_sub(1);
        self.load = 0;
        self.cost = 0.0;
        self.rng = ChaCha8Rng::seed_from_u64(seed);
    }

    /// Visitation sequence of the current pass
    pub fn sequence(&self) -> &[usize] {
        &self.route
    }

    /// Build a full visitation sequence, split it into routes and improve them
    pub fn forage<C: CostOracle>(&mut self, ctx: &AntContext<'_, C>) -> Result<AntTour, AcoError> {
        self.construct(ctx)?;

        let construction_cost = self.cost;
        let mut routes = route::split_route(&self.route);
        let route_ctx = RouteContext::new(ctx.cost, &ctx.instance.demand, ctx.instance.capacity);
        let cost = ctx.optimizer.optimize(&route_ctx, &mut routes);

        Ok(AntTour { routes, cost, construction_cost })
    }

    /// Construction pass. Fills `self.route` from depot back to depot.
    pub fn construct<C: CostOracle>(&mut self, ctx: &AntContext<'_, C>) -> Result<(), AcoError> {
        let instance = ctx.instance;
        let max_load = i64::from(instance.capacity);
        let retry_bound = ctx.params.max_retries.unwrap_or(instance.dimension);
        let mut retries = retry_bound;

        while self.remaining > 0 {
            let next = match self.select_next(ctx) {
                Some(node) => node,
                None => break,
            };
            let demand = i64::from(instance.demand[next]);

            // leave the depot full so that pickups have room
            if demand < 0 && self.current == DEPOT {
                self.load = max_load;
            }

            let new_load = self.load + demand;
            if new_load > max_load || new_load < 0 {
                if retries == 0 {
                    return Err(AcoError::InfeasibleConstruction {
                        iteration: ctx.iteration,
                        ant: self.id,
                        unvisited: self.remaining,
                    });
                }
                retries -= 1;
                self.return_to_depot(ctx.cost);
                continue;
            }

            if self.current != DEPOT && self.detour_is_cheaper(ctx.cost, next) {
                self.return_to_depot(ctx.cost);
                continue;
            }

            self.step(ctx.cost, next, demand);
            retries = retry_bound;
        }

        if self.route.last() != Some(&DEPOT) {
            self.return_to_depot(ctx.cost);
        }

        Ok(())
    }

    /// Whether going `current -> depot -> next` beats `current -> next`
    fn detour_is_cheaper<C: CostOracle>(&self, cost: &C, next: usize) -> bool {
        let direct = cost.cost(self.current, next);
        let detour = cost.cost(self.current, DEPOT) + cost.cost(DEPOT, next);
        direct > detour
    }

    /// Close the current route at the depot. At the depot only the load is reset.
    fn return_to_depot<C: CostOracle + ?Sized>(&mut self, cost: &C) {
        if self.current != DEPOT {
            self.cost += cost.cost(self.current, DEPOT);
            self.route.push(DEPOT);
            self.current = DEPOT;
        }
        self.load = 0;
    }

    fn step<C: CostOracle + ?Sized>(&mut self, cost: &C, next: usize, demand: i64) {
        debug_assert!(self.unvisited[next], "node {} visited twice", next);
        self.unvisited[next] = false;
        self.remaining -= 1;

        self.cost += cost.cost(self.current, next);
        self.route.push(next);
        self.load += demand;
        self.current = next;
    }

    /// Fill `self.probabilities` for every unvisited node (0 elsewhere)
    fn compute_probabilities<C: CostOracle>(&mut self, ctx: &AntContext<'_, C>) {
        let mut max_score = f64::NEG_INFINITY;
        for node in 0..self.unvisited.len() {
            if self.unvisited[node] {
                let score = log_desirability(ctx.instance, ctx.pheromone, ctx.params, self.current, node, self.load);
                self.probabilities[node] = score;
                if score > max_score {
                    max_score = score;
                }
            }
        }

        // shift by the largest score so the exponentials cannot overflow
        let mut total = 0.0;
        for node in 0..self.unvisited.len() {
            if self.unvisited[node] {
                let weight = (self.probabilities[node] - max_score).exp();
                let weight = if weight.is_nan() { 0.0 } else { weight };
                self.probabilities[node] = weight;
                total += weight;
            } else {
                self.probabilities[node] = 0.0;
            }
        }

        if total <= 0.0 || total.is_nan() {
            total = f64::MIN_POSITIVE;
        }
        for p in self.probabilities.iter_mut() {
            *p /= total;
        }
    }

    /// Uniform pick between the two most probable unvisited nodes.
    /// Ties go to the lower node id; a single candidate is taken as is.
    fn select_next<C: CostOracle>(&mut self, ctx: &AntContext<'_, C>) -> Option<usize> {
        self.compute_probabilities(ctx);

        let mut first: Option<(usize, OrderedFloat<f64>)> = None;
        let mut second: Option<(usize, OrderedFloat<f64>)> = None;
        for node in 0..self.unvisited.len() {
            if !self.unvisited[node] {
                continue;
            }
            let p = OrderedFloat(self.probabilities[node]);
            match first {
                Some((_, best)) if p <= best => {
                    if second.map_or(true, |(_, s)| p > s) {
                        second = Some((node, p));
                    }
                }
                _ => {
                    second = first;
                    first = Some((node, p));
                }
            }
        }

        match (first, second) {
            (Some((a, _)), Some((b, _))) => Some(if self.rng.gen_bool(0.5) { a } else { b }),
            (Some((a, _)), None) => Some(a),
            _ => None,
        }
    }
}
