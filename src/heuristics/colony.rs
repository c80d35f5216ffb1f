//! Ant Colony Optimization for the CVRP.
//!
//! Every iteration dispatches the whole ant pool in parallel on a shared,
//! read-only pheromone matrix, waits for all of them, keeps the cheapest
//! route set, then evaporates the trail and reinforces the edges of the
//! best route set of the iteration. The matrix is only mutated once all ants
//! have returned.

use std::time::Instant;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::AcoError;
use crate::heuristics::ant::{Ant, AntContext, AntParams, AntTour};
use crate::heuristics::local_search::RouteOptimizer;
use crate::heuristics::pheromone::{PheromoneMatrix, DEFAULT_INITIAL_PHEROMONE};
use crate::instance::{CostOracle, CvrpInstance};
use crate::solution::Solution;

/// Colony configuration parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColonyConfig {
    /// Number of ants
    pub colony_size: usize,
    /// Pheromone influence
    pub alpha: f64,
    /// Distance influence
    pub beta: f64,
    /// Depot saving influence
    pub gamma: f64,
    /// Capacity usage influence
    pub lambda: f64,
    /// Evaporation rate in [0, 1]
    pub rho: f64,
    /// Pheromone deposit factor
    pub sigma: f64,
    /// Number of iterations
    pub iterations: usize,
    /// Uniform initial pheromone level
    pub initial_pheromone: f64,
    /// Forced returns to the depot an ant may make without progress
    /// before giving up (defaults to the node count)
    pub max_retries: Option<usize>,
    /// Random seed
    pub seed: u64,
    /// Worker threads; `None` uses the global rayon pool
    pub threads: Option<usize>,
}

impl Default for ColonyConfig {
    fn default() -> Self {
        ColonyConfig {
            colony_size: 50,
            alpha: 6.0,
            beta: 5.0,
            gamma: 5.0,
            lambda: 5.0,
            rho: 0.4,
            sigma: 1.0,
            iterations: 100,
            initial_pheromone: DEFAULT_INITIAL_PHEROMONE,
            max_retries: None,
            seed: 42,
            threads: None,
        }
    }
}

impl ColonyConfig {
    pub fn validate(&self) -> Result<(), AcoError> {
        if self.colony_size == 0 {
            return Err(AcoError::InvalidConfig("colony size must be at least 1".to_string()));
        }
        if self.iterations == 0 {
            return Err(AcoError::InvalidConfig("iterations must be at least 1".to_string()));
        }
        if !(0.0..=1.0).contains(&self.rho) {
            return Err(AcoError::InvalidConfig(format!("rho must lie in [0, 1], got {}", self.rho)));
        }
        for (name, value) in [
            ("alpha", self.alpha),
            ("beta", self.beta),
            ("gamma", self.gamma),
            ("lambda", self.lambda),
            ("sigma", self.sigma),
            ("initial_pheromone", self.initial_pheromone),
        ] {
            if !value.is_finite() {
                return Err(AcoError::InvalidConfig(format!("{} must be finite, got {}", name, value)));
            }
        }
        if self.threads == Some(0) {
            return Err(AcoError::InvalidConfig("threads must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn ant_params(&self) -> AntParams {
        AntParams {
            alpha: self.alpha,
            beta: self.beta,
            gamma: self.gamma,
            lambda: self.lambda,
            max_retries: self.max_retries,
        }
    }
}

/// Where the colony stands in its iteration loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColonyPhase {
    Idle,
    Dispatching,
    Collecting,
    Updating,
    Terminated,
}

/// Outcome of one iteration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationStats {
    pub iteration: usize,
    pub best_iteration_cost: f64,
    pub best_overall_cost: f64,
    /// Consecutive iterations without a strictly better overall cost
    pub stagnation: usize,
}

/// Ant colony solver
pub struct Colony<'a, C: CostOracle = CvrpInstance> {
    instance: &'a CvrpInstance,
    cost: &'a C,
    config: ColonyConfig,
    pheromone: PheromoneMatrix,
    ants: Vec<Ant>,
    optimizer: RouteOptimizer,
    rng: ChaCha8Rng,
    pool: Option<rayon::ThreadPool>,
    phase: ColonyPhase,
    history: Vec<IterationStats>,
    stagnation: usize,
}

impl<'a> Colony<'a, CvrpInstance> {
    /// Colony whose travel costs come from the instance's matrix
    pub fn new(instance: &'a CvrpInstance, config: ColonyConfig) -> Result<Self, AcoError> {
        Self::with_cost_oracle(instance, instance, config)
    }
}

impl<'a, C: CostOracle> Colony<'a, C> {
    /// Colony with a separate cost oracle. Desirability still uses the
    /// instance's distance matrix; route costs use `cost`.
    pub fn with_cost_oracle(instance: &'a CvrpInstance, cost: &'a C, config: ColonyConfig) -> Result<Self, AcoError> {
        config.validate()?;
        check_instance(instance)?;

        let pool = match config.threads {
            Some(threads) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .map_err(|e| AcoError::ThreadPool(e.to_string()))?,
            ),
            None => None,
        };

        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let ants = (0..config.colony_size)
            .map(|id| Ant::new(id, instance.dimension, rng.gen()))
            .collect();
        let pheromone = PheromoneMatrix::uniform(instance.dimension, config.initial_pheromone);

        Ok(Colony {
            instance,
            cost,
            config,
            pheromone,
            ants,
            optimizer: RouteOptimizer::with_standard_operators(),
            rng,
            pool,
            phase: ColonyPhase::Idle,
            history: Vec::new(),
            stagnation: 0,
        })
    }

    /// Start from a caller-supplied pheromone matrix instead of the uniform one
    pub fn with_pheromone(mut self, pheromone: PheromoneMatrix) -> Result<Self, AcoError> {
        let n = self.instance.dimension;
        if pheromone.len() != n || pheromone.rows().iter().any(|r| r.len() != n) {
            return Err(AcoError::InvalidConfig(format!(
                "pheromone matrix must be {}x{}",
                n, n
            )));
        }
        self.pheromone = pheromone;
        Ok(self)
    }

    pub fn config(&self) -> &ColonyConfig {
        &self.config
    }

    pub fn pheromone(&self) -> &PheromoneMatrix {
        &self.pheromone
    }

    pub fn phase(&self) -> ColonyPhase {
        self.phase
    }

    /// One entry per completed iteration of the last run
    pub fn history(&self) -> &[IterationStats] {
        &self.history
    }

    /// Iterations since the last improvement of the best solution
    pub fn stagnation(&self) -> usize {
        self.stagnation
    }

    /// Run the full iteration loop and return the best solution found.
    ///
    /// Fails as soon as any ant cannot build a feasible route set.
    pub fn run(&mut self) -> Result<Solution, AcoError> {
        let start = Instant::now();
        log::info!(
            "Starting colony on {} ({} nodes, {} ants, {} iterations)",
            self.instance.name,
            self.instance.dimension,
            self.config.colony_size,
            self.config.iterations
        );

        self.history.clear();
        self.stagnation = 0;
        let mut best: Option<AntTour> = None;

        for iteration in 0..self.config.iterations {
            self.set_phase(ColonyPhase::Dispatching);
            let results = self.dispatch(iteration);

            self.set_phase(ColonyPhase::Collecting);
            let mut best_iteration: Option<AntTour> = None;
            for result in results {
                let tour = match result {
                    Ok(tour) => tour,
                    Err(e) => {
                        log::warn!("Aborting colony run: {}", e);
                        self.set_phase(ColonyPhase::Terminated);
                        return Err(e);
                    }
                };
                if best_iteration.as_ref().map_or(true, |b| tour.cost < b.cost) {
                    best_iteration = Some(tour);
                }
            }
            let Some(best_iteration) = best_iteration else {
                break;
            };

            if best.as_ref().map_or(true, |b| best_iteration.cost < b.cost) {
                log::info!("Iteration {}: new best cost {:.2}", iteration, best_iteration.cost);
                best = Some(best_iteration.clone());
                self.stagnation = 0;
            } else {
                self.stagnation += 1;
            }
            let best_overall_cost = best.as_ref().map_or(best_iteration.cost, |b| b.cost);

            self.set_phase(ColonyPhase::Updating);
            self.update_pheromone(&best_iteration.routes, best_overall_cost, best_iteration.cost);

            log::debug!(
                "Iteration {}: iteration best {:.2}, overall best {:.2}, stagnation {}",
                iteration,
                best_iteration.cost,
                best_overall_cost,
                self.stagnation
            );
            self.history.push(IterationStats {
                iteration,
                best_iteration_cost: best_iteration.cost,
                best_overall_cost,
                stagnation: self.stagnation,
            });

            self.reset_ants();
            self.set_phase(ColonyPhase::Idle);
        }

        self.set_phase(ColonyPhase::Terminated);

        let best = best.ok_or_else(|| AcoError::InvalidConfig("no iteration completed".to_string()))?;
        let elapsed = start.elapsed().as_secs_f64();
        log::info!("Colony finished: cost {:.2} in {:.2}s", best.cost, elapsed);

        Ok(Solution {
            routes: best.routes,
            cost: best.cost,
            algorithm: "ACO".to_string(),
            computation_time: elapsed,
            iterations: Some(self.history.len()),
            stagnation: Some(self.stagnation),
        })
    }

    /// Run every ant once on the current trail. Exactly one result per ant.
    fn dispatch(&mut self, iteration: usize) -> Vec<Result<AntTour, AcoError>> {
        let params = self.config.ant_params();
        let ctx = AntContext {
            instance: self.instance,
            cost: self.cost,
            pheromone: &self.pheromone,
            params: &params,
            optimizer: &self.optimizer,
            iteration,
        };
        let ants = &mut self.ants;

        match &self.pool {
            Some(pool) => pool.install(|| forage_all(ants, &ctx)),
            None => forage_all(ants, &ctx),
        }
    }

    /// Evaporate the whole trail, then reinforce every route of the
    /// iteration's best route set
    fn update_pheromone(&mut self, routes: &[Vec<usize>], best_overall_cost: f64, best_iteration_cost: f64) {
        self.pheromone.evaporate(self.config.rho);
        for r in routes {
            self.pheromone
                .reinforce(r, self.config.sigma, best_overall_cost, best_iteration_cost);
        }
    }

    fn reset_ants(&mut self) {
        for ant in self.ants.iter_mut() {
            ant.reset(self.rng.gen());
        }
    }

    fn set_phase(&mut self, phase: ColonyPhase) {
        log::trace!("Colony phase {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }
}

fn forage_all<C: CostOracle>(ants: &mut [Ant], ctx: &AntContext<'_, C>) -> Vec<Result<AntTour, AcoError>> {
    ants.par_iter_mut().map(|ant| ant.forage(ctx)).collect()
}

fn check_instance(instance: &CvrpInstance) -> Result<(), AcoError> {
    let n = instance.dimension;
    if n == 0 {
        return Err(AcoError::InvalidInstance("no nodes".to_string()));
    }
    if instance.demand.len() != n {
        return Err(AcoError::InvalidInstance(format!(
            "{} nodes but {} demand values",
            n,
            instance.demand.len()
        )));
    }
    if instance.distance_matrix.len() != n || instance.distance_matrix.iter().any(|r| r.len() != n) {
        return Err(AcoError::InvalidInstance(format!("distance matrix must be {}x{}", n, n)));
    }
    if instance.capacity <= 0 {
        return Err(AcoError::InvalidInstance("capacity must be positive".to_string()));
    }
    Ok(())
}
