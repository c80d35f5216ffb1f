//! CVRP Ant Colony Solver Library
//!
//! Solves the Capacitated Vehicle Routing Problem with delivery and pickup
//! demand using Ant Colony Optimization.
//!
//! # Features
//!
//! - Capacity-aware ant construction with pheromone, distance, depot-saving
//!   and load heuristics
//! - Route reversal and 2-opt improvement of every ant's routes
//! - Parallel ants on a rayon pool, evaporation and best-of-iteration reinforcement
//! - Benchmarking against best-known costs
//!
//! # Example
//!
//! ```no_run
//! use cvrp_aco::instance::CvrpInstance;
//! use cvrp_aco::heuristics::colony::{Colony, ColonyConfig};
//!
//! let instance = CvrpInstance::from_file("dataset/parma5.txt").unwrap();
//! let mut colony = Colony::new(&instance, ColonyConfig::default()).unwrap();
//!
//! match colony.run() {
//!     Ok(solution) => println!("Solution cost: {:.2}", solution.cost),
//!     Err(e) => eprintln!("No feasible solution: {}", e),
//! }
//! ```

pub mod error;
pub mod instance;
pub mod route;
pub mod solution;
pub mod heuristics;
pub mod benchmark;

pub use error::{AcoError, InstanceError};
pub use heuristics::colony::{Colony, ColonyConfig};
pub use instance::{CostOracle, CvrpInstance, FnCost};
pub use solution::Solution;
