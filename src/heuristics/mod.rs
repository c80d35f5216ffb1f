//! Heuristics module for the CVRP.
//!
//! This module exports the ant colony and the route improvement operators.

pub mod ant;
pub mod colony;
pub mod local_search;
pub mod pheromone;

pub use ant::*;
pub use colony::*;
pub use local_search::*;
pub use pheromone::*;
