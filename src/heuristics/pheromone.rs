//! Pheromone trail shared by the ants of a colony.
//!
//! Ants only read the matrix while they build their routes; the colony
//! evaporates and reinforces it between iterations.

use serde::{Deserialize, Serialize};

/// Lower bound (exclusive) of an accepted reinforcement.
pub const PHEROMONE_MIN: f64 = 0.1;
/// Upper bound (exclusive) of an accepted reinforcement.
pub const PHEROMONE_MAX: f64 = 5.0;
/// Uniform initial trail used when the caller supplies none.
pub const DEFAULT_INITIAL_PHEROMONE: f64 = 5.0;

/// N×N pheromone matrix with a zero diagonal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PheromoneMatrix {
    values: Vec<Vec<f64>>,
}

impl PheromoneMatrix {
    /// Matrix filled with `value` off the diagonal
    pub fn uniform(n: usize, value: f64) -> Self {
        let mut values = vec![vec![value; n]; n];
        for (i, row) in values.iter_mut().enumerate() {
            row[i] = 0.0;
        }
        PheromoneMatrix { values }
    }

    /// Caller-supplied matrix, e.g. a trail carried over from an earlier run.
    /// Pass it to `Colony::with_pheromone`, which checks its shape.
    /// The diagonal is forced to zero.
    pub fn from_rows(mut values: Vec<Vec<f64>>) -> Self {
        for (i, row) in values.iter_mut().enumerate() {
            if let Some(cell) = row.get_mut(i) {
                *cell = 0.0;
            }
        }
        PheromoneMatrix { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn get(&self, from: usize, to: usize) -> f64 {
        self.values[from][to]
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.values
    }

    /// Scale every off-diagonal cell by `1 - rho`
    pub fn evaporate(&mut self, rho: f64) {
        let factor = 1.0 - rho;
        for (i, row) in self.values.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                if i != j {
                    *cell *= factor;
                }
            }
        }
    }

    /// Deposit `sigma * best_overall_cost / best_iteration_cost` on every
    /// consecutive pair of `route`.
    ///
    /// An update is applied only if the new value lies strictly inside
    /// `(PHEROMONE_MIN, PHEROMONE_MAX)`; otherwise the cell keeps its value.
    /// Returns the number of cells updated.
    pub fn reinforce(&mut self, route: &[usize], sigma: f64, best_overall_cost: f64, best_iteration_cost: f64) -> usize {
        let ratio = if best_iteration_cost > 0.0 {
            best_overall_cost / best_iteration_cost
        } else {
            1.0
        };
        let delta = sigma * ratio;

        let mut updated = 0;
        for w in route.windows(2) {
            let (from, to) = (w[0], w[1]);
            if from == to {
                continue;
            }
            let value = self.values[from][to] + delta;
            if value > PHEROMONE_MIN && value < PHEROMONE_MAX {
                self.values[from][to] = value;
                updated += 1;
            }
        }
        updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_has_zero_diagonal() {
        let m = PheromoneMatrix::uniform(4, DEFAULT_INITIAL_PHEROMONE);
        for i in 0..4 {
            for j in 0..4 {
                let expected = if i == j { 0.0 } else { 5.0 };
                assert_eq!(m.get(i, j), expected);
            }
        }
    }

    #[test]
    fn test_from_rows_resets_diagonal() {
        let m = PheromoneMatrix::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        assert_eq!(m.get(0, 0), 0.0);
        assert_eq!(m.get(1, 1), 0.0);
        assert_eq!(m.get(1, 0), 3.0);
    }

    #[test]
    fn test_evaporate() {
        let mut m = PheromoneMatrix::uniform(3, 2.0);
        m.evaporate(0.25);
        assert!((m.get(0, 1) - 1.5).abs() < 1e-12);
        assert_eq!(m.get(2, 2), 0.0);
    }

    #[test]
    fn test_reinforce_within_band() {
        let mut m = PheromoneMatrix::uniform(3, 1.0);
        let updated = m.reinforce(&[0, 1, 2, 0], 1.0, 90.0, 100.0);

        assert_eq!(updated, 3);
        assert!((m.get(0, 1) - 1.9).abs() < 1e-12);
        assert!((m.get(1, 2) - 1.9).abs() < 1e-12);
        assert!((m.get(2, 0) - 1.9).abs() < 1e-12);
        // reverse direction untouched
        assert_eq!(m.get(1, 0), 1.0);
    }

    #[test]
    fn test_reinforce_discards_out_of_band() {
        let mut m = PheromoneMatrix::uniform(2, 4.5);
        assert_eq!(m.reinforce(&[0, 1], 1.0, 1.0, 1.0), 0);
        assert_eq!(m.get(0, 1), 4.5);

        // reaching exactly the lower bound is rejected too
        let mut low = PheromoneMatrix::uniform(2, 0.0);
        assert_eq!(low.reinforce(&[0, 1], 0.1, 1.0, 1.0), 0);
        assert_eq!(low.get(0, 1), 0.0);
    }

    #[test]
    fn test_bounds_hold_over_many_cycles() {
        let mut m = PheromoneMatrix::uniform(5, DEFAULT_INITIAL_PHEROMONE);
        let routes = [vec![0, 1, 2, 0], vec![0, 3, 4, 0]];
        for _ in 0..200 {
            m.evaporate(0.1);
            for r in &routes {
                m.reinforce(r, 0.7, 1.0, 1.0);
            }
        }
        for i in 0..5 {
            assert_eq!(m.get(i, i), 0.0);
            for j in 0..5 {
                if i != j {
                    assert!(m.get(i, j) < PHEROMONE_MAX);
                }
            }
        }
        for w in routes[0].windows(2) {
            assert!(m.get(w[0], w[1]) > PHEROMONE_MIN);
        }
    }
}
