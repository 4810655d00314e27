//! Tour planning
//!
//! Orders a library so that consecutive tracks mix well:
//!
//! 1. [`DistanceMatrix::build`] scores every pair of tracks
//! 2. [`TourSolver`] searches for a low-cost cycle through all of them
//! 3. [`TourReport`] summarizes the result for display
//!
//! A [`Tour`] is evaluated as a cycle: the edge from the last track back to the
//! first counts towards its cost.

mod matrix;
mod report;
mod solver;

pub use matrix::DistanceMatrix;
pub use report::{TourReport, TourStats, TourStep};
pub use solver::{CandidateRun, SolveOutcome, SolverConfig, TourSolver};

/// Ordered permutation of track indices, interpreted as a cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tour(Vec<usize>);

impl Tour {
    pub fn new(order: Vec<usize>) -> Self {
        Self(order)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Track indices in play order
    pub fn order(&self) -> &[usize] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<usize> {
        self.0
    }

    /// Whether this is a permutation of `0..n`
    pub fn is_permutation(&self, n: usize) -> bool {
        if self.0.len() != n {
            return false;
        }
        let mut seen = vec![false; n];
        for &index in &self.0 {
            if index >= n || seen[index] {
                return false;
            }
            seen[index] = true;
        }
        true
    }

    /// Sum of consecutive edges, without the closing edge
    pub fn path_cost(&self, matrix: &DistanceMatrix) -> f64 {
        path_cost(&self.0, matrix)
    }

    /// Sum of all edges including last back to first
    pub fn cyclic_cost(&self, matrix: &DistanceMatrix) -> f64 {
        cyclic_cost(&self.0, matrix)
    }

    /// Consecutive `(from, to)` pairs, without the closing edge
    pub fn transitions(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.0.windows(2).map(|w| (w[0], w[1]))
    }
}

impl std::ops::Index<usize> for Tour {
    type Output = usize;

    fn index(&self, position: usize) -> &usize {
        &self.0[position]
    }
}

pub(crate) fn path_cost(order: &[usize], matrix: &DistanceMatrix) -> f64 {
    order.windows(2).map(|w| matrix.get(w[0], w[1])).sum()
}

pub(crate) fn cyclic_cost(order: &[usize], matrix: &DistanceMatrix) -> f64 {
    match (order.first(), order.last()) {
        (Some(&first), Some(&last)) if order.len() > 1 => {
            path_cost(order, matrix) + matrix.get(last, first)
        }
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_matrix() -> DistanceMatrix {
        DistanceMatrix::from_rows(vec![
            vec![0.0, 1.0, 2.0, 1.0],
            vec![1.0, 0.0, 1.0, 2.0],
            vec![2.0, 1.0, 0.0, 1.0],
            vec![1.0, 2.0, 1.0, 0.0],
        ])
    }

    #[test]
    fn test_is_permutation() {
        assert!(Tour::new(vec![2, 0, 1]).is_permutation(3));
        assert!(Tour::default().is_permutation(0));
        assert!(!Tour::new(vec![0, 0, 1]).is_permutation(3));
        assert!(!Tour::new(vec![0, 3, 1]).is_permutation(3));
        assert!(!Tour::new(vec![0, 1]).is_permutation(3));
    }

    #[test]
    fn test_costs() {
        let matrix = square_matrix();
        let tour = Tour::new(vec![0, 1, 2, 3]);
        assert_eq!(tour.path_cost(&matrix), 3.0);
        assert_eq!(tour.cyclic_cost(&matrix), 4.0);

        let crossed = Tour::new(vec![0, 2, 1, 3]);
        assert_eq!(crossed.cyclic_cost(&matrix), 6.0);

        assert_eq!(Tour::new(vec![2]).cyclic_cost(&matrix), 0.0);
        assert_eq!(Tour::default().cyclic_cost(&matrix), 0.0);
    }

    #[test]
    fn test_transitions() {
        let pairs: Vec<_> = Tour::new(vec![3, 1, 2]).transitions().collect();
        assert_eq!(pairs, vec![(3, 1), (1, 2)]);
    }
}
