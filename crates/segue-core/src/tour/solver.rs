//! Tour solver: nearest-neighbor construction plus 2-opt local search
//!
//! Several start indices are tried; each nearest-neighbor path is improved
//! with first-improvement 2-opt and the cheapest cycle wins.
//!
//! # 2-opt move
//!
//! Reversing the segment `[i, j)` replaces edges `(i-1, i)` and `(j-1, j)`
//! with `(i-1, j-1)` and `(i, j)`. The first and last positions are never
//! moved, so every candidate keeps the same starting track.

use super::{cyclic_cost, path_cost, DistanceMatrix, Tour};
use serde::{Deserialize, Serialize};

/// Solver limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Number of start indices tried (`0..min(max_starts, n)`)
    pub max_starts: usize,
    /// Cap on accepted 2-opt improvements per start
    pub max_iterations: usize,
    /// Relative tempo tolerance for the compatibility model
    pub harmonic_tolerance: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_starts: 5,
            max_iterations: 1000,
            harmonic_tolerance: crate::compat::HARMONIC_TOLERANCE,
        }
    }
}

/// Result of one start index
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateRun {
    pub start: usize,
    /// Cyclic cost of the nearest-neighbor path
    pub nn_cost: f64,
    /// Cyclic cost after 2-opt
    pub improved_cost: f64,
    /// Accepted 2-opt improvements
    pub iterations: usize,
    /// Whether the improvement cap was reached
    pub hit_cap: bool,
}

/// Best tour plus per-start diagnostics
#[derive(Debug, Clone, PartialEq)]
pub struct SolveOutcome {
    pub tour: Tour,
    /// Cyclic cost of `tour`
    pub cost: f64,
    pub runs: Vec<CandidateRun>,
}

/// Searches for a low-cost cycle through a [`DistanceMatrix`]
pub struct TourSolver<'a> {
    matrix: &'a DistanceMatrix,
    config: SolverConfig,
}

impl<'a> TourSolver<'a> {
    pub fn new(matrix: &'a DistanceMatrix, config: SolverConfig) -> Self {
        Self { matrix, config }
    }

    /// Best tour across all start indices
    pub fn solve(&self) -> Tour {
        self.solve_detailed().tour
    }

    /// Like [`solve`](Self::solve), keeping the per-start results
    pub fn solve_detailed(&self) -> SolveOutcome {
        let n = self.matrix.len();
        if n <= 1 {
            return SolveOutcome {
                tour: Tour::new((0..n).collect()),
                cost: 0.0,
                runs: Vec::new(),
            };
        }

        let starts = self.config.max_starts.max(1).min(n);
        let mut best: Option<(Vec<usize>, f64)> = None;
        let mut runs = Vec::with_capacity(starts);

        for start in 0..starts {
            let path = self.nearest_neighbor(start);
            let nn_cost = cyclic_cost(&path, self.matrix);
            let (improved, iterations) = self.improve_2opt(path);
            let improved_cost = cyclic_cost(&improved, self.matrix);
            let hit_cap = iterations >= self.config.max_iterations;

            log::debug!(
                "Start {}: nearest neighbor {:.3}, 2-opt {:.3} after {} improvements",
                start,
                nn_cost,
                improved_cost,
                iterations
            );
            if hit_cap {
                log::debug!("Start {}: 2-opt stopped at the iteration cap", start);
            }

            runs.push(CandidateRun {
                start,
                nn_cost,
                improved_cost,
                iterations,
                hit_cap,
            });

            // Strictly lower cost replaces; ties keep the earlier start
            if best.as_ref().map_or(true, |(_, cost)| improved_cost < *cost) {
                best = Some((improved, improved_cost));
            }
        }

        let (order, cost) = best.unwrap_or_default();
        log::info!("Best tour over {} tracks: cyclic cost {:.3}", n, cost);
        SolveOutcome {
            tour: Tour::new(order),
            cost,
            runs,
        }
    }

    /// Greedy path from `start`, always moving to the closest unvisited track
    ///
    /// Ties go to the lowest index.
    pub fn nearest_neighbor(&self, start: usize) -> Vec<usize> {
        let n = self.matrix.len();
        if n == 0 {
            return Vec::new();
        }
        let start = start.min(n - 1);

        let mut visited = vec![false; n];
        let mut path = Vec::with_capacity(n);
        visited[start] = true;
        path.push(start);
        let mut current = start;

        while path.len() < n {
            let mut nearest: Option<(usize, f64)> = None;
            for candidate in (0..n).filter(|&c| !visited[c]) {
                let d = self.matrix.get(current, candidate);
                if nearest.map_or(true, |(_, best)| d < best) {
                    nearest = Some((candidate, d));
                }
            }
            let Some((next, _)) = nearest else { break };
            visited[next] = true;
            path.push(next);
            current = next;
        }

        path
    }

    /// First-improvement 2-opt on the cyclic cost
    ///
    /// Returns the improved tour and the number of accepted moves. Stops after
    /// a full scan without improvement or at `max_iterations` moves.
    pub fn improve_2opt(&self, tour: Vec<usize>) -> (Vec<usize>, usize) {
        let n = tour.len();
        let mut best = tour;
        if n < 4 {
            return (best, 0);
        }

        let mut best_cost = cyclic_cost(&best, self.matrix);
        let mut candidate = best.clone();
        let mut iterations = 0;

        'search: while iterations < self.config.max_iterations {
            for i in 1..n - 2 {
                for j in (i + 2)..n {
                    candidate.copy_from_slice(&best);
                    candidate[i..j].reverse();
                    let cost = cyclic_cost(&candidate, self.matrix);
                    if cost < best_cost {
                        std::mem::swap(&mut best, &mut candidate);
                        best_cost = cost;
                        iterations += 1;
                        continue 'search;
                    }
                }
            }
            break;
        }

        (best, iterations)
    }

    /// Open-path cost of a track order, for reporting
    pub fn path_cost(&self, order: &[usize]) -> f64 {
        path_cost(order, self.matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compat::CompatibilityModel;
    use crate::library::TrackRecord;

    /// Points on a line; distance is the gap between positions
    fn line_matrix(positions: &[f64]) -> DistanceMatrix {
        DistanceMatrix::from_rows(
            positions
                .iter()
                .map(|a| positions.iter().map(|b| (a - b).abs()).collect())
                .collect(),
        )
    }

    fn pseudo_random_matrix(n: usize, seed: u64) -> DistanceMatrix {
        let mut state = seed;
        let mut next = move || {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (state >> 33) as f64 / (1u64 << 31) as f64
        };
        let mut rows = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in (i + 1)..n {
                let d = next();
                rows[i][j] = d;
                rows[j][i] = d;
            }
        }
        DistanceMatrix::from_rows(rows)
    }

    #[test]
    fn test_trivial_tours() {
        let empty = DistanceMatrix::from_rows(Vec::new());
        assert!(TourSolver::new(&empty, SolverConfig::default())
            .solve()
            .is_empty());

        let single = DistanceMatrix::from_rows(vec![vec![0.0]]);
        let tour = TourSolver::new(&single, SolverConfig::default()).solve();
        assert_eq!(tour.order(), &[0]);
    }

    #[test]
    fn test_solve_returns_permutation() {
        for n in 2..12 {
            let matrix = pseudo_random_matrix(n, n as u64);
            let tour = TourSolver::new(&matrix, SolverConfig::default()).solve();
            assert!(tour.is_permutation(n), "n={n}: {:?}", tour);
        }
    }

    #[test]
    fn test_nearest_neighbor_ties_lowest_index() {
        let matrix = DistanceMatrix::from_rows(vec![
            vec![0.0, 1.0, 1.0, 1.0],
            vec![1.0, 0.0, 1.0, 1.0],
            vec![1.0, 1.0, 0.0, 1.0],
            vec![1.0, 1.0, 1.0, 0.0],
        ]);
        let solver = TourSolver::new(&matrix, SolverConfig::default());
        assert_eq!(solver.nearest_neighbor(2), vec![2, 0, 1, 3]);
    }

    #[test]
    fn test_two_opt_never_worse_than_nearest_neighbor() {
        for seed in 0..20 {
            let matrix = pseudo_random_matrix(9, seed);
            let outcome = TourSolver::new(&matrix, SolverConfig::default()).solve_detailed();
            assert_eq!(outcome.runs.len(), 5);
            for run in &outcome.runs {
                assert!(run.improved_cost <= run.nn_cost + 1e-12);
            }
            let best_run = outcome
                .runs
                .iter()
                .map(|r| r.improved_cost)
                .fold(f64::INFINITY, f64::min);
            assert_eq!(outcome.cost, best_run);
            assert!((outcome.tour.cyclic_cost(&matrix) - outcome.cost).abs() < 1e-12);
        }
    }

    #[test]
    fn test_two_opt_uncrosses_line() {
        // Zig-zag order costs 3 + 2 + 3 + 2 + 3 + 5 = 18
        let matrix = line_matrix(&[0.0, 3.0, 1.0, 4.0, 2.0, 5.0]);
        let solver = TourSolver::new(&matrix, SolverConfig::default());
        let start = vec![0, 1, 2, 3, 4, 5];
        assert_eq!(cyclic_cost(&start, &matrix), 18.0);

        let (improved, iterations) = solver.improve_2opt(start);
        assert!(iterations >= 1);
        assert!(cyclic_cost(&improved, &matrix) <= 14.0);
        assert!(Tour::new(improved.clone()).is_permutation(6));
        assert_eq!(improved[0], 0);
    }

    #[test]
    fn test_two_opt_takes_first_improving_move() {
        // From 0-1-2-3-4, reversing [1..3) saves 1 and reversing [1..4) saves 10
        let matrix = DistanceMatrix::from_rows(vec![
            vec![0.0, 10.0, 9.0, 5.0, 10.0],
            vec![10.0, 0.0, 10.0, 10.0, 5.0],
            vec![9.0, 10.0, 0.0, 10.0, 10.0],
            vec![5.0, 10.0, 10.0, 0.0, 10.0],
            vec![10.0, 5.0, 10.0, 10.0, 0.0],
        ]);
        let start = vec![0, 1, 2, 3, 4];
        assert_eq!(cyclic_cost(&start, &matrix), 50.0);

        let solver = TourSolver::new(&matrix, SolverConfig::default());
        let (improved, iterations) = solver.improve_2opt(start.clone());
        // 50 -> 49 -> 45 -> 40
        assert_eq!(improved, vec![0, 3, 2, 1, 4]);
        assert_eq!(iterations, 3);
        assert_eq!(cyclic_cost(&improved, &matrix), 40.0);

        let one_move = TourSolver::new(
            &matrix,
            SolverConfig {
                max_iterations: 1,
                ..Default::default()
            },
        );
        let (first, count) = one_move.improve_2opt(start);
        assert_eq!(first, vec![0, 2, 1, 3, 4]);
        assert_eq!(count, 1);
    }

    #[test]
    fn test_iteration_cap() {
        let matrix = pseudo_random_matrix(10, 7);
        let config = SolverConfig {
            max_iterations: 1,
            ..Default::default()
        };
        let solver = TourSolver::new(&matrix, config);
        let path = solver.nearest_neighbor(0);
        let (improved, iterations) = solver.improve_2opt(path.clone());
        assert!(iterations <= 1);
        assert!(cyclic_cost(&improved, &matrix) <= cyclic_cost(&path, &matrix));

        let (unchanged, zero) = TourSolver::new(
            &matrix,
            SolverConfig {
                max_iterations: 0,
                ..Default::default()
            },
        )
        .improve_2opt(path.clone());
        assert_eq!(zero, 0);
        assert_eq!(unchanged, path);
    }

    #[test]
    fn test_start_count_limited_by_size() {
        let matrix = pseudo_random_matrix(3, 1);
        let outcome = TourSolver::new(&matrix, SolverConfig::default()).solve_detailed();
        assert_eq!(outcome.runs.len(), 3);
        assert!(outcome.tour.is_permutation(3));
    }

    #[test]
    fn test_tempo_scenario() {
        let tracks = vec![
            TrackRecord::new("0", "Opener", 120.0, "8A", 0.20, 200.0),
            TrackRecord::new("1", "Neighbor", 122.0, "8A", 0.21, 200.0),
            TrackRecord::new("2", "Downtempo", 90.0, "3B", 0.60, 200.0),
            TrackRecord::new("3", "Peak", 125.0, "10B", 0.40, 200.0),
        ];
        let matrix = DistanceMatrix::build(&tracks, &CompatibilityModel::default());
        let solver = TourSolver::new(&matrix, SolverConfig::default());

        let path = solver.nearest_neighbor(0);
        assert_eq!(path[1], 1);

        let nn_cost = cyclic_cost(&path, &matrix);
        let (improved, _) = solver.improve_2opt(path);
        assert!(cyclic_cost(&improved, &matrix) <= nn_cost);
    }
}
