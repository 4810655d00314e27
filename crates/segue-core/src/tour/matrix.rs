//! Pairwise transition costs

use crate::compat::CompatibilityModel;
use crate::library::TrackRecord;
use rayon::prelude::*;

/// Square, symmetric matrix of composite distances with a zero diagonal
///
/// Immutable after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    n: usize,
    values: Vec<f64>,
}

impl DistanceMatrix {
    /// Score every pair of tracks with the given model
    ///
    /// Rows are computed in parallel. Only the upper triangle is evaluated and
    /// mirrored, so the result is exactly symmetric even though the tempo
    /// distance is not.
    pub fn build(tracks: &[TrackRecord], model: &CompatibilityModel) -> Self {
        let n = tracks.len();
        let upper: Vec<Vec<f64>> = (0..n)
            .into_par_iter()
            .map(|i| {
                ((i + 1)..n)
                    .map(|j| model.composite_distance(&tracks[i], &tracks[j]))
                    .collect()
            })
            .collect();

        let mut values = vec![0.0; n * n];
        for (i, row) in upper.iter().enumerate() {
            for (offset, &d) in row.iter().enumerate() {
                let j = i + 1 + offset;
                values[i * n + j] = d;
                values[j * n + i] = d;
            }
        }

        log::debug!("Built {}x{} distance matrix", n, n);
        Self { n, values }
    }

    /// Build from explicit rows
    ///
    /// Rows shorter than the row count are padded with zeros; longer rows are
    /// truncated.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Self {
        let n = rows.len();
        let mut values = vec![0.0; n * n];
        for (i, row) in rows.into_iter().enumerate() {
            for (j, d) in row.into_iter().take(n).enumerate() {
                values[i * n + j] = d;
            }
        }
        Self { n, values }
    }

    /// Number of tracks
    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Cost of going from track `i` to track `j`
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.n + j]
    }

    /// Row `i` as a slice
    pub fn row(&self, i: usize) -> &[f64] {
        &self.values[i * self.n..(i + 1) * self.n]
    }
}
