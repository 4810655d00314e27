//! Human-readable tour summary

use super::{DistanceMatrix, Tour};
use crate::library::TrackRecord;
use crate::music::CamelotKey;
use std::collections::HashSet;
use std::fmt;

/// One line of the tour listing
#[derive(Debug, Clone, PartialEq)]
pub struct TourStep {
    /// 0-based position in the tour
    pub position: usize,
    /// Index into the library
    pub track: usize,
    pub name: String,
    pub bpm: f64,
    pub key: String,
    pub energy: f64,
    /// Edge cost from the previous step (`None` for the first)
    pub distance_from_previous: Option<f64>,
}

/// Aggregate figures over a tour
#[derive(Debug, Clone, PartialEq)]
pub struct TourStats {
    pub bpm_min: f64,
    pub bpm_max: f64,
    pub bpm_mean: f64,
    /// Number of different keys (codes and names normalized)
    pub distinct_keys: usize,
    pub energy_min: f64,
    pub energy_max: f64,
    /// Energy of the first and last tracks
    pub energy_flow: (f64, f64),
}

/// Tour listing plus statistics
#[derive(Debug, Clone, PartialEq)]
pub struct TourReport {
    pub steps: Vec<TourStep>,
    /// Sum of consecutive edges (no closing edge)
    pub path_cost: f64,
    /// Sum including the closing edge
    pub cyclic_cost: f64,
    /// `1 - path_cost / len`
    pub average_compatibility: f64,
    /// `None` for an empty tour
    pub stats: Option<TourStats>,
}

impl TourReport {
    pub fn new(tour: &Tour, tracks: &[TrackRecord], matrix: &DistanceMatrix) -> Self {
        let mut steps = Vec::with_capacity(tour.len());
        let mut previous: Option<usize> = None;

        for (position, &index) in tour.order().iter().enumerate() {
            let track = &tracks[index];
            steps.push(TourStep {
                position,
                track: index,
                name: track.name.clone(),
                bpm: track.bpm,
                key: track.key.clone(),
                energy: track.energy,
                distance_from_previous: previous.map(|p| matrix.get(p, index)),
            });
            previous = Some(index);
        }

        let path_cost = tour.path_cost(matrix);
        let average_compatibility = if tour.is_empty() {
            0.0
        } else {
            1.0 - path_cost / tour.len() as f64
        };

        Self {
            stats: TourStats::compute(tour, tracks),
            path_cost,
            cyclic_cost: tour.cyclic_cost(matrix),
            average_compatibility,
            steps,
        }
    }
}

impl TourStats {
    fn compute(tour: &Tour, tracks: &[TrackRecord]) -> Option<Self> {
        let ordered: Vec<&TrackRecord> = tour.order().iter().map(|&i| &tracks[i]).collect();
        let first = ordered.first()?;
        let last = ordered.last()?;

        let bpms = ordered.iter().map(|t| t.bpm);
        let energies = ordered.iter().map(|t| t.energy);
        let keys: HashSet<String> = ordered
            .iter()
            .map(|t| match CamelotKey::parse(&t.key) {
                Some(key) => key.to_string(),
                None => t.key.trim().to_uppercase(),
            })
            .collect();

        Some(Self {
            bpm_min: bpms.clone().fold(f64::INFINITY, f64::min),
            bpm_max: bpms.clone().fold(f64::NEG_INFINITY, f64::max),
            bpm_mean: bpms.sum::<f64>() / ordered.len() as f64,
            distinct_keys: keys.len(),
            energy_min: energies.clone().fold(f64::INFINITY, f64::min),
            energy_max: energies.fold(f64::NEG_INFINITY, f64::max),
            energy_flow: (first.energy, last.energy),
        })
    }
}

impl fmt::Display for TourReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "TOUR ({} tracks)", self.steps.len())?;
        writeln!(f, "{}", "=".repeat(60))?;
        for step in &self.steps {
            writeln!(f, "{:2}. {}", step.position + 1, step.name)?;
            writeln!(
                f,
                "    BPM: {:.1} | Key: {} | Energy: {:.3}",
                step.bpm, step.key, step.energy
            )?;
            if let Some(distance) = step.distance_from_previous {
                writeln!(f, "    Distance from previous: {:.3}", distance)?;
            }
        }
        writeln!(f)?;
        writeln!(f, "Total distance: {:.3} (cyclic {:.3})", self.path_cost, self.cyclic_cost)?;
        writeln!(
            f,
            "Average compatibility: {:.1}%",
            self.average_compatibility * 100.0
        )?;
        if let Some(stats) = &self.stats {
            write!(f, "{}", stats)?;
        }
        Ok(())
    }
}

impl fmt::Display for TourStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "BPM range: {:.1} - {:.1}", self.bpm_min, self.bpm_max)?;
        writeln!(f, "BPM average: {:.1}", self.bpm_mean)?;
        writeln!(f, "Keys used: {}", self.distinct_keys)?;
        writeln!(
            f,
            "Energy range: {:.3} - {:.3}",
            self.energy_min, self.energy_max
        )?;
        writeln!(
            f,
            "Energy flow: {:.3} -> {:.3}",
            self.energy_flow.0, self.energy_flow.1
        )
    }
}
