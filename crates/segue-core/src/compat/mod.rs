//! Track compatibility model
//!
//! Pure functions scoring how well two tracks mix:
//!
//! - **Key distance**: steps around the Camelot wheel, plus a penalty for
//!   crossing between the minor (A) and major (B) sides
//! - **Tempo distance**: direct ratio, or closeness to a harmonic ratio
//!   (double/half time, 3:2, 4:3)
//! - **Energy distance**: absolute loudness difference
//!
//! The composite distance drives the tour solver; the crossfade compatibility
//! (its complement) only decides when a transition starts.
//!
//! All distances are in `[0, 1]`, where 0 is a perfect match.

use crate::library::TrackRecord;
use crate::music::{CamelotKey, WHEEL_SIZE};

// ═══════════════════════════════════════════════════════════════════════════
// Constants
// ═══════════════════════════════════════════════════════════════════════════

/// Weight of the key distance in the composite
pub const KEY_WEIGHT: f64 = 0.5;
/// Weight of the tempo distance in the composite
pub const BPM_WEIGHT: f64 = 0.35;
/// Weight of the energy distance in the composite
pub const ENERGY_WEIGHT: f64 = 0.15;

/// Default relative tempo tolerance for direct and harmonic matches
pub const HARMONIC_TOLERANCE: f64 = 0.08;

/// Penalty for mixing between minor and major sides of the wheel
pub const MODE_PENALTY: f64 = 0.2;

/// Energy difference at which the energy distance saturates
pub const ENERGY_SPAN: f64 = 0.1;

/// Default threshold for [`compatible_keys`]
pub const DEFAULT_COMPATIBLE_KEY_DISTANCE: f64 = 0.3;

/// Tempo ratios considered mixable besides 1:1
const HARMONIC_RATIOS: [f64; 6] = [2.0, 1.5, 4.0 / 3.0, 3.0 / 4.0, 2.0 / 3.0, 0.5];

// ═══════════════════════════════════════════════════════════════════════════
// Model
// ═══════════════════════════════════════════════════════════════════════════

/// Compatibility model with a configurable tempo tolerance
///
/// The free functions in this module use [`CompatibilityModel::default`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompatibilityModel {
    /// Relative tolerance used by [`CompatibilityModel::bpm_distance`]
    pub harmonic_tolerance: f64,
}

impl Default for CompatibilityModel {
    fn default() -> Self {
        Self {
            harmonic_tolerance: HARMONIC_TOLERANCE,
        }
    }
}

impl CompatibilityModel {
    /// Create a model with a custom tempo tolerance
    ///
    /// Non-positive or non-finite tolerances fall back to the default.
    pub fn with_tolerance(harmonic_tolerance: f64) -> Self {
        if harmonic_tolerance.is_finite() && harmonic_tolerance > 0.0 {
            Self { harmonic_tolerance }
        } else {
            log::warn!(
                "Invalid harmonic tolerance {}, using {}",
                harmonic_tolerance,
                HARMONIC_TOLERANCE
            );
            Self::default()
        }
    }

    /// Tempo distance using this model's tolerance
    pub fn bpm_distance(&self, b1: f64, b2: f64) -> f64 {
        bpm_distance_with_tolerance(b1, b2, self.harmonic_tolerance)
    }

    /// Weighted transition cost between two tracks
    pub fn composite_distance(&self, t1: &TrackRecord, t2: &TrackRecord) -> f64 {
        KEY_WEIGHT * key_distance(&t1.key, &t2.key)
            + BPM_WEIGHT * self.bpm_distance(t1.bpm, t2.bpm)
            + ENERGY_WEIGHT * energy_distance(t1.energy, t2.energy)
    }

    /// How well two tracks blend, in `[0, 1]` (1 = perfect)
    pub fn crossfade_compatibility(&self, t1: &TrackRecord, t2: &TrackRecord) -> f64 {
        let score = KEY_WEIGHT * (1.0 - key_distance(&t1.key, &t2.key))
            + BPM_WEIGHT * (1.0 - self.bpm_distance(t1.bpm, t2.bpm))
            + ENERGY_WEIGHT * (1.0 - energy_distance(t1.energy, t2.energy));
        score.clamp(0.0, 1.0)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Distances
// ═══════════════════════════════════════════════════════════════════════════

/// Harmonic distance between two key codes
///
/// Identical codes (ignoring case and surrounding whitespace) are 0. Codes that
/// do not parse are 1.0. Otherwise the shortest circle-of-fifths distance over
/// 6, plus [`MODE_PENALTY`] across modes, capped at 1.0.
pub fn key_distance(k1: &str, k2: &str) -> f64 {
    let (k1, k2) = (k1.trim(), k2.trim());
    if k1.eq_ignore_ascii_case(k2) {
        return 0.0;
    }

    let (Some(a), Some(b)) = (CamelotKey::parse(k1), CamelotKey::parse(k2)) else {
        return 1.0;
    };
    camelot_distance(&a, &b)
}

/// Harmonic distance between two parsed keys
pub fn camelot_distance(a: &CamelotKey, b: &CamelotKey) -> f64 {
    if a == b {
        return 0.0;
    }
    let steps = a.circle_steps(b) as f64 / (WHEEL_SIZE / 2) as f64;
    let penalty = if a.mode() != b.mode() {
        MODE_PENALTY
    } else {
        0.0
    };
    (steps + penalty).min(1.0)
}

/// Tempo distance with the default tolerance
pub fn bpm_distance(b1: f64, b2: f64) -> f64 {
    bpm_distance_with_tolerance(b1, b2, HARMONIC_TOLERANCE)
}

/// Tempo distance between two BPM values
///
/// Zero, negative or non-finite tempos are unmixable (1.0). Within `tolerance`
/// of 1:1 the distance grows linearly; otherwise the best match against the
/// harmonic ratios wins, and no match is 1.0.
pub fn bpm_distance_with_tolerance(b1: f64, b2: f64, tolerance: f64) -> f64 {
    if !(b1.is_finite() && b2.is_finite()) || b1 <= 0.0 || b2 <= 0.0 {
        return 1.0;
    }
    if b1 == b2 {
        return 0.0;
    }

    let direct = b1.max(b2) / b1.min(b2) - 1.0;
    if direct <= tolerance {
        return direct / tolerance;
    }

    let actual = b1 / b2;
    HARMONIC_RATIOS
        .iter()
        .map(|&target| (actual - target).abs() / target)
        .filter(|&error| error <= tolerance)
        .map(|error| error / tolerance)
        .fold(1.0, f64::min)
}

/// Energy distance, saturating at a difference of [`ENERGY_SPAN`]
pub fn energy_distance(e1: f64, e2: f64) -> f64 {
    let diff = (e1 - e2).abs();
    if diff.is_nan() {
        return 1.0;
    }
    (diff / ENERGY_SPAN).min(1.0)
}

/// Weighted transition cost with the default model
pub fn composite_distance(t1: &TrackRecord, t2: &TrackRecord) -> f64 {
    CompatibilityModel::default().composite_distance(t1, t2)
}

/// Crossfade compatibility with the default model
pub fn crossfade_compatibility(t1: &TrackRecord, t2: &TrackRecord) -> f64 {
    CompatibilityModel::default().crossfade_compatibility(t1, t2)
}

// ═══════════════════════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════════════════════

/// All wheel codes within `max_distance` of `key`, in wheel order
///
/// An unparseable key matches nothing.
pub fn compatible_keys(key: &str, max_distance: f64) -> Vec<CamelotKey> {
    let Some(origin) = CamelotKey::parse(key) else {
        return Vec::new();
    };
    CamelotKey::all()
        .filter(|other| camelot_distance(&origin, other) <= max_distance)
        .collect()
}

/// Playback-rate factor to match `b2` to `b1`
///
/// Returns 1.0 when `b2` is not a usable tempo.
pub fn tempo_adjustment_factor(b1: f64, b2: f64) -> f64 {
    if b2 == 0.0 || !b2.is_finite() || !b1.is_finite() {
        1.0
    } else {
        b1 / b2
    }
}
