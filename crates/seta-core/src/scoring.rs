//! Impact scoring.
//!
//! Maps an impact position to a decimal score using a piecewise-linear
//! model calibrated against the physical target:
//!
//! | Radius (mm) | Score |
//! |-------------|-------|
//! | `r <= 0.2` | 10.9 |
//! | `0.2 < r <= 2.482` | `10.9 - 0.394 * (r - 0.2)` |
//! | `r > 2.482` | 10.0 |
//!
//! Only the 10-ring is modelled. Every impact outside it scores a flat
//! 10.0; rings 9 and below are not implemented.
//!
//! The result is rounded to one decimal place, half away from zero, as the
//! very last step.

use seta_types::{ScoredShot, StoredShot};

/// Radius of the bullseye tolerance band, in millimeters.
pub const BULLSEYE_RADIUS_MM: f64 = 0.2;

/// Outer edge of the 10-ring, in millimeters.
pub const TEN_RING_RADIUS_MM: f64 = 2.482;

/// Score awarded inside the bullseye band.
pub const MAX_SCORE: f64 = 10.9;

/// Score lost per millimeter between the bullseye band and the 10-ring edge.
/// Equals `0.9 / 2.282` to three places.
pub const SCORE_DECREASE_PER_MM: f64 = 0.394;

/// Flat score for every impact outside the 10-ring.
pub const OUTER_SCORE: f64 = 10.0;

const MM_PER_M: f64 = 1000.0;

/// Score an impact at `(x, y)` meters from the target center.
///
/// Pure and total: non-finite input falls through to [`OUTER_SCORE`].
pub fn score(x: f64, y: f64) -> f64 {
    let radius = (x * MM_PER_M).hypot(y * MM_PER_M);

    let raw = if radius <= BULLSEYE_RADIUS_MM {
        MAX_SCORE
    } else if radius <= TEN_RING_RADIUS_MM {
        SCORE_DECREASE_PER_MM.mul_add(-(radius - BULLSEYE_RADIUS_MM), MAX_SCORE)
    } else {
        OUTER_SCORE
    };

    round_to_tenth(raw)
}

/// Attach the derived score to a stored shot.
pub fn score_shot(shot: StoredShot) -> ScoredShot {
    let score = score(shot.shot_data.x, shot.shot_data.y);
    ScoredShot { shot, score }
}

/// Sum of per-shot scores, rounded to one decimal place.
pub fn total_score<'a>(shots: impl IntoIterator<Item = &'a ScoredShot>) -> f64 {
    round_to_tenth(shots.into_iter().map(|s| s.score).sum())
}

/// Round half away from zero to one decimal place.
pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
