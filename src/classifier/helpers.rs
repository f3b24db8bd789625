//! Threshold defaults and comparison helpers shared by the doji classifier.
//!
//! Every comparison is written so that a NaN operand fails it.

// ============================================================
// DEFAULT THRESHOLDS
// ============================================================

/// Classic doji: body <= 10% of the range
pub const STANDARD_BODY_THRESHOLD: f64 = 0.1;
/// Directional screen: body <= 30% of the range
pub const DIRECTIONAL_BODY_THRESHOLD: f64 = 0.3;
/// Permissive "pseudo doji" screen: body <= 50% of the range
pub const PSEUDO_DOJI_BODY_THRESHOLD: f64 = 0.5;
/// Dominant shadow must exceed the opposite one by this factor
pub const DOMINANCE_RATIO: f64 = 1.3;
/// Body must be at most this fraction of the dominant shadow
pub const BODY_SHADOW_RATIO: f64 = 0.6;

// ============================================================
// COMPARISONS
// ============================================================

/// Body small enough relative to the range to be an indecision candle
#[inline]
pub fn is_small_body(body_ratio: f64, threshold: f64) -> bool {
    body_ratio <= threshold
}

/// `shadow` is more than `dominance` times the `opposite` shadow
#[inline]
pub fn dominates(shadow: f64, opposite: f64, dominance: f64) -> bool {
    shadow > opposite * dominance
}

/// Body is at most `ratio` of the given shadow
#[inline]
pub fn body_within_shadow(body: f64, shadow: f64, ratio: f64) -> bool {
    body <= shadow * ratio
}
