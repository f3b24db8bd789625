//! Doji classifier
//!
//! Classifies one OHLC bar into the doji family using ratio thresholds:
//!
//! - **Doji**: small body relative to the range, no dominant shadow
//! - **Dragonfly Doji**: small body with a dominant lower shadow
//! - **Gravestone Doji**: small body with a dominant upper shadow
//!
//! Ratios are always reported, even when the bar does not match, so callers
//! can show why a candle was rejected. Nothing is rounded before comparison.

pub mod helpers;

use std::collections::HashMap;

use helpers::{body_within_shadow, dominates, is_small_body};

use crate::params::{get_ratio, ParamMeta, Parameterized};
use crate::{Ohlc, OhlcExt, PatternLabel, Ratio, Result, ScreenError};

// ============================================================
// CONFIG
// ============================================================

/// Directional (dragonfly/gravestone) knobs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalThresholds {
    /// How many times larger the dominant shadow must be than the opposite one
    pub dominance_ratio: f64,
    /// Maximum body size as a fraction of the dominant shadow
    pub body_shadow_ratio: Ratio,
}

/// Thresholds for one scan
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "ClassificationConfigDef", into = "ClassificationConfigDef")]
pub struct ClassificationConfig {
    body_threshold: Ratio,
    directional: Option<DirectionalThresholds>,
}

impl ClassificationConfig {
    /// Validate and build a config.
    ///
    /// `dominance_ratio` and `body_shadow_ratio` enable the directional
    /// sub-types and must be given together.
    pub fn new(
        body_threshold: f64,
        dominance_ratio: Option<f64>,
        body_shadow_ratio: Option<f64>,
    ) -> Result<Self> {
        let body_threshold = positive_ratio("body_threshold", body_threshold)?;

        let directional = match (dominance_ratio, body_shadow_ratio) {
            (None, None) => None,
            (Some(dominance_ratio), Some(body_shadow_ratio)) => {
                if !dominance_ratio.is_finite() || dominance_ratio <= 0.0 {
                    return Err(ScreenError::OutOfRange {
                        field: "dominance_ratio",
                        value: dominance_ratio,
                        min: f64::MIN_POSITIVE,
                        max: f64::MAX,
                    });
                }
                Some(DirectionalThresholds {
                    dominance_ratio,
                    body_shadow_ratio: positive_ratio("body_shadow_ratio", body_shadow_ratio)?,
                })
            }
            _ => {
                return Err(ScreenError::InvalidConfig(
                    "dominance_ratio and body_shadow_ratio must be set together".into(),
                ))
            }
        };

        Ok(Self {
            body_threshold,
            directional,
        })
    }

    /// Classic doji: generic label only, body <= 10% of the range
    pub const fn standard() -> Self {
        Self {
            body_threshold: Ratio::new_const(helpers::STANDARD_BODY_THRESHOLD),
            directional: None,
        }
    }

    /// Dragonfly/gravestone screen: body <= 30%, dominance 1.3, body <= 60% of the wick
    pub const fn directional() -> Self {
        Self {
            body_threshold: Ratio::new_const(helpers::DIRECTIONAL_BODY_THRESHOLD),
            directional: Some(DirectionalThresholds {
                dominance_ratio: helpers::DOMINANCE_RATIO,
                body_shadow_ratio: Ratio::new_const(helpers::BODY_SHADOW_RATIO),
            }),
        }
    }

    /// Permissive screen: anything with a body up to half the range
    pub const fn pseudo_doji() -> Self {
        Self {
            body_threshold: Ratio::new_const(helpers::PSEUDO_DOJI_BODY_THRESHOLD),
            directional: None,
        }
    }

    #[inline]
    pub fn body_threshold(&self) -> f64 {
        self.body_threshold.get()
    }

    #[inline]
    pub fn directional_thresholds(&self) -> Option<DirectionalThresholds> {
        self.directional
    }

    #[inline]
    pub fn dominance_ratio(&self) -> Option<f64> {
        self.directional.map(|d| d.dominance_ratio)
    }

    #[inline]
    pub fn body_shadow_ratio(&self) -> Option<f64> {
        self.directional.map(|d| d.body_shadow_ratio.get())
    }
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self::directional()
    }
}

fn positive_ratio(field: &'static str, value: f64) -> Result<Ratio> {
    let ratio = Ratio::new(value).map_err(|_| ScreenError::OutOfRange {
        field,
        value,
        min: 0.0,
        max: 1.0,
    })?;
    if ratio.get() == 0.0 {
        return Err(ScreenError::OutOfRange {
            field,
            value,
            min: f64::MIN_POSITIVE,
            max: 1.0,
        });
    }
    Ok(ratio)
}

/// Wire shape of [`ClassificationConfig`]; validated on conversion
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct ClassificationConfigDef {
    body_threshold: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dominance_ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    body_shadow_ratio: Option<f64>,
}

impl TryFrom<ClassificationConfigDef> for ClassificationConfig {
    type Error = ScreenError;

    fn try_from(def: ClassificationConfigDef) -> Result<Self> {
        Self::new(def.body_threshold, def.dominance_ratio, def.body_shadow_ratio)
    }
}

impl From<ClassificationConfig> for ClassificationConfigDef {
    fn from(config: ClassificationConfig) -> Self {
        Self {
            body_threshold: config.body_threshold(),
            dominance_ratio: config.dominance_ratio(),
            body_shadow_ratio: config.body_shadow_ratio(),
        }
    }
}

impl Parameterized for ClassificationConfig {
    fn param_meta() -> &'static [ParamMeta] {
        const PARAMS: &[ParamMeta] = &[
            ParamMeta::ratio(
                "body_threshold",
                helpers::DIRECTIONAL_BODY_THRESHOLD,
                (0.05, 0.5, 0.05),
                "Maximum body/range ratio for any doji",
            ),
            ParamMeta::factor(
                "dominance_ratio",
                helpers::DOMINANCE_RATIO,
                (1.0, 3.0, 0.1),
                "Dominant shadow must exceed the opposite shadow by this factor",
            ),
            ParamMeta::ratio(
                "body_shadow_ratio",
                helpers::BODY_SHADOW_RATIO,
                (0.1, 1.0, 0.1),
                "Maximum body size as a fraction of the dominant shadow",
            ),
        ];
        PARAMS
    }

    /// Missing `body_threshold` falls back to its default; the directional
    /// sub-types are enabled only when both of their knobs are present.
    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        let body_threshold =
            get_ratio(params, "body_threshold", helpers::DIRECTIONAL_BODY_THRESHOLD)?;
        Self::new(
            body_threshold.get(),
            params.get("dominance_ratio").copied(),
            params.get("body_shadow_ratio").copied(),
        )
    }
}

// ============================================================
// CLASSIFICATION
// ============================================================

/// Body and shadows as fractions of the full range.
///
/// All zero when the range is degenerate.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize)]
pub struct ShapeRatios {
    pub body: f64,
    pub upper_shadow: f64,
    pub lower_shadow: f64,
}

impl ShapeRatios {
    pub const ZERO: Self = Self {
        body: 0.0,
        upper_shadow: 0.0,
        lower_shadow: 0.0,
    };
}

/// Why a bar was not reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum NoMatchReason {
    /// High equals low (or the bar is malformed): no shape information
    DegenerateRange,
    /// Body exceeds the configured fraction of the range
    BodyTooLarge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum Verdict {
    Match(PatternLabel),
    NoMatch(NoMatchReason),
}

/// Outcome of [`classify`]: verdict plus the ratios behind it
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Classification {
    pub verdict: Verdict,
    pub ratios: ShapeRatios,
}

impl Classification {
    #[inline]
    pub fn label(&self) -> Option<PatternLabel> {
        match self.verdict {
            Verdict::Match(label) => Some(label),
            Verdict::NoMatch(_) => None,
        }
    }

    #[inline]
    pub fn is_match(&self) -> bool {
        matches!(self.verdict, Verdict::Match(_))
    }
}

/// Classify a single bar
#[allow(clippy::neg_cmp_op_on_partial_ord)]
pub fn classify<T: Ohlc + ?Sized>(bar: &T, config: &ClassificationConfig) -> Classification {
    let body = bar.body();
    let range = bar.range();
    let upper = bar.upper_shadow();
    let lower = bar.lower_shadow();

    // Also catches NaN and the negative range of a malformed bar
    if !(range > 0.0) {
        return Classification {
            verdict: Verdict::NoMatch(NoMatchReason::DegenerateRange),
            ratios: ShapeRatios::ZERO,
        };
    }

    let ratios = ShapeRatios {
        body: body / range,
        upper_shadow: upper / range,
        lower_shadow: lower / range,
    };

    if !is_small_body(ratios.body, config.body_threshold()) {
        return Classification {
            verdict: Verdict::NoMatch(NoMatchReason::BodyTooLarge),
            ratios,
        };
    }

    let label = match config.directional {
        Some(d)
            if dominates(lower, upper, d.dominance_ratio)
                && body_within_shadow(body, lower, d.body_shadow_ratio.get()) =>
        {
            PatternLabel::DragonflyDoji
        }
        Some(d)
            if dominates(upper, lower, d.dominance_ratio)
                && body_within_shadow(body, upper, d.body_shadow_ratio.get()) =>
        {
            PatternLabel::GravestoneDoji
        }
        _ => PatternLabel::Doji,
    };

    Classification {
        verdict: Verdict::Match(label),
        ratios,
    }
}

// ============================================================
// TESTS
// ============================================================
