//! Parameter metadata for classification thresholds
//!
//! This module describes the tunable knobs of a [`ClassificationConfig`], enabling:
//! - Threshold sliders in a front end (name, bounds, step, description)
//! - Grid sweeps over screening sensitivity
//! - Building a config from loosely typed name/value pairs
//!
//! # Example
//!
//! ```rust
//! use dojiscan::classifier::ClassificationConfig;
//! use dojiscan::params::Parameterized;
//!
//! for param in ClassificationConfig::param_meta() {
//!     println!("{}: {:?} (default: {})", param.name, param.param_type, param.default);
//! }
//! ```
//!
//! [`ClassificationConfig`]: crate::classifier::ClassificationConfig

use std::collections::HashMap;

use crate::{Ratio, Result, ScreenError};

// ============================================================
// PARAMETER TYPES
// ============================================================

/// Type of parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
  /// Fraction in 0.0..=1.0
  Ratio,
  /// Positive multiplier, may exceed 1.0 (e.g. shadow dominance)
  Factor,
}

/// Metadata for a single tunable parameter
#[derive(Debug, Clone)]
pub struct ParamMeta {
  /// Parameter name (e.g., "body_threshold")
  pub name: &'static str,
  /// Parameter type (Ratio or Factor)
  pub param_type: ParamType,
  /// Default value
  pub default: f64,
  /// Slider/grid bounds: (min, max, step)
  pub range: (f64, f64, f64),
  /// Human-readable description
  pub description: &'static str,
}

impl ParamMeta {
  /// Create a new ParamMeta for a Ratio parameter
  pub const fn ratio(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Ratio, default, range, description }
  }

  /// Create a new ParamMeta for a Factor parameter
  pub const fn factor(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Factor, default, range, description }
  }

  /// Generate all values for grid search
  ///
  /// Empty when the step is not a positive finite number.
  #[allow(clippy::neg_cmp_op_on_partial_ord)]
  pub fn generate_grid(&self) -> Vec<f64> {
    let (min, max, step) = self.range;
    let mut values = Vec::new();
    if !(step > 0.0) || !step.is_finite() || !min.is_finite() || !max.is_finite() {
      return values;
    }
    let mut i = 0u32;
    loop {
      // Multiply rather than accumulate so float drift cannot skip the last step
      let v = min + step * f64::from(i);
      if v > max + f64::EPSILON {
        break;
      }
      values.push(v);
      i += 1;
    }
    values
  }

  /// Validate a value for this parameter
  pub fn validate(&self, value: f64) -> Result<()> {
    if !value.is_finite() {
      return Err(ScreenError::InvalidValue("Parameter must be finite"));
    }
    let (min, max, _) = self.range;
    if value < min || value > max {
      return Err(ScreenError::OutOfRange { field: self.name, value, min, max });
    }
    match self.param_type {
      ParamType::Ratio => Ratio::new(value).map(|_| ()),
      ParamType::Factor => {
        if value <= 0.0 {
          return Err(ScreenError::InvalidValue("Factor must be > 0"));
        }
        Ok(())
      },
    }
  }
}

// ============================================================
// PARAMETERIZED TRAIT
// ============================================================

/// Trait for configs that can be described and rebuilt from name/value pairs
pub trait Parameterized: Sized {
  /// Returns metadata for all configurable parameters
  fn param_meta() -> &'static [ParamMeta];

  /// Creates a value from a HashMap of parameters
  fn with_params(params: &HashMap<&str, f64>) -> Result<Self>;
}

// ============================================================
// PARAMETER VALUE HELPERS
// ============================================================

/// Helper to get a Ratio from params with default fallback
pub fn get_ratio(params: &HashMap<&str, f64>, key: &str, default: f64) -> Result<Ratio> {
  let value = params.get(key).copied().unwrap_or(default);
  Ratio::new(value)
}

// ============================================================
// TESTS
// ============================================================
