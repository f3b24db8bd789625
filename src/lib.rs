//! # dojiscan - Doji candlestick screener
//!
//! Picks the most recently closed daily candle of each symbol, classifies its
//! shape against the doji family (generic, dragonfly, gravestone) and
//! cross-references upcoming earnings dates.
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::NaiveDate;
//! use dojiscan::prelude::*;
//!
//! let day = |d| NaiveDate::from_ymd_opt(2024, 5, d).unwrap();
//! let series = Series::new(vec![
//!     Bar::new(day(2), 10.0, 10.8, 9.7, 10.6),
//!     Bar::new(day(3), 10.0, 10.5, 9.5, 10.05),
//! ]);
//!
//! // The feed has no row for the 6th yet, so the 3rd is the last closed session.
//! let bar = select_target_bar(&series, day(6), ScanMode::PreviousClosedSession).unwrap();
//!
//! let config = ClassificationConfig::new(0.2, None, None).unwrap();
//! let classification = classify(bar, &config);
//! assert_eq!(classification.label(), Some(PatternLabel::Doji));
//! ```

pub mod classifier;
pub mod earnings;
pub mod params;
pub mod report;
pub mod screener;
pub mod selector;
pub mod session;
pub mod tickers;

pub mod prelude {
    pub use crate::{
        // Classifier
        classifier::{
            classify, Classification, ClassificationConfig, DirectionalThresholds, NoMatchReason,
            ShapeRatios, Verdict,
        },
        // Earnings
        earnings::{first_date, matches_target_date, EarningsDate},
        // Parameters
        params::{get_ratio, ParamMeta, ParamType, Parameterized},
        // Presentation
        report::{build_rows, round_to, sort_rows, ChartLink, ResultRow, SortKey, SortOrder},
        // Driver
        screener::{
            screen_snapshots, ClassificationResult, EarningsConfig, MarketDataProvider,
            ProviderError, ScanObserver, ScanReport, Screener, ScreenerConfig, SymbolOutcome,
            SymbolSnapshot,
        },
        // Selection
        selector::{select_target_bar, ScanMode, SelectionError, Series},
        // Session
        session::ScanSession,
        tickers::parse_tickers,
        // Types
        Bar,
        OhlcExt,
        PatternLabel,
        Ratio,
        Result,
        ScreenError,
        Ohlc,
    };
}

use chrono::NaiveDate;

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, ScreenError>;

/// Errors that can occur while configuring or running a screen
#[derive(Debug, Clone, thiserror::Error)]
pub enum ScreenError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid bar on {date}: {reason}")]
    InvalidBar { date: NaiveDate, reason: &'static str },

    #[error(transparent)]
    Selection(#[from] selector::SelectionError),

    #[error(transparent)]
    Provider(#[from] screener::ProviderError),
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Normalized value in range 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Ratio(f64);

impl Ratio {
    /// Create a new Ratio, validating the value is in [0.0, 1.0]
    pub fn new(value: f64) -> Result<Self> {
        if value.is_nan() || value.is_infinite() {
            return Err(ScreenError::InvalidValue("Ratio cannot be NaN or infinite"));
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(ScreenError::OutOfRange {
                field: "Ratio",
                value,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(Self(value))
    }

    /// Create a Ratio from a compile-time constant (library internal use)
    #[doc(hidden)]
    pub const fn new_const(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl serde::Serialize for Ratio {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Ratio {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Ratio::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// OHLC TRAITS
// ============================================================

/// Core OHLC data trait
pub trait Ohlc {
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;
}

impl<T: Ohlc + ?Sized> Ohlc for &T {
    fn open(&self) -> f64 {
        (**self).open()
    }

    fn high(&self) -> f64 {
        (**self).high()
    }

    fn low(&self) -> f64 {
        (**self).low()
    }

    fn close(&self) -> f64 {
        (**self).close()
    }
}

/// Extension trait with computed properties for OHLC data
pub trait OhlcExt: Ohlc {
    #[inline]
    fn body(&self) -> f64 {
        (self.close() - self.open()).abs()
    }

    #[inline]
    fn range(&self) -> f64 {
        self.high() - self.low()
    }

    #[inline]
    fn upper_shadow(&self) -> f64 {
        self.high() - self.open().max(self.close())
    }

    #[inline]
    fn lower_shadow(&self) -> f64 {
        self.open().min(self.close()) - self.low()
    }

    /// Check the price ordering invariant `low <= min(o, c) <= max(o, c) <= high`
    fn check_shape(&self) -> std::result::Result<(), &'static str> {
        let prices = [self.open(), self.high(), self.low(), self.close()];
        if prices.iter().any(|p| p.is_nan()) {
            return Err("NaN in OHLC");
        }
        if prices.iter().any(|p| p.is_infinite()) {
            return Err("Infinite value in OHLC");
        }
        if prices.iter().any(|p| *p < 0.0) {
            return Err("negative price");
        }
        if self.high() < self.low() {
            return Err("high < low");
        }
        if self.open().max(self.close()) > self.high() {
            return Err("open/close above high");
        }
        if self.open().min(self.close()) < self.low() {
            return Err("open/close below low");
        }
        Ok(())
    }
}

impl<T: Ohlc + ?Sized> OhlcExt for T {}

// ============================================================
// BAR
// ============================================================

/// One trading session's price summary
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Bar {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
        }
    }

    /// Validate the bar, tagging errors with its date
    pub fn validate(&self) -> Result<()> {
        self.check_shape().map_err(|reason| ScreenError::InvalidBar {
            date: self.date,
            reason,
        })
    }
}

impl Ohlc for Bar {
    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }
}

// ============================================================
// PATTERN LABELS
// ============================================================

/// Closed set of doji-family labels the classifier can return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum PatternLabel {
    Doji,
    DragonflyDoji,
    GravestoneDoji,
}

impl PatternLabel {
    /// Human-readable name for table display
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Doji => "Doji",
            Self::DragonflyDoji => "Dragonfly Doji",
            Self::GravestoneDoji => "Gravestone Doji",
        }
    }
}

impl std::fmt::Display for PatternLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

// ============================================================
// TESTS
// ============================================================
