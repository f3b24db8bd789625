//! Batch screening driver
//!
//! Walks a ticker list in input order: fetch daily bars, select the target
//! session, classify it, look up earnings, and collect the matches. Every
//! per-symbol failure is contained at the symbol boundary; the batch always
//! completes (unless the observer asks it to stop).
//!
//! For callers that already hold the data, [`screen_snapshots`] classifies a
//! snapshot of many symbols in parallel and returns results in input order.

use std::ops::ControlFlow;

use chrono::NaiveDate;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::classifier::{classify, ClassificationConfig, NoMatchReason, ShapeRatios, Verdict};
use crate::earnings::{first_date, matches_target_date, EarningsDate};
use crate::report::ChartLink;
use crate::selector::{select_target_bar, ScanMode, Series};
use crate::{Bar, PatternLabel, Result, ScreenError};

// ============================================================
// PROVIDER
// ============================================================

/// Failure reported by a market-data provider for one symbol
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    #[error("Provider timed out")]
    Timeout,

    #[error("Unexpected provider response: {0}")]
    UnexpectedResponse(String),
}

/// Source of daily bars and earnings calendars.
///
/// Calls may block; each one concerns a single symbol and may fail
/// independently of the others.
pub trait MarketDataProvider {
    /// Daily bars covering roughly the last `lookback_sessions` sessions.
    /// Order and duplicates are tolerated; the screener normalizes them.
    fn daily_bars(
        &self,
        symbol: &str,
        lookback_sessions: usize,
    ) -> std::result::Result<Vec<Bar>, ProviderError>;

    /// Announced or estimated earnings dates, past or future, any order
    fn earnings_dates(&self, _symbol: &str) -> std::result::Result<Vec<EarningsDate>, ProviderError> {
        Ok(Vec::new())
    }
}

impl<P: MarketDataProvider + ?Sized> MarketDataProvider for &P {
    fn daily_bars(
        &self,
        symbol: &str,
        lookback_sessions: usize,
    ) -> std::result::Result<Vec<Bar>, ProviderError> {
        (**self).daily_bars(symbol, lookback_sessions)
    }

    fn earnings_dates(&self, symbol: &str) -> std::result::Result<Vec<EarningsDate>, ProviderError> {
        (**self).earnings_dates(symbol)
    }
}

// ============================================================
// CONFIG
// ============================================================

/// Earnings cross-referencing
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EarningsConfig {
    /// Fetch earnings calendars for matching symbols
    pub enabled: bool,
    /// Keep only matches with an announcement on the target date
    pub require_match: bool,
}

impl Default for EarningsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            require_match: false,
        }
    }
}

/// Settings for one screening run
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScreenerConfig {
    pub mode: ScanMode,
    /// Sessions requested from the provider per symbol
    pub lookback_sessions: usize,
    /// Trailing bars kept with each result for charting
    pub context_bars: usize,
    pub classification: ClassificationConfig,
    pub earnings: EarningsConfig,
    pub chart: ChartLink,
    /// Decimal places used when shaping rows for display
    pub display_decimals: u32,
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            mode: ScanMode::default(),
            lookback_sessions: 10,
            context_bars: 5,
            classification: ClassificationConfig::default(),
            earnings: EarningsConfig::default(),
            chart: ChartLink::default(),
            display_decimals: 2,
        }
    }
}

impl ScreenerConfig {
    /// Last available candle, body up to half the range, single generic label
    pub fn pseudo_doji() -> Self {
        Self {
            mode: ScanMode::MostRecentAvailable,
            classification: ClassificationConfig::pseudo_doji(),
            ..Self::default()
        }
    }

    /// Parse and validate a TOML document; missing keys take their defaults
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(s).map_err(|e| ScreenError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.lookback_sessions < self.mode.min_bars() {
            return Err(ScreenError::InvalidConfig(format!(
                "lookback_sessions = {} but {:?} needs at least {}",
                self.lookback_sessions,
                self.mode,
                self.mode.min_bars()
            )));
        }
        if self.display_decimals > 8 {
            return Err(ScreenError::InvalidConfig(format!(
                "display_decimals = {} exceeds 8",
                self.display_decimals
            )));
        }
        self.chart.validate()
    }
}

// ============================================================
// RESULTS
// ============================================================

/// A matched symbol
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ClassificationResult {
    pub ticker: String,
    pub analyzed_date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub ratios: ShapeRatios,
    pub label: PatternLabel,
    pub earnings_date: Option<NaiveDate>,
    pub earnings_matches_target: bool,
    /// Trailing bars of the series, oldest first, for charting
    pub context: Vec<Bar>,
}

/// What happened to one symbol
#[derive(Debug, Clone)]
pub enum SymbolOutcome {
    Matched(PatternLabel),
    NoMatch(NoMatchReason),
    /// Matched, but dropped by the earnings filter
    FilteredOut,
    /// Fetch, selection or validation failed
    Skipped(ScreenError),
}

/// Why a symbol produced no result
#[derive(Debug, Clone)]
enum Rejection {
    NoMatch(NoMatchReason),
    FilteredOut,
    Skipped(ScreenError),
}

impl From<Rejection> for SymbolOutcome {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::NoMatch(reason) => Self::NoMatch(reason),
            Rejection::FilteredOut => Self::FilteredOut,
            Rejection::Skipped(err) => Self::Skipped(err),
        }
    }
}

type Evaluation = std::result::Result<ClassificationResult, Rejection>;

/// Receives progress after every symbol
pub trait ScanObserver {
    /// `position` is 1-based. Return `ControlFlow::Break(())` to stop issuing
    /// further per-symbol work.
    fn on_symbol(
        &mut self,
        position: usize,
        total: usize,
        ticker: &str,
        outcome: &SymbolOutcome,
    ) -> ControlFlow<()>;
}

impl ScanObserver for () {
    fn on_symbol(&mut self, _: usize, _: usize, _: &str, _: &SymbolOutcome) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }
}

/// Outcome of a whole batch
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct ScanReport {
    /// Matches in input order
    pub results: Vec<ClassificationResult>,
    pub scanned: usize,
    pub no_match: usize,
    pub filtered_out: usize,
    pub skipped: usize,
    /// The observer stopped the batch before the end of the list
    pub stopped_early: bool,
}

impl ScanReport {
    fn record(&mut self, evaluation: Evaluation) {
        self.scanned += 1;
        match evaluation {
            Ok(result) => self.results.push(result),
            Err(Rejection::NoMatch(_)) => self.no_match += 1,
            Err(Rejection::FilteredOut) => self.filtered_out += 1,
            Err(Rejection::Skipped(_)) => self.skipped += 1,
        }
    }

    #[inline]
    pub fn matched(&self) -> usize {
        self.results.len()
    }
}

// ============================================================
// SCREENER
// ============================================================

/// Sequential screening driver
#[derive(Debug, Clone, Default)]
pub struct Screener {
    config: ScreenerConfig,
}

impl Screener {
    pub fn new(config: ScreenerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    #[inline]
    pub fn config(&self) -> &ScreenerConfig {
        &self.config
    }

    /// Screen `tickers` one at a time, in order.
    ///
    /// `reference_date` is "today" for session selection and earnings
    /// matching.
    pub fn screen<P, O, S>(
        &self,
        provider: &P,
        tickers: &[S],
        reference_date: NaiveDate,
        observer: &mut O,
    ) -> ScanReport
    where
        P: MarketDataProvider + ?Sized,
        O: ScanObserver + ?Sized,
        S: AsRef<str>,
    {
        let total = tickers.len();
        let mut report = ScanReport::default();
        info!(total, %reference_date, mode = ?self.config.mode, "screen started");

        for (i, ticker) in tickers.iter().enumerate() {
            let ticker = ticker.as_ref();
            let evaluation = self.screen_symbol(provider, ticker, reference_date);
            let outcome = outcome_of(&evaluation);
            report.record(evaluation);

            if observer.on_symbol(i + 1, total, ticker, &outcome).is_break() {
                report.stopped_early = i + 1 < total;
                break;
            }
        }

        info!(
            scanned = report.scanned,
            matched = report.matched(),
            skipped = report.skipped,
            stopped_early = report.stopped_early,
            "screen finished"
        );
        report
    }

    fn screen_symbol<P: MarketDataProvider + ?Sized>(
        &self,
        provider: &P,
        ticker: &str,
        reference_date: NaiveDate,
    ) -> Evaluation {
        let bars = provider
            .daily_bars(ticker, self.config.lookback_sessions)
            .map_err(|e| {
                warn!(ticker, error = %e, "bar fetch failed; skipping symbol");
                Rejection::Skipped(e.into())
            })?;

        self.evaluate(ticker, bars, reference_date, || {
            provider.earnings_dates(ticker).unwrap_or_else(|e| {
                warn!(ticker, error = %e, "earnings lookup failed; treating as none");
                Vec::new()
            })
        })
    }

    /// Select, classify and enrich one symbol's bars.
    ///
    /// `earnings` is only called for bars that match.
    fn evaluate<F>(
        &self,
        ticker: &str,
        bars: Vec<Bar>,
        reference_date: NaiveDate,
        earnings: F,
    ) -> Evaluation
    where
        F: FnOnce() -> Vec<EarningsDate>,
    {
        let series = Series::new(bars);
        let bar = *select_target_bar(&series, reference_date, self.config.mode).map_err(|e| {
            debug!(ticker, error = %e, "no target bar");
            Rejection::Skipped(e.into())
        })?;

        bar.validate().map_err(|e| {
            warn!(ticker, error = %e, "malformed bar; skipping symbol");
            Rejection::Skipped(e)
        })?;

        let classification = classify(&bar, &self.config.classification);
        let label = match classification.verdict {
            Verdict::Match(label) => label,
            Verdict::NoMatch(reason) => {
                debug!(ticker, date = %bar.date, ?reason, body_ratio = classification.ratios.body, "no match");
                return Err(Rejection::NoMatch(reason));
            }
        };

        let (earnings_date, earnings_matches_target) = if self.config.earnings.enabled {
            let dates = earnings();
            let target = self.config.mode.earnings_target(reference_date);
            (first_date(&dates), matches_target_date(&dates, target))
        } else {
            (None, false)
        };

        if self.config.earnings.require_match && !earnings_matches_target {
            debug!(ticker, %label, "match dropped by earnings filter");
            return Err(Rejection::FilteredOut);
        }

        debug!(ticker, date = %bar.date, %label, "matched");
        Ok(ClassificationResult {
            ticker: ticker.to_owned(),
            analyzed_date: bar.date,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            ratios: classification.ratios,
            label,
            earnings_date,
            earnings_matches_target,
            context: series.tail(self.config.context_bars).to_vec(),
        })
    }
}

fn outcome_of(evaluation: &Evaluation) -> SymbolOutcome {
    match evaluation {
        Ok(result) => SymbolOutcome::Matched(result.label),
        Err(rejection) => rejection.clone().into(),
    }
}

// ============================================================
// PARALLEL SNAPSHOT SCREENING
// ============================================================

/// Pre-fetched data for one symbol
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SymbolSnapshot {
    pub symbol: String,
    pub bars: Vec<Bar>,
    #[serde(default)]
    pub earnings: Vec<EarningsDate>,
}

/// Screen a snapshot in parallel; results keep the snapshot order
pub fn screen_snapshots(
    screener: &Screener,
    snapshots: &[SymbolSnapshot],
    reference_date: NaiveDate,
) -> ScanReport {
    let evaluations: Vec<_> = snapshots
        .par_iter()
        .map(|snapshot| {
            screener.evaluate(&snapshot.symbol, snapshot.bars.clone(), reference_date, || {
                snapshot.earnings.clone()
            })
        })
        .collect();

    let mut report = ScanReport::default();
    for evaluation in evaluations {
        report.record(evaluation);
    }
    info!(scanned = report.scanned, matched = report.matched(), "snapshot screen finished");
    report
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    /// In-memory provider keyed by symbol
    #[derive(Default)]
    struct StaticProvider {
        bars: HashMap<&'static str, Vec<Bar>>,
        earnings: HashMap<&'static str, Vec<EarningsDate>>,
    }

    impl MarketDataProvider for StaticProvider {
        fn daily_bars(
            &self,
            symbol: &str,
            _lookback_sessions: usize,
        ) -> std::result::Result<Vec<Bar>, ProviderError> {
            self.bars
                .get(symbol)
                .cloned()
                .ok_or_else(|| ProviderError::UnknownSymbol(symbol.to_owned()))
        }

        fn earnings_dates(&self, symbol: &str) -> std::result::Result<Vec<EarningsDate>, ProviderError> {
            self.earnings.get(symbol).cloned().ok_or(ProviderError::Timeout)
        }
    }

    fn doji_then_today() -> Vec<Bar> {
        vec![
            Bar::new(day(8), 10.0, 11.0, 9.8, 10.9),
            Bar::new(day(9), 10.0, 10.5, 9.5, 10.05),
            Bar::new(day(10), 10.0, 11.0, 10.0, 11.0),
        ]
    }

    #[test]
    fn test_screen_skips_unknown_symbol_and_keeps_order() {
        let mut provider = StaticProvider::default();
        provider.bars.insert("ENI.MI", doji_then_today());
        provider.bars.insert("ISP.MI", doji_then_today());
        provider.earnings.insert("ENI.MI", vec![EarningsDate::Day(day(10))]);

        let screener = Screener::new(ScreenerConfig::default()).unwrap();
        let report = screener.screen(&provider, &["ISP.MI", "NOPE", "ENI.MI"], day(10), &mut ());

        assert_eq!(report.scanned, 3);
        assert_eq!(report.skipped, 1);
        let tickers: Vec<_> = report.results.iter().map(|r| r.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["ISP.MI", "ENI.MI"]);

        // Earnings timeout is soft
        assert_eq!(report.results[0].earnings_date, None);
        assert!(!report.results[0].earnings_matches_target);

        let eni = &report.results[1];
        assert_eq!(eni.analyzed_date, day(9));
        assert_eq!(eni.label, PatternLabel::Doji);
        assert_eq!(eni.earnings_date, Some(day(10)));
        assert!(eni.earnings_matches_target);
        assert_eq!(eni.context.len(), 3);
    }

    #[test]
    fn test_require_match_filters() {
        let mut provider = StaticProvider::default();
        provider.bars.insert("A", doji_then_today());
        provider.earnings.insert("A", vec![EarningsDate::Day(day(20))]);

        let config = ScreenerConfig {
            earnings: EarningsConfig {
                enabled: true,
                require_match: true,
            },
            ..ScreenerConfig::default()
        };
        let report = Screener::new(config).unwrap().screen(&provider, &["A"], day(10), &mut ());
        assert!(report.results.is_empty());
        assert_eq!(report.filtered_out, 1);
    }

    #[test]
    fn test_malformed_target_bar_is_skipped() {
        let mut provider = StaticProvider::default();
        provider.bars.insert(
            "BAD",
            vec![Bar::new(day(8), 10.0, 10.5, 9.5, 10.0), Bar::new(day(9), 10.0, 9.0, 9.5, 10.0)],
        );
        let report = Screener::default().screen(&provider, &["BAD"], day(10), &mut ());
        assert_eq!(report.skipped, 1);
        assert!(report.results.is_empty());
    }

    struct StopAfter(usize, Vec<String>);

    impl ScanObserver for StopAfter {
        fn on_symbol(
            &mut self,
            position: usize,
            _total: usize,
            ticker: &str,
            _outcome: &SymbolOutcome,
        ) -> ControlFlow<()> {
            self.1.push(ticker.to_owned());
            if position >= self.0 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        }
    }

    #[test]
    fn test_observer_can_stop_batch() {
        let mut provider = StaticProvider::default();
        for t in ["A", "B", "C"] {
            provider.bars.insert(t, doji_then_today());
        }
        let mut observer = StopAfter(2, Vec::new());
        let report = Screener::default().screen(&provider, &["A", "B", "C"], day(10), &mut observer);
        assert_eq!(observer.1, vec!["A", "B"]);
        assert_eq!(report.scanned, 2);
        assert!(report.stopped_early);
    }

    #[derive(Default)]
    struct Tally(Vec<SymbolOutcome>);

    impl ScanObserver for Tally {
        fn on_symbol(
            &mut self,
            _position: usize,
            _total: usize,
            _ticker: &str,
            outcome: &SymbolOutcome,
        ) -> ControlFlow<()> {
            self.0.push(outcome.clone());
            ControlFlow::Continue(())
        }
    }

    #[test]
    fn test_report_counters_agree_with_observed_outcomes() {
        let mut provider = StaticProvider::default();
        provider.bars.insert("HIT", doji_then_today());
        provider.bars.insert("LATE", doji_then_today());
        provider.bars.insert(
            "WIDE",
            vec![Bar::new(day(8), 10.0, 10.5, 9.5, 10.0), Bar::new(day(9), 10.0, 11.0, 10.0, 11.0)],
        );
        provider.earnings.insert("HIT", vec![EarningsDate::Day(day(10))]);
        provider.earnings.insert("LATE", vec![EarningsDate::Day(day(20))]);

        let config = ScreenerConfig {
            earnings: EarningsConfig {
                enabled: true,
                require_match: true,
            },
            ..ScreenerConfig::default()
        };
        let mut tally = Tally::default();
        let report = Screener::new(config).unwrap().screen(
            &provider,
            &["HIT", "LATE", "WIDE", "NOPE"],
            day(10),
            &mut tally,
        );

        assert!(matches!(tally.0[0], SymbolOutcome::Matched(PatternLabel::Doji)));
        assert!(matches!(tally.0[1], SymbolOutcome::FilteredOut));
        assert!(matches!(tally.0[2], SymbolOutcome::NoMatch(NoMatchReason::BodyTooLarge)));
        assert!(matches!(tally.0[3], SymbolOutcome::Skipped(ScreenError::Provider(_))));

        assert_eq!(report.scanned, 4);
        assert_eq!(
            (report.matched(), report.filtered_out, report.no_match, report.skipped),
            (1, 1, 1, 1)
        );
    }

    struct BarsOnly(Vec<Bar>);

    impl MarketDataProvider for BarsOnly {
        fn daily_bars(
            &self,
            _symbol: &str,
            _lookback_sessions: usize,
        ) -> std::result::Result<Vec<Bar>, ProviderError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_provider_without_earnings_calendar() {
        let provider = BarsOnly(doji_then_today());
        assert_eq!(provider.earnings_dates("A"), Ok(Vec::new()));
        let report = Screener::default().screen(&provider, &["A"], day(10), &mut ());
        assert_eq!(report.results[0].earnings_date, None);
    }

    #[test]
    fn test_snapshots_preserve_order() {
        let snapshots: Vec<SymbolSnapshot> = (0..50)
            .map(|i| SymbolSnapshot {
                symbol: format!("S{i}"),
                bars: doji_then_today(),
                earnings: vec![EarningsDate::Day(day(10))],
            })
            .collect();
        let report = screen_snapshots(&Screener::default(), &snapshots, day(10));
        assert_eq!(report.matched(), 50);
        for (i, r) in report.results.iter().enumerate() {
            assert_eq!(r.ticker, format!("S{i}"));
            assert!(r.earnings_matches_target);
        }
    }

    #[test]
    fn test_most_recent_mode_targets_next_day_earnings() {
        let snapshot = SymbolSnapshot {
            symbol: "A".into(),
            bars: vec![Bar::new(day(10), 10.0, 10.5, 9.5, 10.2)],
            earnings: vec![EarningsDate::Day(day(11))],
        };
        let screener = Screener::new(ScreenerConfig::pseudo_doji()).unwrap();
        let report = screen_snapshots(&screener, &[snapshot], day(10));
        assert_eq!(report.results[0].analyzed_date, day(10));
        assert!(report.results[0].earnings_matches_target);
    }

    #[test]
    fn test_config_from_toml() {
        let config = ScreenerConfig::from_toml_str(
            r#"
            mode = "most_recent_available"
            lookback_sessions = 30

            [classification]
            body_threshold = 0.2
            dominance_ratio = 1.5
            body_shadow_ratio = 0.5

            [earnings]
            require_match = true
            "#,
        )
        .unwrap();
        assert_eq!(config.mode, ScanMode::MostRecentAvailable);
        assert_eq!(config.lookback_sessions, 30);
        assert_eq!(config.context_bars, 5);
        assert_eq!(config.classification.dominance_ratio(), Some(1.5));
        assert!(config.earnings.enabled);
        assert!(config.earnings.require_match);
    }

    #[test]
    fn test_config_from_toml_rejects_bad_values() {
        assert!(ScreenerConfig::from_toml_str("lookback_sessions = 1").is_err());
        assert!(ScreenerConfig::from_toml_str("[classification]\nbody_threshold = 1.5").is_err());
        assert!(ScreenerConfig::from_toml_str("unknown_key = true").is_err());
    }
}
