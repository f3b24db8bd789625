//! Presentation shaping
//!
//! Turns [`ClassificationResult`]s into display rows: rounded values, chart
//! deep links and sorting. Rounding happens here and only here, after
//! classification.

use std::cmp::Ordering;

use chrono::NaiveDate;

use crate::screener::ClassificationResult;
use crate::{PatternLabel, Result, ScreenError};

// ============================================================
// ROUNDING
// ============================================================

/// Round half away from zero to `decimals` places. Non-finite values pass through,
/// as does anything asked for `f64::DIGITS` places or more.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    if !value.is_finite() || decimals >= f64::DIGITS {
        return value;
    }
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

// ============================================================
// CHART LINKS
// ============================================================

/// Builds `https://<host>/chart/?symbol=<EXCHANGE>:<ticker>` links
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChartLink {
    pub host: String,
    pub exchange: String,
    /// Cosmetic exchange suffix removed from tickers, e.g. ".MI"
    pub strip_suffix: Option<String>,
}

impl Default for ChartLink {
    fn default() -> Self {
        Self {
            host: "www.tradingview.com".into(),
            exchange: "MIL".into(),
            strip_suffix: Some(".MI".into()),
        }
    }
}

impl ChartLink {
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() || self.host.contains(['/', ' ', '?']) {
            return Err(ScreenError::InvalidConfig(format!("invalid chart host {:?}", self.host)));
        }
        if self.exchange.is_empty() || !self.exchange.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ScreenError::InvalidConfig(format!(
                "invalid chart exchange {:?}",
                self.exchange
            )));
        }
        Ok(())
    }

    /// Ticker as the charting site expects it (suffix removed, case-insensitive)
    pub fn chart_symbol<'a>(&self, ticker: &'a str) -> &'a str {
        let Some(suffix) = self.strip_suffix.as_deref().filter(|s| !s.is_empty()) else {
            return ticker;
        };
        let Some(cut) = ticker.len().checked_sub(suffix.len()) else {
            return ticker;
        };
        match (ticker.get(..cut), ticker.get(cut..)) {
            (Some(head), Some(tail)) if tail.eq_ignore_ascii_case(suffix) => head,
            _ => ticker,
        }
    }

    pub fn url(&self, ticker: &str) -> String {
        format!(
            "https://{}/chart/?symbol={}:{}",
            self.host,
            self.exchange,
            self.chart_symbol(ticker)
        )
    }
}

// ============================================================
// ROWS
// ============================================================

/// One table row, values rounded for display
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ResultRow {
    pub ticker: String,
    pub pattern: &'static str,
    #[serde(skip)]
    pub label: PatternLabel,
    pub analyzed_date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub body_ratio: f64,
    pub upper_shadow_ratio: f64,
    pub lower_shadow_ratio: f64,
    pub earnings_date: Option<NaiveDate>,
    pub earnings_matches_target: bool,
    pub chart_url: String,
}

impl ResultRow {
    pub fn from_result(result: &ClassificationResult, chart: &ChartLink, decimals: u32) -> Self {
        Self {
            ticker: result.ticker.clone(),
            pattern: result.label.display_name(),
            label: result.label,
            analyzed_date: result.analyzed_date,
            open: round_to(result.open, decimals),
            high: round_to(result.high, decimals),
            low: round_to(result.low, decimals),
            close: round_to(result.close, decimals),
            body_ratio: round_to(result.ratios.body, decimals),
            upper_shadow_ratio: round_to(result.ratios.upper_shadow, decimals),
            lower_shadow_ratio: round_to(result.ratios.lower_shadow, decimals),
            earnings_date: result.earnings_date,
            earnings_matches_target: result.earnings_matches_target,
            chart_url: chart.url(&result.ticker),
        }
    }
}

/// Shape a batch of results, keeping their order
pub fn build_rows(results: &[ClassificationResult], chart: &ChartLink, decimals: u32) -> Vec<ResultRow> {
    results
        .iter()
        .map(|r| ResultRow::from_result(r, chart, decimals))
        .collect()
}

// ============================================================
// SORTING
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Ticker,
    AnalyzedDate,
    Pattern,
    BodyRatio,
    UpperShadowRatio,
    LowerShadowRatio,
    EarningsDate,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// Stable sort. Rows without an earnings date go last in either order.
pub fn sort_rows(rows: &mut [ResultRow], key: SortKey, order: SortOrder) {
    rows.sort_by(|a, b| {
        if key == SortKey::EarningsDate {
            match (a.earnings_date, b.earnings_date) {
                (Some(x), Some(y)) => return directed(x.cmp(&y), order),
                (Some(_), None) => return Ordering::Less,
                (None, Some(_)) => return Ordering::Greater,
                (None, None) => return Ordering::Equal,
            }
        }
        let ord = match key {
            SortKey::Ticker => a.ticker.cmp(&b.ticker),
            SortKey::AnalyzedDate => a.analyzed_date.cmp(&b.analyzed_date),
            SortKey::Pattern => a.pattern.cmp(b.pattern),
            SortKey::BodyRatio => a.body_ratio.total_cmp(&b.body_ratio),
            SortKey::UpperShadowRatio => a.upper_shadow_ratio.total_cmp(&b.upper_shadow_ratio),
            SortKey::LowerShadowRatio => a.lower_shadow_ratio.total_cmp(&b.lower_shadow_ratio),
            SortKey::EarningsDate => Ordering::Equal,
        };
        directed(ord, order)
    });
}

#[inline]
fn directed(ord: Ordering, order: SortOrder) -> Ordering {
    match order {
        SortOrder::Ascending => ord,
        SortOrder::Descending => ord.reverse(),
    }
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ShapeRatios;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn result(ticker: &str, body: f64, earnings: Option<NaiveDate>) -> ClassificationResult {
        ClassificationResult {
            ticker: ticker.into(),
            analyzed_date: day(3),
            open: 10.0,
            high: 10.5,
            low: 9.5,
            close: 10.05,
            ratios: ShapeRatios {
                body,
                upper_shadow: (1.0 - body) / 2.0,
                lower_shadow: (1.0 - body) / 2.0,
            },
            label: PatternLabel::Doji,
            earnings_date: earnings,
            earnings_matches_target: false,
            context: Vec::new(),
        }
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(0.04545, 2), 0.05);
        assert_eq!(round_to(0.125, 1), 0.1);
        assert_eq!(round_to(10.0, 2), 10.0);
        assert!(round_to(f64::NAN, 2).is_nan());
    }

    #[test]
    fn test_round_to_huge_precision_is_identity() {
        for decimals in [f64::DIGITS, 40, u32::MAX / 2 + 1, u32::MAX] {
            assert_eq!(round_to(1234.56789, decimals), 1234.56789, "decimals {decimals}");
        }
        assert_eq!(round_to(0.123456, 14), 0.123456);
    }

    #[test]
    fn test_chart_url_strips_suffix() {
        let chart = ChartLink::default();
        assert_eq!(chart.url("ENI.MI"), "https://www.tradingview.com/chart/?symbol=MIL:ENI");
        assert_eq!(chart.url("isp.mi"), "https://www.tradingview.com/chart/?symbol=MIL:isp");
        assert_eq!(chart.url("AAPL"), "https://www.tradingview.com/chart/?symbol=MIL:AAPL");
        assert_eq!(chart.chart_symbol(".MI"), "");
        assert_eq!(chart.chart_symbol("MI"), "MI");
    }

    #[test]
    fn test_chart_without_suffix() {
        let chart = ChartLink {
            host: "charts.example.com".into(),
            exchange: "NASDAQ".into(),
            strip_suffix: None,
        };
        assert_eq!(chart.url("AAPL.MI"), "https://charts.example.com/chart/?symbol=NASDAQ:AAPL.MI");
        assert!(chart.validate().is_ok());
    }

    #[test]
    fn test_chart_validation() {
        let mut chart = ChartLink::default();
        chart.host = "bad/host".into();
        assert!(chart.validate().is_err());
        let mut chart = ChartLink::default();
        chart.exchange = "".into();
        assert!(chart.validate().is_err());
    }

    #[test]
    fn test_row_rounds_after_classification() {
        let row = ResultRow::from_result(&result("ENI.MI", 0.045454, None), &ChartLink::default(), 2);
        assert_eq!(row.body_ratio, 0.05);
        assert_eq!(row.pattern, "Doji");
        assert_eq!(row.chart_url, "https://www.tradingview.com/chart/?symbol=MIL:ENI");
    }

    #[test]
    fn test_row_serializes_display_name() {
        let row = ResultRow::from_result(&result("A", 0.1, Some(day(7))), &ChartLink::default(), 2);
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["pattern"], "Doji");
        assert_eq!(json["earnings_date"], "2024-05-07");
        assert!(json.get("label").is_none());
    }

    #[test]
    fn test_sort_by_body_ratio() {
        let chart = ChartLink::default();
        let mut rows = build_rows(
            &[result("A", 0.3, None), result("B", 0.1, None), result("C", 0.2, None)],
            &chart,
            2,
        );
        sort_rows(&mut rows, SortKey::BodyRatio, SortOrder::Ascending);
        let order: Vec<_> = rows.iter().map(|r| r.ticker.as_str()).collect();
        assert_eq!(order, vec!["B", "C", "A"]);

        sort_rows(&mut rows, SortKey::BodyRatio, SortOrder::Descending);
        let order: Vec<_> = rows.iter().map(|r| r.ticker.as_str()).collect();
        assert_eq!(order, vec!["A", "C", "B"]);
    }

    #[test]
    fn test_missing_earnings_sort_last() {
        let chart = ChartLink::default();
        let mut rows = build_rows(
            &[result("A", 0.1, None), result("B", 0.1, Some(day(9))), result("C", 0.1, Some(day(4)))],
            &chart,
            2,
        );
        sort_rows(&mut rows, SortKey::EarningsDate, SortOrder::Descending);
        let order: Vec<_> = rows.iter().map(|r| r.ticker.as_str()).collect();
        assert_eq!(order, vec!["B", "C", "A"]);

        sort_rows(&mut rows, SortKey::EarningsDate, SortOrder::Ascending);
        let order: Vec<_> = rows.iter().map(|r| r.ticker.as_str()).collect();
        assert_eq!(order, vec!["C", "B", "A"]);
    }
}
