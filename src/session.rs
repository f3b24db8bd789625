//! Session-scoped cache of the last scan, so a front end can chart a picked
//! symbol without scanning again. Owned by the caller; replaced wholesale.

use chrono::NaiveDate;

use crate::screener::{ClassificationResult, ScanReport};

#[derive(Debug, Clone, Default)]
pub struct ScanSession {
    last: Option<LastScan>,
}

#[derive(Debug, Clone)]
struct LastScan {
    reference_date: NaiveDate,
    report: ScanReport,
}

impl ScanSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a finished batch, dropping the previous one
    pub fn replace(&mut self, reference_date: NaiveDate, report: ScanReport) {
        self.last = Some(LastScan {
            reference_date,
            report,
        });
    }

    pub fn clear(&mut self) {
        self.last = None;
    }

    pub fn is_empty(&self) -> bool {
        self.results().is_empty()
    }

    pub fn reference_date(&self) -> Option<NaiveDate> {
        self.last.as_ref().map(|l| l.reference_date)
    }

    pub fn report(&self) -> Option<&ScanReport> {
        self.last.as_ref().map(|l| &l.report)
    }

    pub fn results(&self) -> &[ClassificationResult] {
        match &self.last {
            Some(last) => &last.report.results,
            None => &[],
        }
    }

    /// Tickers of the cached matches, in scan order, for a chart picker
    pub fn tickers(&self) -> impl Iterator<Item = &str> + '_ {
        self.results().iter().map(|r| r.ticker.as_str())
    }

    /// Case-insensitive lookup
    pub fn find(&self, ticker: &str) -> Option<&ClassificationResult> {
        let ticker = ticker.trim();
        self.results()
            .iter()
            .find(|r| r.ticker.eq_ignore_ascii_case(ticker))
    }
}
