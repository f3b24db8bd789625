//! Candle selection
//!
//! Daily feeds sometimes publish a provisional row for the session that is
//! still trading. The selector decides which bar of a [`Series`] is the
//! subject of analysis so the classifier never has to reason about whether
//! the market is open.

use chrono::NaiveDate;

use crate::Bar;

// ============================================================
// SERIES
// ============================================================

/// Daily bars for one symbol, ascending by date, one bar per date
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    bars: Vec<Bar>,
}

impl Series {
    /// Build a series from provider output.
    ///
    /// Bars are sorted by date; when a date appears more than once the bar
    /// supplied last wins.
    pub fn new(mut bars: Vec<Bar>) -> Self {
        // Stable sort keeps provider order within a date, so the later bar is last.
        bars.sort_by_key(|b| b.date);
        let mut deduped: Vec<Bar> = Vec::with_capacity(bars.len());
        for bar in bars {
            match deduped.last_mut() {
                Some(last) if last.date == bar.date => *last = bar,
                _ => deduped.push(bar),
            }
        }
        Self { bars: deduped }
    }

    #[inline]
    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    #[inline]
    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// The last `n` bars (or all of them when shorter)
    pub fn tail(&self, n: usize) -> &[Bar] {
        &self.bars[self.bars.len().saturating_sub(n)..]
    }
}

impl From<Vec<Bar>> for Series {
    fn from(bars: Vec<Bar>) -> Self {
        Self::new(bars)
    }
}

// ============================================================
// SELECTION
// ============================================================

/// Which session a scan targets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    /// The most recently closed session; a bar stamped with the reference
    /// date is treated as still forming and skipped.
    #[default]
    PreviousClosedSession,
    /// The last bar of the series, whatever its date.
    MostRecentAvailable,
}

impl ScanMode {
    /// Minimum number of bars the mode needs
    #[inline]
    pub fn min_bars(self) -> usize {
        match self {
            Self::PreviousClosedSession => 2,
            Self::MostRecentAvailable => 1,
        }
    }

    /// Calendar date earnings announcements are matched against.
    ///
    /// A closed-session scan looks for announcements on the reference date;
    /// a scan of the forming session looks one day ahead.
    pub fn earnings_target(self, reference_date: NaiveDate) -> NaiveDate {
        match self {
            Self::PreviousClosedSession => reference_date,
            Self::MostRecentAvailable => reference_date.succ_opt().unwrap_or(reference_date),
        }
    }
}

/// Errors from [`select_target_bar`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("Empty series")]
    EmptySeries,

    #[error("Insufficient data: need {need} bars, got {got}")]
    InsufficientData { need: usize, got: usize },
}

/// Pick the bar to classify.
///
/// In [`ScanMode::PreviousClosedSession`] a last bar dated `reference_date`
/// is skipped in favour of the one before it; otherwise the last bar is used.
pub fn select_target_bar(
    series: &Series,
    reference_date: NaiveDate,
    mode: ScanMode,
) -> Result<&Bar, SelectionError> {
    let bars = series.bars();
    let Some(last) = bars.last() else {
        return Err(SelectionError::EmptySeries);
    };
    if bars.len() < mode.min_bars() {
        return Err(SelectionError::InsufficientData {
            need: mode.min_bars(),
            got: bars.len(),
        });
    }

    match mode {
        ScanMode::MostRecentAvailable => Ok(last),
        ScanMode::PreviousClosedSession if last.date == reference_date => {
            Ok(&bars[bars.len() - 2])
        }
        ScanMode::PreviousClosedSession => Ok(last),
    }
}

// ============================================================
// TESTS
// ============================================================
