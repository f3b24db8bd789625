//! Ticker list parsing

/// Split free text into upper-cased tickers.
///
/// Commas, spaces, tabs, newlines and carriage returns all separate tokens.
/// Empty tokens are dropped; duplicates are kept in input order.
pub fn parse_tickers(text: &str) -> Vec<String> {
    text.split([',', ' ', '\t', '\n', '\r'])
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_uppercase)
        .collect()
}
