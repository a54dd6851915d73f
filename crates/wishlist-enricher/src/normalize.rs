//! Amount and currency normalization for scraped price text.
//!
//! Storefronts print prices in both `1.234,56` and `1,234.56` conventions and
//! wrap them in currency symbols, codes, and whitespace. Rather than carry
//! per-locale rules, the last separator in the string is taken as the decimal
//! point.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

static NON_AMOUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9.,]").expect("valid amount regex"));

/// Currency codes paired with the symbol that implies them, in match priority.
const CURRENCY_MARKERS: [(&str, char); 3] = [("EUR", '€'), ("USD", '$'), ("GBP", '£')];

/// Parses loose price text into an amount.
///
/// Everything except digits, `,` and `.` is discarded. When both separators
/// appear, whichever occurs last is the decimal separator and the other is
/// dropped as a thousands separator. A lone separator kind is always treated
/// as decimal.
///
/// Returns `None` for empty input or text that does not reduce to a finite
/// number.
#[must_use]
pub fn normalize_amount(raw: &str) -> Option<f64> {
    let cleaned = NON_AMOUNT_RE.replace_all(raw, "");
    if cleaned.is_empty() {
        return None;
    }

    let canonical = match (cleaned.rfind(','), cleaned.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (Some(_), None) => cleaned.replace(',', "."),
        _ => cleaned.into_owned(),
    };

    let value = canonical.parse::<f64>().ok()?;
    value.is_finite().then_some(value)
}

/// Normalizes a JSON-LD price value, which may be a number or a string.
///
/// Numbers pass through when finite and non-negative; strings go through
/// [`normalize_amount`]. Anything else yields `None`.
#[must_use]
pub fn normalize_json_amount(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite() && *v >= 0.0),
        Value::String(s) => normalize_amount(s),
        _ => None,
    }
}

/// Guesses a currency code from free text.
///
/// Case-insensitive on the code; the first of EUR, USD, GBP whose code or
/// symbol appears wins.
#[must_use]
pub fn extract_currency_loose(text: &str) -> Option<&'static str> {
    let upper = text.to_uppercase();
    CURRENCY_MARKERS
        .iter()
        .find(|(code, symbol)| upper.contains(code) || text.contains(*symbol))
        .map(|(code, _)| *code)
}

/// Collapses runs of whitespace to a single space and trims the ends.
pub(crate) fn clean_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Returns the cleaned text, or `None` when nothing is left.
pub(crate) fn non_empty(raw: &str) -> Option<String> {
    let cleaned = clean_text(raw);
    (!cleaned.is_empty()).then_some(cleaned)
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
