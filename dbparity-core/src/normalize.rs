//! Cell value canonicalization.
//!
//! Raw cell text from heterogeneous backends rarely compares equal even
//! when the data does: Oracle pads, Postgres renders `1234.0` where the
//! other side says `1234`, CLOBs drag in control characters and markup.
//! [`ValueNormalizer`] canonicalizes both sides so that semantically equal
//! values compare equal textually.
//!
//! Normalization never fails. Unparseable numerics fall back to a pattern
//! cleanup and are logged at debug; oversized values are truncated and
//! logged, not rejected.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

/// Cell length cap, matching the spreadsheet cell limit downstream
/// exporters are bound by.
const MAX_VALUE_CHARS: usize = 32_767;
/// Length values are cut to when they exceed [`MAX_VALUE_CHARS`], leaving
/// room for the truncation marker.
const TRUNCATED_VALUE_CHARS: usize = 32_760;
/// Appended to truncated values.
const TRUNCATION_MARKER: &str = "...";

/// String spellings of null that compare equal to the empty string.
const NULL_WORDS: [&str; 4] = ["none", "nan", "null", "<na>"];

#[allow(clippy::expect_used)]
static MARKUP_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("static pattern"));
#[allow(clippy::expect_used)]
static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("static pattern"));
#[allow(clippy::expect_used)]
static TRAILING_ZEROS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\.\d*[1-9])0+$").expect("static pattern"));
#[allow(clippy::expect_used)]
static TRAILING_ZERO_DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.0+$").expect("static pattern"));

/// Canonicalizes raw cell values for comparison.
///
/// All patterns are compiled once at construction and held as immutable
/// configuration; `normalize` is a pure function of its inputs.
#[derive(Debug, Clone)]
pub struct ValueNormalizer {
    markup_tag: Regex,
    whitespace_run: Regex,
    trailing_zeros: Regex,
    trailing_zero_decimal: Regex,
}

impl Default for ValueNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl ValueNormalizer {
    /// Creates a normalizer with the standard cleaning pipeline.
    pub fn new() -> Self {
        Self {
            markup_tag: MARKUP_TAG.clone(),
            whitespace_run: WHITESPACE_RUN.clone(),
            trailing_zeros: TRAILING_ZEROS.clone(),
            trailing_zero_decimal: TRAILING_ZERO_DECIMAL.clone(),
        }
    }

    /// Canonicalizes one raw cell value.
    ///
    /// Rules, applied in order: NULL and null-word spellings become the
    /// empty string; markup-looking values lose tag-like substrings;
    /// control characters are dropped; whitespace runs collapse to one
    /// space and the ends are trimmed; oversized values are truncated with
    /// a marker; numeric columns are canonicalized through `f64` so that
    /// `"1234"` and `"1234.0"` agree; non-numeric columns get a residual
    /// trailing-zero-decimal cleanup.
    pub fn normalize(&self, raw: Option<&str>, numeric: bool) -> String {
        let Some(raw) = raw else {
            return String::new();
        };

        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return String::new();
        }
        if NULL_WORDS.iter().any(|w| trimmed.eq_ignore_ascii_case(w)) {
            return String::new();
        }

        let mut value = if trimmed.starts_with('<') && trimmed.contains('>') {
            self.markup_tag.replace_all(trimmed, "").into_owned()
        } else {
            trimmed.to_string()
        };

        if value.chars().any(|c| c.is_control() && !c.is_whitespace()) {
            value.retain(|c| !c.is_control() || c.is_whitespace());
        }

        let mut value = self
            .whitespace_run
            .replace_all(&value, " ")
            .trim()
            .to_string();

        if value.chars().count() > MAX_VALUE_CHARS {
            let original_chars = value.chars().count();
            value = value.chars().take(TRUNCATED_VALUE_CHARS).collect();
            value.push_str(TRUNCATION_MARKER);
            debug!(
                "Truncated oversized value from {} to {} characters",
                original_chars, TRUNCATED_VALUE_CHARS
            );
        }

        if numeric {
            self.canonicalize_numeric(&value)
        } else {
            // Residual cleanup: "42.00" and "42" are the same non-numeric
            // artifact more often than they are distinct data.
            self.trailing_zero_decimal.replace(&value, "").into_owned()
        }
    }

    /// Renders a numeric-column value in canonical decimal form.
    fn canonicalize_numeric(&self, value: &str) -> String {
        match value.parse::<f64>() {
            Ok(parsed) if parsed.is_finite() => {
                if parsed.fract() == 0.0 && parsed.abs() < 9_007_199_254_740_992.0 {
                    // Exactly representable integral value
                    format!("{}", parsed as i64)
                } else {
                    // Shortest round-trip rendering drops insignificant
                    // trailing zeros
                    format!("{}", parsed)
                }
            }
            _ => {
                debug!("Value '{}' not parseable as numeric, using pattern fallback", value);
                let stripped = self.trailing_zeros.replace(value, "$1");
                self.trailing_zero_decimal.replace(&stripped, "").into_owned()
            }
        }
    }
}
