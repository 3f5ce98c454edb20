use regex::Regex;
use std::sync::LazyLock;

use crate::wizard::pointer::Node;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles")
});

static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}$").expect("year pattern compiles"));

static HTTP_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i)https?://[^\s/$.?#][^\s]*$").expect("url pattern compiles")
});

pub fn is_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}

pub fn is_year(value: &str) -> bool {
    YEAR_RE.is_match(value)
}

pub fn is_http_url(value: &str) -> bool {
    HTTP_URL_RE.is_match(value)
}

/// Reads a numeric field: numbers pass through, numeric strings parse, and
/// anything else (missing, null, blank, garbage, non-finite) reads as 0.
pub fn coerce_number(node: Option<&Node>) -> f64 {
    let number = match node {
        Some(Node::Number(number)) => number.as_f64().unwrap_or(0.0),
        Some(Node::String(text)) => text.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    if number.is_finite() {
        number
    } else {
        0.0
    }
}

/// Trimmed text for case-insensitive comparisons such as duplicate years.
pub fn normalized_text(value: &str) -> String {
    value.trim().to_lowercase()
}
