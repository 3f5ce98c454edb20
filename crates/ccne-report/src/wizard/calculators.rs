//! Derived percentages shared by live feedback and the review summary.

use super::domain::{Completion, Exclusion};

/// Placeholder rendered when a rate cannot be computed.
pub const RATE_PLACEHOLDER: &str = "–";

/// Denominator less every exclusion, clamped at zero.
pub fn adjusted_denominator(denominator: u32, exclusions: &[Exclusion]) -> u32 {
    let excluded: u64 = exclusions
        .iter()
        .map(|exclusion| u64::from(exclusion.count))
        .sum();
    let remaining = u64::from(denominator).saturating_sub(excluded);
    u32::try_from(remaining).unwrap_or(u32::MAX)
}

/// `numerator / denominator` as a one-decimal percentage.
pub fn rate(numerator: f64, denominator: f64) -> String {
    if denominator.is_nan() || denominator <= 0.0 {
        return RATE_PLACEHOLDER.to_string();
    }
    let percent = numerator / denominator * 100.0;
    if !percent.is_finite() {
        return RATE_PLACEHOLDER.to_string();
    }
    format!("{percent:.1}%")
}

/// Completion rate over the adjusted denominator, falling back to the raw
/// denominator when exclusions consume all of it.
pub fn completion_rate(completion: &Completion) -> String {
    let adjusted = adjusted_denominator(completion.denominator, &completion.exclusions);
    let denominator = if adjusted > 0 {
        adjusted
    } else {
        completion.denominator
    };
    rate(f64::from(completion.numerator), f64::from(denominator))
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 B".to_string();
    }
    let mut value = bytes as f64;
    let mut exponent = 0;
    while value >= 1024.0 && exponent < UNITS.len() - 1 {
        value /= 1024.0;
        exponent += 1;
    }
    let decimals = if value >= 10.0 || exponent == 0 { 0 } else { 1 };
    format!("{value:.decimals$} {}", UNITS[exponent])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wizard::domain::ExclusionCategory;

    fn exclusion(count: u32) -> Exclusion {
        Exclusion {
            category: ExclusionCategory::Death,
            count,
            note: None,
        }
    }

    #[test]
    fn adjusted_denominator_is_clamped_at_zero() {
        assert_eq!(adjusted_denominator(100, &[exclusion(20), exclusion(90)]), 0);
        assert_eq!(adjusted_denominator(100, &[exclusion(20), exclusion(30)]), 50);
        assert_eq!(adjusted_denominator(0, &[]), 0);
    }

    #[test]
    fn rate_formats_one_decimal_or_placeholder() {
        assert_eq!(rate(0.0, 0.0), "–");
        assert_eq!(rate(1.0, 4.0), "25.0%");
        assert_eq!(rate(2.0, 3.0), "66.7%");
        assert_eq!(rate(5.0, -2.0), "–");
        assert_eq!(rate(f64::NAN, 4.0), "–");
        assert_eq!(rate(1.0, f64::NAN), "–");
    }

    #[test]
    fn completion_rate_falls_back_to_raw_denominator() {
        let completion = Completion {
            numerator: 40,
            denominator: 50,
            exclusions: vec![exclusion(10)],
        };
        assert_eq!(completion_rate(&completion), "100.0%");

        let consumed = Completion {
            numerator: 10,
            denominator: 20,
            exclusions: vec![exclusion(25)],
        };
        assert_eq!(completion_rate(&consumed), "50.0%");
    }

    #[test]
    fn format_bytes_scales_units() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(20 * 1024), "20 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
