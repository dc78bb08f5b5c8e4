//! Human-readable formatting for cache sizes and ratios.
//!
//! Values are rounded to two decimals and printed without trailing zeros,
//! so `1536` bytes is `"1.5KB"` and a ratio of `0.8` is `"80%"`.
//!
//! Rounding is Rust's `{:.2}` formatting: exact binary ties go to the even
//! digit, so `1.125` prints as `"1.12"`, not `"1.13"`.

/// Unit suffixes, each one 1024 times the previous.
const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Format a byte count using the largest unit whose next threshold is not reached.
///
/// `"512B"`, `"1KB"`, `"1.5MB"`, `"3.25GB"`. Counts at or beyond 1024 TB
/// stay in TB.
pub fn format_size(bytes: u64) -> String {
    let mut divisor = 1u64;
    let mut unit = UNITS[0];
    for (idx, suffix) in UNITS.iter().enumerate() {
        unit = suffix;
        if idx == UNITS.len() - 1 || bytes < divisor.saturating_mul(1024) {
            break;
        }
        divisor *= 1024;
    }
    format!("{}{}", format_decimal(bytes as f64 / divisor as f64), unit)
}

/// Format a fraction as a percentage: `0.5` -> `"50%"`, `0.33333` -> `"33.33%"`.
pub fn format_percent(ratio: f64) -> String {
    format!("{}%", format_decimal(ratio * 100.0))
}

/// Round to two decimals and drop trailing zeros.
fn format_decimal(value: f64) -> String {
    let s = format!("{:.2}", value);
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}
