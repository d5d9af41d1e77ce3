use chrono::{DateTime, Utc};

/// Signed whole seconds from `from` to `to`, rounded to the nearest second.
///
/// Scan timestamps carry millisecond precision from some reader firmwares;
/// schedule arithmetic works in whole seconds throughout the engine.
pub fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    let millis = to.signed_duration_since(from).num_milliseconds();
    (millis as f64 / 1000.0).round() as i64
}

/// Human-readable signed duration for diagnostics and round notes,
/// e.g. `+5m 30s`, `-1h 2m`, `+0s`.
pub fn format_signed_seconds(seconds: i64) -> String {
    let sign = if seconds < 0 { '-' } else { '+' };
    let abs = seconds.unsigned_abs();
    let hours = abs / 3600;
    let minutes = (abs % 3600) / 60;
    let secs = abs % 60;

    let mut parts = Vec::new();
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    if secs > 0 || parts.is_empty() {
        parts.push(format!("{secs}s"));
    }

    format!("{sign}{}", parts.join(" "))
}
