const SECONDS_IN_HOUR: u64 = 3600;
const SECONDS_IN_MINUTE: u64 = 60;

/// This is the standard way of displaying elapsed time in punchclock. Hours are not wrapped, so
/// anything above 99 hours simply produces a wider field.
pub fn format_elapsed(elapsed_seconds: u64) -> String {
    let hours = elapsed_seconds / SECONDS_IN_HOUR;
    let minutes = (elapsed_seconds % SECONDS_IN_HOUR) / SECONDS_IN_MINUTE;
    let seconds = elapsed_seconds % SECONDS_IN_MINUTE;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Converts seconds into hours rounded to 2 decimal places. Rounding is applied to `hours * 100`
/// with [f64::round], so a quotient just below a half can still round up.
pub fn hours_rounded(elapsed_seconds: u64) -> f64 {
    let hours = elapsed_seconds as f64 / SECONDS_IN_HOUR as f64;
    (hours * 100.).round() / 100.
}
