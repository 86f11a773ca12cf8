//! Human-readable relative timestamps for chat previews.

const MINUTE: i64 = 60_000;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const WEEK: i64 = 7 * DAY;

/// Render `ts_ms` relative to `now_ms`, both epoch milliseconds.
///
/// Timestamps in the future read as "Just now".
pub fn format_relative(ts_ms: i64, now_ms: i64) -> String {
    let diff = (now_ms - ts_ms).max(0);

    match diff {
        d if d < MINUTE => "Just now".to_string(),
        d if d < HOUR => plural(d / MINUTE, "minute"),
        d if d < DAY => plural(d / HOUR, "hour"),
        d if d < 2 * DAY => "Yesterday".to_string(),
        d if d < WEEK => format!("{} days ago", d / DAY),
        d if d < 2 * WEEK => "1 week ago".to_string(),
        d if d < 30 * DAY => format!("{} weeks ago", d / WEEK),
        d => plural((d / (30 * DAY)).max(1), "month"),
    }
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {unit} ago")
    } else {
        format!("{n} {unit}s ago")
    }
}
