use chrono::{DateTime, Duration, Local, Utc};

/// Format a duration as `HH:MM:SS`, or `null` when absent.
pub fn format_elapsed(elapsed: Option<Duration>, null: &str) -> String {
    let Some(elapsed) = elapsed else {
        return null.to_string();
    };
    let total = elapsed.num_seconds().max(0);
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

/// Format a timestamp in the local time zone without sub-second precision.
pub fn format_local(ts: Option<DateTime<Utc>>, null: &str) -> String {
    match ts {
        Some(ts) => ts.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string(),
        None => null.to_string(),
    }
}
