//! Time formatting helpers.

use agora_types::Timestamp;

/// Format a duration in seconds using its two largest units.
pub fn format_duration(secs: u64) -> String {
    match secs {
        0..=59 => format!("{secs}s"),
        60..=3_599 => format!("{}m {}s", secs / 60, secs % 60),
        3_600..=86_399 => format!("{}h {}m", secs / 3_600, (secs % 3_600) / 60),
        _ => format!("{}d {}h", secs / 86_400, (secs % 86_400) / 3_600),
    }
}

/// Describe how long a voting window closing at `end` stays open at `now`.
pub fn describe_window(end: Timestamp, now: Timestamp) -> String {
    match end.as_secs().checked_sub(now.as_secs()) {
        Some(left) if left > 0 => format!("closes in {}", format_duration(left)),
        _ => "closed".to_string(),
    }
}
