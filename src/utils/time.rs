use chrono::{NaiveDateTime, Timelike};

/// Converts a `YYYY-MM-DD HH:MM:SS` log prefix into seconds since midnight.
/// The log only carries second precision and the parser works in
/// seconds-of-day, so spans that cross midnight are a known limitation.
pub fn seconds_of_day(date: &str, time: &str) -> Option<i64> {
    let stamp =
        NaiveDateTime::parse_from_str(&format!("{date} {time}"), "%Y-%m-%d %H:%M:%S").ok()?;
    Some(i64::from(stamp.time().num_seconds_from_midnight()))
}

pub fn format_time_of_day(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

pub fn format_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    if seconds >= 60 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else {
        format!("{}s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_log_prefix_to_seconds_of_day() {
        assert_eq!(
            seconds_of_day("2023-11-18", "14:49:49"),
            Some(14 * 3600 + 49 * 60 + 49)
        );
        assert_eq!(seconds_of_day("2023-11-18", "00:00:00"), Some(0));
    }

    #[test]
    fn rejects_malformed_prefixes() {
        assert_eq!(seconds_of_day("2023-13-18", "14:49:49"), None);
        assert_eq!(seconds_of_day("garbage", "14:49:49"), None);
    }

    #[test]
    fn formats_durations() {
        assert_eq!(format_duration(42), "42s");
        assert_eq!(format_duration(125), "2m 5s");
        assert_eq!(format_time_of_day(14 * 3600 + 49 * 60 + 49), "14:49:49");
    }
}
