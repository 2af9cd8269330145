//! Playback time labels.

/// Formats milliseconds as `m:ss`, or `h:mm:ss` from one hour up.
pub fn format_millis(millis: u64) -> String {
    let seconds = millis / 1000;
    let minutes = seconds / 60;

    if minutes < 60 {
        format!("{}:{:02}", minutes, seconds % 60)
    } else {
        let hours = minutes / 60;
        format!("{}:{:02}:{:02}", hours, minutes % 60, seconds % 60)
    }
}

/// Like [`format_millis`], with a placeholder while the duration is unknown.
pub fn format_duration(duration_ms: Option<u64>) -> String {
    match duration_ms {
        Some(millis) => format_millis(millis),
        None => "-:--".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_millis() {
        assert_eq!(format_millis(0), "0:00");
        assert_eq!(format_millis(999), "0:00");
        assert_eq!(format_millis(65_000), "1:05");
        assert_eq!(format_millis(59 * 60_000 + 59_999), "59:59");
        assert_eq!(format_millis(3_605_000), "1:00:05");
        assert_eq!(format_millis(10 * 3_600_000 + 61_000), "10:01:01");
    }

    #[test]
    fn test_format_unknown_duration() {
        assert_eq!(format_duration(None), "-:--");
        assert_eq!(format_duration(Some(125_000)), "2:05");
    }
}
