use chrono::{DateTime, Utc};

/// Get the current Unix timestamp in milliseconds (UTC)
pub fn unix_timestamp_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Format a millisecond Unix timestamp as RFC 3339 (UTC)
pub fn timestamp_to_rfc3339(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_to_rfc3339() {
        // given: 2023-01-01T00:00:00Z
        let millis = 1672531200000;

        // when:
        let formatted = timestamp_to_rfc3339(millis);

        // then:
        assert!(formatted.starts_with("2023-01-01T00:00:00"));
    }

    #[test]
    fn test_unix_timestamp_is_recent() {
        // then: after 2024-01-01
        assert!(unix_timestamp_millis() > 1704067200000);
    }
}
