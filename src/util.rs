/*!
Miscellaneous utilities for `stockcast`
*/

use chrono::{DateTime, FixedOffset, TimeZone, Utc};

/// Convert a UNIX timestamp in seconds to a `DateTime` at a given offset from UTC, in seconds.
///
/// Returns `None` if either the offset or the timestamp are out of range.
pub fn from_unix(secs: i64, offset_secs: i32) -> Option<DateTime<FixedOffset>> {
    let offset = FixedOffset::east_opt(offset_secs)?;
    let utc = Utc.timestamp_opt(secs, 0).single()?;
    Some(utc.with_timezone(&offset))
}

/// Midnight at the start of `t`'s local date, keeping its offset
pub fn trading_date(t: &DateTime<FixedOffset>) -> Option<DateTime<FixedOffset>> {
    let midnight = t.date_naive().and_hms_opt(0, 0, 0)?;
    t.timezone().from_local_datetime(&midnight).single()
}

/// Format a timestamp the way a pandas `Timestamp` prints when cast to a string
pub fn pandas_str(t: &DateTime<FixedOffset>) -> String {
    t.format("%Y-%m-%d %H:%M:%S%:z").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_unix() {
        let t = from_unix(1_704_205_800, -5 * 3600).unwrap();
        assert_eq!(t.to_rfc3339(), "2024-01-02T09:30:00-05:00");
        assert!(from_unix(0, 100_000).is_none());
    }

    #[test]
    fn test_trading_date() {
        // 2024-01-02 21:30 in New York is already the 3rd in UTC
        let t = from_unix(1_704_249_000, -5 * 3600).unwrap();
        assert_eq!(
            trading_date(&t).unwrap().to_rfc3339(),
            "2024-01-02T00:00:00-05:00"
        );
    }

    #[test]
    fn test_pandas_str() {
        let t = from_unix(1_704_205_800, -5 * 3600).unwrap();
        assert_eq!(pandas_str(&t), "2024-01-02 09:30:00-05:00");
    }
}
