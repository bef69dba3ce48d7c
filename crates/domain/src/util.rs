use time::format_description::FormatItem;
use time::macros::format_description;
use time::{Date, Duration, OffsetDateTime};
use uuid::Uuid;

use crate::DomainResult;
use crate::error::DomainError;

const DATE_FORMAT: &[FormatItem<'_>] = format_description!("[year]-[month]-[day]");
const MS_PER_DAY: i64 = 86_400_000;

pub fn uuid_v7_without_dashes() -> String {
    Uuid::now_v7().simple().to_string()
}

pub fn now_ms() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

fn datetime_from_ms(epoch_ms: i64) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp_nanos(epoch_ms as i128 * 1_000_000)
        .unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

/// Formats an epoch-millisecond timestamp as a calendar day, `YYYY-MM-DD`.
pub fn format_ms_date(epoch_ms: i64) -> String {
    datetime_from_ms(epoch_ms)
        .date()
        .format(&DATE_FORMAT)
        .unwrap_or_else(|_| "1970-01-01".to_string())
}

/// Parses a `YYYY-MM-DD` query parameter to epoch milliseconds at UTC midnight.
pub fn parse_date_ms(value: &str) -> DomainResult<i64> {
    let date = Date::parse(value, &DATE_FORMAT)
        .map_err(|_| DomainError::Validation(format!("invalid date '{value}'")))?;
    Ok((date.midnight().assume_utc().unix_timestamp_nanos() / 1_000_000) as i64)
}

/// Last millisecond of the day that starts at `day_start_ms`, for
/// inclusive-inclusive range filters.
pub fn end_of_day_ms(day_start_ms: i64) -> i64 {
    day_start_ms + MS_PER_DAY - 1
}

pub fn start_of_day_ms(epoch_ms: i64) -> i64 {
    let date = datetime_from_ms(epoch_ms).date();
    (date.midnight().assume_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

pub fn start_of_month_ms(epoch_ms: i64) -> i64 {
    let date = datetime_from_ms(epoch_ms).date();
    let first = date.replace_day(1).unwrap_or(date);
    (first.midnight().assume_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// UTC midnight `days` days before the day containing `epoch_ms`.
pub fn days_ago_start_ms(epoch_ms: i64, days: i64) -> i64 {
    let date = datetime_from_ms(epoch_ms).date() - Duration::days(days);
    (date.midnight().assume_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_roundtrip() {
        let ms = parse_date_ms("2025-03-09").expect("parse");
        assert_eq!(format_ms_date(ms), "2025-03-09");
        assert_eq!(start_of_day_ms(ms + 5_000), ms);
        assert_eq!(end_of_day_ms(ms), ms + 86_399_999);
    }

    #[test]
    fn rejects_malformed_date() {
        assert!(parse_date_ms("03/09/2025").is_err());
        assert!(parse_date_ms("").is_err());
    }

    #[test]
    fn month_start_is_first_day() {
        let ms = parse_date_ms("2025-03-09").expect("parse");
        assert_eq!(format_ms_date(start_of_month_ms(ms)), "2025-03-01");
    }

    #[test]
    fn days_ago_crosses_month_boundary() {
        let ms = parse_date_ms("2025-03-09").expect("parse");
        assert_eq!(format_ms_date(days_ago_start_ms(ms, 15)), "2025-02-22");
    }
}
