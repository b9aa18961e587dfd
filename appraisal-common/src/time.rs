//! Timestamp utilities

use chrono::{DateTime, Local, NaiveDate, TimeZone};

/// Today's local date
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// ISO calendar date (`2025-03-07`), as embedded in analysis prompts
pub fn iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Czech civil timestamp (`7. 3. 2025 9:05:01`) for report footers
pub fn czech_timestamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format("%-d. %-m. %Y %-H:%M:%S").to_string()
}
