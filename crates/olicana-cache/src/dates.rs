//! Calendar date helpers shared by the cache and the plugins.

use time::Date;
use time::macros::format_description;

/// Parses a `YYYY-MM-DD` date.
///
/// # Errors
///
/// Returns an error if `text` is not a valid calendar date in that form.
pub fn parse_date(text: &str) -> Result<Date, time::error::Parse> {
    Date::parse(text.trim(), format_description!("[year]-[month]-[day]"))
}

/// Formats a date as `YYYY-MM-DD`.
#[must_use]
pub fn format_date(date: Date) -> String {
    date.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| date.to_string())
}

/// Returns the Unix timestamp of midnight UTC at the start of `date`.
#[must_use]
pub const fn unix_seconds(date: Date) -> i64 {
    date.midnight().assume_utc().unix_timestamp()
}

/// Serde adapter storing a [`Date`] as a `YYYY-MM-DD` string.
pub mod iso_date {
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};
    use time::Date;

    /// Serialises `date` as `YYYY-MM-DD`.
    ///
    /// # Errors
    ///
    /// Propagates serializer failures.
    pub fn serialize<S: Serializer>(date: &Date, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_date(*date))
    }

    /// Deserialises a `YYYY-MM-DD` string.
    ///
    /// # Errors
    ///
    /// Fails when the input is not a string holding a valid date.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Date, D::Error> {
        let text = String::deserialize(deserializer)?;
        super::parse_date(&text).map_err(D::Error::custom)
    }
}
