use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, TimeZone, Utc};
use chrono_tz::Tz;

/// Formats a timestamp the way it is stored in the database.
///
/// Fixed width with a `Z` suffix so stored values compare correctly as text.
pub fn to_db_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn parse_db_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| anyhow!("Invalid timestamp '{}': {}", value, e))
}

/// Parses an IANA timezone name, e.g. `Europe/Madrid`.
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| anyhow!("Unknown timezone '{}'", name.trim()))
}

/// Resolves a stored timezone name, falling back to UTC.
pub fn timezone_or_utc(name: &str) -> Tz {
    match parse_timezone(name) {
        Ok(tz) => tz,
        Err(_) => {
            tracing::warn!("Unknown timezone {}, using UTC", name);
            Tz::UTC
        }
    }
}

/// The calendar date in the given timezone, as stored in `users.water_day`.
pub fn local_day(now: &DateTime<Utc>, tz: &Tz) -> String {
    now.with_timezone(tz).date_naive().format("%Y-%m-%d").to_string()
}

pub fn local_time(now: &DateTime<Utc>, tz: &Tz) -> NaiveTime {
    now.with_timezone(tz).time()
}

/// UTC instant of the most recent local midnight in `tz`.
pub fn start_of_local_day(now: &DateTime<Utc>, tz: &Tz) -> DateTime<Utc> {
    let date: NaiveDate = now.with_timezone(tz).date_naive();
    let midnight = date.and_time(NaiveTime::default());
    tz.from_local_datetime(&midnight)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        // Midnight skipped by a DST jump: fall back to the UTC date boundary
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}

pub fn format_date(dt: &DateTime<Utc>, tz: &Tz) -> String {
    dt.with_timezone(tz).format("%d/%m/%Y").to_string()
}
