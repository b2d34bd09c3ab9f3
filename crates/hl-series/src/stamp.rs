//! `Time Date Stamp` strings as written by HEC-RAS (`01JAN2020 00:00:00`).

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeZone, Utc};

/// Parse a stamp into an RFC 3339 UTC timestamp. `24:00` is the end of
/// the day and becomes midnight of the next.
pub fn parse_date_stamp(stamp: &str) -> Option<String> {
    let stamp = stamp.trim();
    let (date, time) = stamp.split_once(char::is_whitespace)?;
    let date = NaiveDate::parse_from_str(date.trim(), "%d%b%Y").ok()?;
    let time = time.trim();

    let (clock, extra_day) = if let Some(rest) = time.strip_prefix("24") {
        (format!("00{rest}"), true)
    } else {
        (time.to_string(), false)
    };
    let clock = NaiveTime::parse_from_str(&clock, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(&clock, "%H:%M"))
        .or_else(|_| NaiveTime::parse_from_str(&clock, "%H%M"))
        .ok()?;

    let mut at = NaiveDateTime::new(date, clock);
    if extra_day {
        at += Duration::days(1);
    }
    Some(Utc.from_utc_datetime(&at).to_rfc3339_opts(SecondsFormat::Secs, true))
}
