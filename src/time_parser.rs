//! Parsing of restaurant hour strings
//!
//! Hours arrive in two shapes: 12-hour display strings such as
//! `"11:30 AM - 10:00 PM"` and 24-hour strings such as
//! `"12:00-15:00,17:00-22:00"`. Everything here converts them to minutes
//! since midnight. Clock helpers take the date explicitly so callers (and
//! tests) decide what "now" is.

use chrono::{Datelike, Timelike};
use regex_lite::Regex;
use std::sync::LazyLock;

/// Day names in calendar order, Sunday first (index matches [`day_index`])
pub const DAY_NAMES: [&str; 7] = [
    "sunday",
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
];

/// Minutes in one day
pub const MINUTES_PER_DAY: u32 = 24 * 60;

static CLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2}):(\d{2})").expect("clock pattern"));

static RANGE_24_HOUR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,2}):(\d{2})\s*-\s*(\d{1,2}):(\d{2})").expect("range pattern")
});

/// Check if a time string is in 12-hour format (contains AM/PM, any case)
pub fn is_12_hour_format(time_str: &str) -> bool {
    let upper = time_str.to_uppercase();
    upper.contains("AM") || upper.contains("PM")
}

/// Parse a 12-hour time such as `"11:30 AM"` to minutes since midnight
///
/// Input with fewer than two whitespace-separated tokens yields 0 rather
/// than an error. `12 PM` stays at noon (720) and `12 AM` keeps only its
/// minute component. Out-of-range numbers saturate instead of overflowing.
///
/// # Example
/// ```
/// use restaurant_content::time_parser::parse_time_12_hour;
///
/// assert_eq!(parse_time_12_hour("11:30 AM"), 690);
/// assert_eq!(parse_time_12_hour("10:00 PM"), 1320);
/// assert_eq!(parse_time_12_hour("12:15 AM"), 15);
/// ```
pub fn parse_time_12_hour(time_str: &str) -> u32 {
    let parts: Vec<&str> = time_str.split_whitespace().collect();
    if parts.len() < 2 {
        return 0;
    }

    let mut clock = parts[0].split(':');
    let hours: u32 = clock.next().and_then(|h| h.parse().ok()).unwrap_or(0);
    let minutes: u32 = clock.next().and_then(|m| m.parse().ok()).unwrap_or(0);
    let period = parts[1].to_uppercase();

    let mut total = hours.saturating_mul(60).saturating_add(minutes);
    if period == "PM" && hours != 12 {
        total = total.saturating_add(12 * 60);
    } else if period == "AM" && hours == 12 {
        total = minutes;
    }
    total
}

/// Parse the first `H:MM` or `HH:MM` found in the string
///
/// Returns `None` when no clock value is present.
pub fn parse_time_24_hour(time_str: &str) -> Option<u32> {
    let caps = CLOCK.captures(time_str)?;
    Some(minutes_of(&caps[1], &caps[2]))
}

/// Parse the opening (left-hand) time of a range in either format
///
/// Returns `None` for empty input, the literal `"closed"` (any case), or a
/// 24-hour string with no recognizable clock value.
pub fn parse_opening_time(time_range: &str) -> Option<u32> {
    if time_range.is_empty() || time_range.eq_ignore_ascii_case("closed") {
        return None;
    }

    if is_12_hour_format(time_range) {
        let opening = time_range.split('-').next().unwrap_or(time_range);
        return Some(parse_time_12_hour(opening.trim()));
    }

    parse_time_24_hour(time_range)
}

/// Parse one 24-hour range `H(H):MM - H(H):MM` into `(open, close)` minutes
///
/// Whitespace around the dash is allowed and the range may sit anywhere in
/// the string; the first match wins. Wraparound is not resolved here.
pub fn parse_time_range_24_hour(range: &str) -> Option<(u32, u32)> {
    let caps = RANGE_24_HOUR.captures(range)?;
    Some((minutes_of(&caps[1], &caps[2]), minutes_of(&caps[3], &caps[4])))
}

/// Minutes since midnight of the given date/time
pub fn current_time_minutes<T: Timelike>(date: &T) -> u32 {
    date.hour() * 60 + date.minute()
}

/// Lowercase English weekday name of the given date
pub fn current_day_name<T: Datelike>(date: &T) -> &'static str {
    DAY_NAMES[day_index(date)]
}

/// Day index of the given date (0 = Sunday, 6 = Saturday)
pub fn day_index<T: Datelike>(date: &T) -> usize {
    date.weekday().num_days_from_sunday() as usize
}

/// Minutes for captured digit groups; both are at most two digits long
fn minutes_of(hours: &str, minutes: &str) -> u32 {
    let hours: u32 = hours.parse().unwrap_or(0);
    let minutes: u32 = minutes.parse().unwrap_or(0);
    hours * 60 + minutes
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_is_12_hour_format() {
        assert!(is_12_hour_format("11:30 AM - 10:00 PM"));
        assert!(is_12_hour_format("9 pm"));
        assert!(!is_12_hour_format("12:00-15:00"));
    }

    #[test]
    fn test_parse_time_12_hour() {
        assert_eq!(parse_time_12_hour("12:00 AM"), 0);
        assert_eq!(parse_time_12_hour("12:00 PM"), 720);
        assert_eq!(parse_time_12_hour("11:59 PM"), 1439);
        assert_eq!(parse_time_12_hour("11:30 AM"), 690);
        assert_eq!(parse_time_12_hour("9 PM"), 1260);
        assert_eq!(parse_time_12_hour("  7:05   am "), 425);
    }

    #[test]
    fn test_parse_time_12_hour_malformed() {
        assert_eq!(parse_time_12_hour("11:30"), 0);
        assert_eq!(parse_time_12_hour(""), 0);
    }

    #[test]
    fn test_parse_time_12_hour_out_of_range_saturates() {
        assert_eq!(parse_time_12_hour("99999999:00 PM"), u32::MAX);
        assert_eq!(parse_time_12_hour("4294967295:59 AM"), u32::MAX);
    }

    #[test]
    fn test_parse_time_24_hour() {
        assert_eq!(parse_time_24_hour("14:30"), Some(870));
        assert_eq!(parse_time_24_hour("9:00"), Some(540));
        assert_eq!(parse_time_24_hour("opens 17:00-22:00"), Some(1020));
        assert_eq!(parse_time_24_hour("noon"), None);
        assert_eq!(parse_time_24_hour("12:3"), None);
    }

    #[test]
    fn test_parse_opening_time() {
        assert_eq!(parse_opening_time("11:30 AM - 10:00 PM"), Some(690));
        assert_eq!(parse_opening_time("12:00-15:00,17:00-22:00"), Some(720));
        assert_eq!(parse_opening_time("Closed"), None);
        assert_eq!(parse_opening_time("CLOSED"), None);
        assert_eq!(parse_opening_time(""), None);
        assert_eq!(parse_opening_time("by appointment"), None);
    }

    #[test]
    fn test_parse_time_range_24_hour() {
        assert_eq!(parse_time_range_24_hour("12:00-15:00"), Some((720, 900)));
        assert_eq!(parse_time_range_24_hour("9:30 - 14:00"), Some((570, 840)));
        assert_eq!(parse_time_range_24_hour("23:00-01:00"), Some((1380, 60)));
        assert_eq!(parse_time_range_24_hour("12:00"), None);
        assert_eq!(parse_time_range_24_hour("12:00-"), None);
        assert_eq!(parse_time_range_24_hour("kitchen 123:45-6:00"), Some((1425, 360)));
    }

    #[test]
    fn test_clock_helpers() {
        // 2024-01-15 is a Monday
        let date = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(18, 45, 0)
            .unwrap();
        assert_eq!(current_time_minutes(&date), 18 * 60 + 45);
        assert_eq!(current_day_name(&date), "monday");
        assert_eq!(day_index(&date), 1);

        let sunday = NaiveDate::from_ymd_opt(2024, 1, 14).unwrap();
        assert_eq!(day_index(&sunday), 0);
        assert_eq!(current_day_name(&sunday), "sunday");
    }
}
