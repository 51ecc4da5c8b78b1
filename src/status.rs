//! Open/closed status engine
//!
//! Every function takes the moment to evaluate explicitly; nothing in this
//! module reads the system clock. Status is never cached, callers recompute
//! it from the current hours snapshot.

use crate::hours::{lookup, RestaurantHours};
use crate::time_format::{format_hours_display, format_next_open_message};
use crate::time_parser::{
    current_day_name, current_time_minutes, day_index, is_12_hour_format, parse_opening_time,
    parse_time_12_hour, parse_time_range_24_hour, DAY_NAMES, MINUTES_PER_DAY,
};
use chrono::{Datelike, Timelike};
use serde::Serialize;

/// Combined status of the restaurant at a point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenStatus {
    pub is_open: bool,
    pub current_hours: Option<String>,
    pub next_open_time: Option<String>,
}

/// Check whether an hours string covers `current_minutes`
///
/// 12-hour strings are a single inclusive `open - close` range. 24-hour
/// strings may hold several comma-separated sittings; any match wins.
/// A 24-hour range whose close is not after its open wraps past midnight,
/// and a time earlier than the opening is then treated as after midnight.
pub fn is_time_range_open(hours: Option<&str>, current_minutes: u32) -> bool {
    let Some(hours) = hours else {
        return false;
    };
    if hours.is_empty() || hours.eq_ignore_ascii_case("closed") {
        return false;
    }

    if is_12_hour_format(hours) {
        let parts: Vec<&str> = hours.split(" - ").collect();
        if parts.len() != 2 {
            return false;
        }
        let open = parse_time_12_hour(parts[0]);
        let close = parse_time_12_hour(parts[1]);
        return current_minutes >= open && current_minutes <= close;
    }

    hours.split(',').map(str::trim).any(|range| {
        let Some((open, mut close)) = parse_time_range_24_hour(range) else {
            return false;
        };
        let mut now = current_minutes;
        if close <= open {
            close += MINUTES_PER_DAY;
            if now < open {
                now += MINUTES_PER_DAY;
            }
        }
        now >= open && now <= close
    })
}

/// Check if the restaurant is open at `now`
///
/// Detailed hours are open when either the kitchen or the bar is.
pub fn check_is_open<T: Datelike + Timelike>(hours: &RestaurantHours, now: &T) -> bool {
    let day = current_day_name(now);
    let minutes = current_time_minutes(now);

    match hours {
        RestaurantHours::Detailed { kitchen, bar } => {
            is_time_range_open(lookup(kitchen, day), minutes)
                || is_time_range_open(lookup(bar, day), minutes)
        }
        RestaurantHours::Legacy(days) => match days.get(day) {
            Some(today) if !today.eq_ignore_ascii_case("closed") => {
                is_time_range_open(Some(today.as_str()), minutes)
            }
            _ => false,
        },
    }
}

/// Today's hours as a display string
///
/// Detailed hours render as `"Kitchen: 12 PM – 3 PM | Bar: 12 PM – 10 PM"`,
/// leaving out whichever service has no entry, or `"Closed"` when neither
/// does. Legacy hours are returned exactly as stored.
pub fn current_day_hours<T: Datelike>(hours: &RestaurantHours, now: &T) -> Option<String> {
    let day = current_day_name(now);

    match hours {
        RestaurantHours::Detailed { kitchen, bar } => {
            let kitchen = lookup(kitchen, day).map(format_hours_display);
            let bar = lookup(bar, day).map(format_hours_display);
            let text = match (kitchen, bar) {
                (Some(k), Some(b)) => format!("Kitchen: {} | Bar: {}", k, b),
                (Some(k), None) => format!("Kitchen: {}", k),
                (None, Some(b)) => format!("Bar: {}", b),
                (None, None) => "Closed".to_string(),
            };
            Some(text)
        }
        RestaurantHours::Legacy(days) => days.get(day).filter(|h| !h.is_empty()).cloned(),
    }
}

/// When the restaurant next opens, scanning today and the following six days
///
/// Today only counts if its opening time is still ahead. For later days the
/// first parsable opening time is used. Returns `None` when nothing opens
/// within the week.
pub fn next_open_time<T: Datelike + Timelike>(hours: &RestaurantHours, now: &T) -> Option<String> {
    let today = day_index(now);
    let minutes = current_time_minutes(now);

    for offset in 0..DAY_NAMES.len() {
        let day = DAY_NAMES[(today + offset) % DAY_NAMES.len()];
        let Some(day_hours) = hours.day_hours(day) else {
            continue;
        };
        if day_hours.eq_ignore_ascii_case("closed") {
            continue;
        }
        let Some(opening) = parse_opening_time(day_hours) else {
            continue;
        };

        if offset == 0 {
            if minutes < opening {
                return Some(format_next_open_message(0, day, opening));
            }
        } else {
            return Some(format_next_open_message(offset, day, opening));
        }
    }

    None
}

/// Full status at `now`; the next opening is only computed while closed
pub fn restaurant_status<T: Datelike + Timelike>(hours: &RestaurantHours, now: &T) -> OpenStatus {
    let is_open = check_is_open(hours, now);
    OpenStatus {
        is_open,
        current_hours: current_day_hours(hours, now),
        next_open_time: if is_open { None } else { next_open_time(hours, now) },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hours::collect_days;
    use chrono::{NaiveDate, NaiveDateTime};

    /// 2024-01-15 is a Monday
    fn monday_at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn legacy_week() -> RestaurantHours {
        RestaurantHours::legacy([
            ("sunday", "Closed"),
            ("monday", "11:30 AM - 10:00 PM"),
            ("tuesday", "11:30 AM - 10:00 PM"),
            ("wednesday", "11:30 AM - 10:00 PM"),
            ("thursday", "11:30 AM - 10:00 PM"),
            ("friday", "11:30 AM - 11:00 PM"),
            ("saturday", "12:00 PM - 11:00 PM"),
        ])
    }

    #[test]
    fn test_is_time_range_open_12_hour_inclusive() {
        let range = Some("11:30 AM - 10:00 PM");
        assert!(is_time_range_open(range, 690));
        assert!(is_time_range_open(range, 1320));
        assert!(!is_time_range_open(range, 689));
        assert!(!is_time_range_open(range, 1321));
    }

    #[test]
    fn test_is_time_range_open_rejects_closed_and_empty() {
        assert!(!is_time_range_open(None, 600));
        assert!(!is_time_range_open(Some(""), 600));
        assert!(!is_time_range_open(Some("CLOSED"), 600));
        assert!(!is_time_range_open(Some("11:30 AM to 10:00 PM"), 700));
    }

    #[test]
    fn test_is_time_range_open_multiple_sittings() {
        let range = Some("12:00-15:00,17:00-22:00");
        assert!(is_time_range_open(range, 13 * 60));
        assert!(is_time_range_open(range, 18 * 60));
        assert!(!is_time_range_open(range, 16 * 60));
        assert!(!is_time_range_open(range, 23 * 60));
    }

    #[test]
    fn test_is_time_range_open_overnight() {
        let range = Some("23:00-01:00");
        assert!(is_time_range_open(range, 23 * 60 + 30));
        assert!(is_time_range_open(range, 30));
        assert!(is_time_range_open(range, 60));
        assert!(!is_time_range_open(range, 61));
        assert!(!is_time_range_open(range, 12 * 60));
    }

    #[test]
    fn test_is_time_range_open_huge_hour_is_closed() {
        assert!(!is_time_range_open(Some("99999999:00 PM - 11:00 PM"), 600));
        assert!(!is_time_range_open(Some("99999999:00 PM - 11:00 PM"), 23 * 60));
    }

    #[test]
    fn test_check_is_open_legacy() {
        let hours = legacy_week();
        assert!(check_is_open(&hours, &monday_at(12, 0)));
        assert!(!check_is_open(&hours, &monday_at(23, 0)));

        let sunday = NaiveDate::from_ymd_opt(2024, 1, 14)
            .unwrap()
            .and_hms_opt(13, 0, 0)
            .unwrap();
        assert!(!check_is_open(&hours, &sunday));
    }

    #[test]
    fn test_check_is_open_bar_only() {
        let hours = RestaurantHours::detailed(
            None,
            Some(collect_days([("monday", "17:00-23:00")])),
        );
        assert!(check_is_open(&hours, &monday_at(18, 0)));
        assert!(!check_is_open(&hours, &monday_at(10, 0)));
    }

    #[test]
    fn test_check_is_open_kitchen_or_bar() {
        let hours = RestaurantHours::detailed(
            Some(collect_days([("monday", "12:00-15:00,17:00-22:00")])),
            Some(collect_days([("monday", "15:00-23:00")])),
        );
        assert!(check_is_open(&hours, &monday_at(13, 0)));
        assert!(check_is_open(&hours, &monday_at(16, 0)));
        assert!(!check_is_open(&hours, &monday_at(11, 0)));
    }

    #[test]
    fn test_current_day_hours_detailed() {
        let both = RestaurantHours::detailed(
            Some(collect_days([("monday", "12:00-15:00")])),
            Some(collect_days([("monday", "12:00-22:00")])),
        );
        assert_eq!(
            current_day_hours(&both, &monday_at(9, 0)).as_deref(),
            Some("Kitchen: 12 PM – 3 PM | Bar: 12 PM – 10 PM")
        );

        let bar_only = RestaurantHours::detailed(
            None,
            Some(collect_days([("monday", "17:00-23:00")])),
        );
        assert_eq!(
            current_day_hours(&bar_only, &monday_at(9, 0)).as_deref(),
            Some("Bar: 5 PM – 11 PM")
        );

        let neither = RestaurantHours::detailed(None, None);
        assert_eq!(current_day_hours(&neither, &monday_at(9, 0)).as_deref(), Some("Closed"));
    }

    #[test]
    fn test_current_day_hours_legacy() {
        let hours = legacy_week();
        assert_eq!(
            current_day_hours(&hours, &monday_at(9, 0)).as_deref(),
            Some("11:30 AM - 10:00 PM")
        );
        let empty = RestaurantHours::legacy(Vec::<(String, String)>::new());
        assert_eq!(current_day_hours(&empty, &monday_at(9, 0)), None);
    }

    #[test]
    fn test_next_open_time_today_and_tomorrow() {
        let hours = legacy_week();
        assert_eq!(
            next_open_time(&hours, &monday_at(9, 0)).as_deref(),
            Some("Today at 11:30 AM")
        );
        assert_eq!(
            next_open_time(&hours, &monday_at(23, 0)).as_deref(),
            Some("Tomorrow at 11:30 AM")
        );
    }

    #[test]
    fn test_next_open_time_skips_closed_days() {
        // Saturday night: Sunday is closed, so Monday is next
        let saturday = NaiveDate::from_ymd_opt(2024, 1, 20)
            .unwrap()
            .and_hms_opt(23, 30, 0)
            .unwrap();
        assert_eq!(
            next_open_time(&legacy_week(), &saturday).as_deref(),
            Some("Monday at 11:30 AM")
        );
    }

    #[test]
    fn test_next_open_time_uses_first_sitting() {
        let hours = RestaurantHours::detailed(
            Some(collect_days([("tuesday", "12:00-15:00,17:00-22:00")])),
            None,
        );
        assert_eq!(
            next_open_time(&hours, &monday_at(20, 0)).as_deref(),
            Some("Tomorrow at 12 PM")
        );
    }

    #[test]
    fn test_next_open_time_all_closed() {
        let hours = RestaurantHours::legacy(DAY_NAMES.iter().map(|d| (*d, "closed")));
        assert_eq!(next_open_time(&hours, &monday_at(9, 0)), None);
    }

    #[test]
    fn test_restaurant_status() {
        let hours = legacy_week();
        let open = restaurant_status(&hours, &monday_at(12, 0));
        assert!(open.is_open);
        assert_eq!(open.next_open_time, None);

        let closed = restaurant_status(&hours, &monday_at(8, 0));
        assert!(!closed.is_open);
        assert_eq!(closed.current_hours.as_deref(), Some("11:30 AM - 10:00 PM"));
        assert_eq!(closed.next_open_time.as_deref(), Some("Today at 11:30 AM"));
    }

    #[test]
    fn test_open_status_serializes_camel_case() {
        let status = restaurant_status(&legacy_week(), &monday_at(12, 0));
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["isOpen"], true);
        assert!(json.get("currentHours").is_some());
        assert!(json["nextOpenTime"].is_null());
    }
}
