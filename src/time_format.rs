//! Display formatting for restaurant hours

use regex_lite::{Captures, Regex};
use std::sync::LazyLock;

static TWO_DIGIT_CLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{2}):(\d{2})").expect("clock pattern"));

/// Format an hour/minute pair in 12-hour style
///
/// # Example
/// ```
/// use restaurant_content::time_format::format_time;
///
/// assert_eq!(format_time(14, 30), "2:30 PM");
/// assert_eq!(format_time(9, 0), "9 AM");
/// assert_eq!(format_time(0, 0), "12 AM");
/// ```
pub fn format_time(hours: u32, minutes: u32) -> String {
    let period = if hours >= 12 { "PM" } else { "AM" };
    let display_hours = if hours > 12 {
        hours - 12
    } else if hours == 0 {
        12
    } else {
        hours
    };
    if minutes == 0 {
        format!("{} {}", display_hours, period)
    } else {
        format!("{}:{:02} {}", display_hours, minutes, period)
    }
}

/// Format minutes since midnight in 12-hour style
pub fn format_minutes_to_time(total_minutes: u32) -> String {
    format_time(total_minutes / 60, total_minutes % 60)
}

/// Convert a 24-hour range string into display form
///
/// `"12:00-15:00,17:00-22:00"` becomes `"12 PM – 3 PM, 5 PM – 10 PM"`.
/// Only two-digit hours are rewritten.
pub fn format_hours_display(time_range: &str) -> String {
    if time_range.is_empty() || time_range.eq_ignore_ascii_case("closed") {
        return "Closed".to_string();
    }

    time_range
        .split(',')
        .map(|range| {
            TWO_DIGIT_CLOCK
                .replace_all(range.trim(), render_clock)
                .replacen('-', " – ", 1)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Relative day label: "Today", "Tomorrow" or the capitalized day name
pub fn format_day_label(days_from_now: usize, day_name: &str) -> String {
    match days_from_now {
        0 => "Today".to_string(),
        1 => "Tomorrow".to_string(),
        _ => {
            let mut chars = day_name.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        }
    }
}

/// Format a "next open" message such as `"Tomorrow at 12 PM"`
pub fn format_next_open_message(
    days_from_now: usize,
    day_name: &str,
    opening_minutes: u32,
) -> String {
    format!(
        "{} at {}",
        format_day_label(days_from_now, day_name),
        format_minutes_to_time(opening_minutes)
    )
}

fn render_clock(caps: &Captures<'_>) -> String {
    let hours: u32 = caps[1].parse().unwrap_or(0);
    let minutes = if &caps[2] == "00" {
        String::new()
    } else {
        format!(":{}", &caps[2])
    };
    match hours {
        0 => format!("12{} AM", minutes),
        1..=11 => format!("{}{} AM", hours, minutes),
        12 => format!("12{} PM", minutes),
        _ => format!("{}{} PM", hours - 12, minutes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(14, 30), "2:30 PM");
        assert_eq!(format_time(9, 0), "9 AM");
        assert_eq!(format_time(0, 0), "12 AM");
        assert_eq!(format_time(12, 5), "12:05 PM");
    }

    #[test]
    fn test_format_minutes_to_time() {
        assert_eq!(format_minutes_to_time(870), "2:30 PM");
        assert_eq!(format_minutes_to_time(540), "9 AM");
        assert_eq!(format_minutes_to_time(690), "11:30 AM");
    }

    #[test]
    fn test_format_hours_display() {
        assert_eq!(format_hours_display("12:00-15:00"), "12 PM – 3 PM");
        assert_eq!(
            format_hours_display("12:00-15:00,17:00-22:00"),
            "12 PM – 3 PM, 5 PM – 10 PM"
        );
        assert_eq!(format_hours_display("00:30-02:00"), "12:30 AM – 2 AM");
        assert_eq!(format_hours_display("closed"), "Closed");
        assert_eq!(format_hours_display(""), "Closed");
        // Single-digit hours are left as written
        assert_eq!(format_hours_display("9:00-17:30"), "9:00 – 5:30 PM");
    }

    #[test]
    fn test_format_day_label() {
        assert_eq!(format_day_label(0, "monday"), "Today");
        assert_eq!(format_day_label(1, "tuesday"), "Tomorrow");
        assert_eq!(format_day_label(2, "wednesday"), "Wednesday");
    }

    #[test]
    fn test_format_next_open_message() {
        assert_eq!(format_next_open_message(1, "friday", 720), "Tomorrow at 12 PM");
        assert_eq!(format_next_open_message(3, "sunday", 690), "Sunday at 11:30 AM");
    }
}
