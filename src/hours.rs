//! Restaurant hours data model
//!
//! Hours come from the content files in one of two shapes:
//!
//! ```json
//! { "monday": "11:30 AM - 10:00 PM", "tuesday": "Closed" }
//! ```
//!
//! ```json
//! { "kitchen": { "monday": "12:00-15:00,17:00-22:00" },
//!   "bar":     { "monday": "12:00-23:00" } }
//! ```
//!
//! The shape is decided once while deserializing; the status engine only
//! ever sees the [`RestaurantHours`] enum.

use crate::error::ContentError;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

/// Day name → hours string
pub type DayHours = HashMap<String, String>;

/// Opening hours in either supported format
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "HashMap<String, Value>")]
pub enum RestaurantHours {
    /// Flat day → 12-hour range map, already human formatted
    Legacy(DayHours),
    /// Independent kitchen and bar schedules in 24-hour format
    Detailed {
        kitchen: Option<DayHours>,
        bar: Option<DayHours>,
    },
}

impl RestaurantHours {
    /// Build legacy hours from `(day, range)` pairs
    pub fn legacy<I, K, V>(days: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        RestaurantHours::Legacy(collect_days(days))
    }

    /// Build detailed hours from optional kitchen and bar schedules
    pub fn detailed(kitchen: Option<DayHours>, bar: Option<DayHours>) -> Self {
        RestaurantHours::Detailed { kitchen, bar }
    }

    /// Whether these hours use the kitchen/bar format
    pub fn is_detailed(&self) -> bool {
        matches!(self, RestaurantHours::Detailed { .. })
    }

    /// Hours string used to find an opening time for `day`
    ///
    /// For detailed hours the kitchen entry is preferred; the bar entry is
    /// used when the kitchen has none (or an empty one).
    pub fn day_hours(&self, day: &str) -> Option<&str> {
        match self {
            RestaurantHours::Legacy(days) => days.get(day).map(String::as_str),
            RestaurantHours::Detailed { kitchen, bar } => {
                lookup(kitchen, day).or_else(|| lookup(bar, day))
            }
        }
    }
}

/// Collect `(day, range)` pairs into a [`DayHours`] map
pub fn collect_days<I, K, V>(days: I) -> DayHours
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    days.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}

/// Non-empty entry for `day` in an optional schedule
pub(crate) fn lookup<'a>(schedule: &'a Option<DayHours>, day: &str) -> Option<&'a str> {
    schedule
        .as_ref()
        .and_then(|s| s.get(day))
        .map(String::as_str)
        .filter(|h| !h.is_empty())
}

impl TryFrom<HashMap<String, Value>> for RestaurantHours {
    type Error = ContentError;

    fn try_from(mut raw: HashMap<String, Value>) -> Result<Self, Self::Error> {
        if raw.contains_key("kitchen") || raw.contains_key("bar") {
            let kitchen = raw.remove("kitchen").map(schedule_from_value).transpose()?;
            let bar = raw.remove("bar").map(schedule_from_value).transpose()?;
            return Ok(RestaurantHours::Detailed { kitchen, bar });
        }

        let mut days = DayHours::with_capacity(raw.len());
        for (day, value) in raw {
            match value {
                Value::String(range) => {
                    days.insert(day, range);
                }
                Value::Null => {}
                other => {
                    return Err(ContentError::ParseError(format!(
                        "hours for '{}' must be a string, got {}",
                        day, other
                    )));
                }
            }
        }
        Ok(RestaurantHours::Legacy(days))
    }
}

fn schedule_from_value(value: Value) -> Result<DayHours, ContentError> {
    match value {
        Value::Null => Ok(DayHours::new()),
        other => serde_json::from_value(other).map_err(|e| {
            ContentError::ParseError(format!("invalid kitchen/bar schedule: {}", e))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_legacy() {
        let hours: RestaurantHours = serde_json::from_str(
            r#"{"monday": "11:30 AM - 10:00 PM", "tuesday": "Closed"}"#,
        )
        .unwrap();
        assert!(!hours.is_detailed());
        assert_eq!(hours.day_hours("monday"), Some("11:30 AM - 10:00 PM"));
        assert_eq!(hours.day_hours("wednesday"), None);
    }

    #[test]
    fn test_deserialize_detailed() {
        let hours: RestaurantHours = serde_json::from_str(
            r#"{"kitchen": {"monday": "12:00-15:00,17:00-22:00"}, "bar": {"tuesday": "17:00-23:00"}}"#,
        )
        .unwrap();
        assert!(hours.is_detailed());
        assert_eq!(hours.day_hours("monday"), Some("12:00-15:00,17:00-22:00"));
        assert_eq!(hours.day_hours("tuesday"), Some("17:00-23:00"));
    }

    #[test]
    fn test_detailed_with_only_bar() {
        let hours: RestaurantHours =
            serde_json::from_str(r#"{"bar": {"monday": "17:00-23:00"}}"#).unwrap();
        match &hours {
            RestaurantHours::Detailed { kitchen, bar } => {
                assert!(kitchen.is_none());
                assert!(bar.is_some());
            }
            _ => panic!("expected detailed hours"),
        }
    }

    #[test]
    fn test_empty_kitchen_entry_falls_back_to_bar() {
        let hours = RestaurantHours::detailed(
            Some(collect_days([("friday", "")])),
            Some(collect_days([("friday", "18:00-02:00")])),
        );
        assert_eq!(hours.day_hours("friday"), Some("18:00-02:00"));
    }

    #[test]
    fn test_reject_non_string_legacy_entry() {
        let result: Result<RestaurantHours, _> = serde_json::from_str(r#"{"monday": 9}"#);
        assert!(result.is_err());
    }
}
