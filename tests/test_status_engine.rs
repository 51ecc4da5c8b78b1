//! Integration tests for the hours status engine
//!
//! Hours are read the way the site reads them: composed from the bundled
//! content tree, then deserialized into `RestaurantHours`.

use chrono::{NaiveDate, NaiveDateTime};
use restaurant_content::{
    check_is_open, current_day_hours, next_open_time, restaurant_status, Environment, Manifest,
    ModuleComposer, RestaurantHours,
};

/// 2024-01-15 is a Monday
fn at(day_of_month: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, day_of_month)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

async fn bundled_hours() -> RestaurantHours {
    let manifest = Manifest::load("config/content/manifest.json").await.unwrap();
    let composition = ModuleComposer::new("config/content")
        .compose(&manifest, "restaurant/info", Environment::Prod)
        .await
        .unwrap();
    assert!(composition.warnings.is_empty(), "{:?}", composition.warnings);
    serde_json::from_value(composition.data["hours"].clone()).unwrap()
}

#[tokio::test]
async fn test_bundled_hours_are_detailed() {
    let hours = bundled_hours().await;
    assert!(hours.is_detailed());
}

#[tokio::test]
async fn test_open_during_lunch_service() {
    let hours = bundled_hours().await;
    let status = restaurant_status(&hours, &at(15, 13, 0));

    assert!(status.is_open);
    assert_eq!(
        status.current_hours.as_deref(),
        Some("Kitchen: 12 PM – 3 PM, 5 PM – 10 PM")
    );
    assert_eq!(status.next_open_time, None);
}

#[tokio::test]
async fn test_closed_between_sittings() {
    let hours = bundled_hours().await;
    let status = restaurant_status(&hours, &at(15, 16, 0));

    assert!(!status.is_open);
    // Today's first opening has passed, so the next one is tomorrow's
    assert_eq!(status.next_open_time.as_deref(), Some("Tomorrow at 12 PM"));
}

#[tokio::test]
async fn test_bar_runs_past_midnight() {
    let hours = bundled_hours().await;
    // Saturday 00:30: the bar's 12:00-01:00 range wraps
    assert!(check_is_open(&hours, &at(20, 0, 30)));
    assert!(!check_is_open(&hours, &at(20, 1, 30)));
}

#[tokio::test]
async fn test_sunday_evening() {
    let hours = bundled_hours().await;
    let now = at(21, 20, 0);

    assert!(!check_is_open(&hours, &now));
    assert_eq!(current_day_hours(&hours, &now).as_deref(), Some("Bar: 12 PM – 6 PM"));
    assert_eq!(next_open_time(&hours, &now).as_deref(), Some("Tomorrow at 12 PM"));
}

#[test]
fn test_legacy_hours_from_json() {
    let hours: RestaurantHours = serde_json::from_str(
        r#"{
            "monday": "11:30 AM - 10:00 PM",
            "tuesday": "11:30 AM - 10:00 PM",
            "wednesday": "Closed",
            "thursday": "11:30 AM - 10:00 PM",
            "friday": "11:30 AM - 11:00 PM",
            "saturday": "10:00 AM - 11:00 PM",
            "sunday": "Closed"
        }"#,
    )
    .unwrap();

    assert!(check_is_open(&hours, &at(15, 11, 30)));
    assert!(check_is_open(&hours, &at(15, 22, 0)));
    assert!(!check_is_open(&hours, &at(15, 22, 1)));

    // Tuesday night: Wednesday is closed, Thursday opens next
    let status = restaurant_status(&hours, &at(16, 23, 0));
    assert!(!status.is_open);
    assert_eq!(status.next_open_time.as_deref(), Some("Thursday at 11:30 AM"));

    // Wednesday itself is closed all day
    let status = restaurant_status(&hours, &at(17, 12, 0));
    assert!(!status.is_open);
    assert_eq!(status.current_hours.as_deref(), Some("Closed"));
}

#[test]
fn test_bar_only_detailed_hours() {
    let hours: RestaurantHours =
        serde_json::from_str(r#"{"bar": {"monday": "17:00-23:00"}}"#).unwrap();
    assert!(check_is_open(&hours, &at(15, 18, 0)));
    assert!(!check_is_open(&hours, &at(15, 10, 0)));
}

#[test]
fn test_never_open() {
    let hours = RestaurantHours::legacy(
        ["sunday", "monday", "tuesday", "wednesday", "thursday", "friday", "saturday"]
            .into_iter()
            .map(|day| (day, "Closed")),
    );
    let status = restaurant_status(&hours, &at(15, 12, 0));
    assert!(!status.is_open);
    assert_eq!(status.next_open_time, None);
}
