//! Test data factories for creating valid test fixtures.
//!
//! Each factory function creates a complete, valid object with sensible defaults.
//! Use the closure parameter to override specific fields as needed.

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use crate::domain::entities::{
    month::Month,
    subscription::{PeriodEnd, Subscription},
};

/// Parse a `MM-YYYY` literal, panicking on typos in test code.
pub fn month(text: &str) -> Month {
    Month::parse(text).unwrap_or_else(|err| panic!("bad test month {text:?}: {err}"))
}

/// Create a test subscription with sensible defaults.
pub fn create_test_subscription(overrides: impl FnOnce(&mut Subscription)) -> Subscription {
    let mut subscription = Subscription {
        id: Uuid::new_v4(),
        owner_id: Uuid::new_v4(),
        name: "Netflix".to_string(),
        price: 499,
        start: month("07-2025"),
        end: PeriodEnd::Open,
        created_at: test_datetime(),
        updated_at: test_datetime(),
    };
    overrides(&mut subscription);
    subscription
}

/// Returns a consistent test datetime (2025-07-01 12:00:00 UTC).
pub fn test_datetime() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 7, 1, 12, 0, 0).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_subscription_with_defaults() {
        let sub = create_test_subscription(|_| {});
        assert_eq!(sub.name, "Netflix");
        assert_eq!(sub.price, 499);
        assert_eq!(sub.start, month("07-2025"));
        assert!(sub.end.is_open());
    }

    #[test]
    fn test_create_subscription_with_overrides() {
        let owner = Uuid::new_v4();
        let sub = create_test_subscription(|s| {
            s.owner_id = owner;
            s.price = 299;
            s.end = PeriodEnd::Bounded(month("12-2025"));
        });
        assert_eq!(sub.owner_id, owner);
        assert_eq!(sub.price, 299);
        assert_eq!(sub.end.month(), Some(month("12-2025")));
    }
}
