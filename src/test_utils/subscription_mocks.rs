//! In-memory mock implementations of the subscription store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::use_cases::subscription::SubscriptionRepoTrait,
    domain::{
        entities::{
            subscription::{NewSubscription, Subscription, SubscriptionChanges},
            subscription_filter::{SubscriptionFilter, Window},
        },
        overlap::OverflowError,
    },
};

/// In-memory implementation of SubscriptionRepoTrait for testing.
///
/// `sum_for_window` walks the window one month at a time and adds the price of
/// every record active in that month. It shares no code with the clip-and-count
/// fold in `domain::overlap`, which makes it a usable oracle for the fold.
#[derive(Default)]
pub struct InMemorySubscriptionRepo {
    pub subscriptions: Mutex<HashMap<Uuid, Subscription>>,
}

impl InMemorySubscriptionRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the repo with initial subscriptions for testing.
    pub fn with_subscriptions(subscriptions: Vec<Subscription>) -> Self {
        let map = subscriptions.into_iter().map(|s| (s.id, s)).collect();
        Self {
            subscriptions: Mutex::new(map),
        }
    }

    pub fn get(&self, id: Uuid) -> Option<Subscription> {
        self.subscriptions.lock().unwrap().get(&id).cloned()
    }

    /// Get all subscriptions in store order (for test assertions).
    pub fn get_all(&self) -> Vec<Subscription> {
        let mut all: Vec<Subscription> =
            self.subscriptions.lock().unwrap().values().cloned().collect();
        all.sort_by_key(|s| (s.created_at, s.id));
        all
    }

    fn matching(&self, filter: &SubscriptionFilter) -> Vec<Subscription> {
        self.get_all()
            .into_iter()
            .filter(|s| filter.matches(s))
            .collect()
    }
}

/// Month-by-month billed total over `records`, ignoring the filter's window
/// bounds in favour of `window`.
pub fn month_by_month_total(
    records: &[Subscription],
    filter: &SubscriptionFilter,
    window: Window,
) -> Result<i64, OverflowError> {
    let mut total: i64 = 0;
    let mut current = Some(window.from());
    while let Some(month) = current.filter(|m| *m <= window.to()) {
        for record in records {
            let owner_ok = filter.owner_id.is_none_or(|o| o == record.owner_id);
            let name_ok = filter.name.as_deref().is_none_or(|n| n == record.name);
            let active = record.start <= month && record.end.reaches(month);
            if owner_ok && name_ok && active {
                total = total.checked_add(record.price).ok_or(OverflowError)?;
            }
        }
        current = month.succ();
    }
    Ok(total)
}

#[async_trait]
impl SubscriptionRepoTrait for InMemorySubscriptionRepo {
    async fn insert(&self, new: &NewSubscription) -> AppResult<Subscription> {
        let now = Utc::now();
        let subscription = Subscription {
            id: Uuid::new_v4(),
            owner_id: new.owner_id,
            name: new.name.clone(),
            price: new.price,
            start: new.start,
            end: new.end,
            created_at: now,
            updated_at: now,
        };
        self.subscriptions
            .lock()
            .unwrap()
            .insert(subscription.id, subscription.clone());
        Ok(subscription)
    }

    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Subscription>> {
        Ok(self.get(id))
    }

    async fn apply_update(
        &self,
        id: Uuid,
        changes: &SubscriptionChanges,
    ) -> AppResult<DateTime<Utc>> {
        let mut subscriptions = self.subscriptions.lock().unwrap();
        let existing = subscriptions.get_mut(&id).ok_or(AppError::NotFound)?;
        let now = Utc::now();
        *existing = existing.with_changes(changes.clone(), now);
        Ok(now)
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.subscriptions.lock().unwrap().remove(&id).is_some())
    }

    async fn list(&self, filter: &SubscriptionFilter) -> AppResult<Vec<Subscription>> {
        Ok(self
            .matching(filter)
            .into_iter()
            .skip(filter.offset.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .collect())
    }

    async fn count(&self, filter: &SubscriptionFilter) -> AppResult<i64> {
        Ok(self.matching(filter).len() as i64)
    }

    async fn sum_for_window(&self, filter: &SubscriptionFilter, window: Window) -> AppResult<i64> {
        Ok(month_by_month_total(&self.get_all(), filter, window)?)
    }
}

/// A store whose every call fails, for error propagation tests.
pub struct FailingSubscriptionRepo;

fn store_down<T>() -> AppResult<T> {
    Err(AppError::Database("store unavailable".into()))
}

#[async_trait]
impl SubscriptionRepoTrait for FailingSubscriptionRepo {
    async fn insert(&self, _new: &NewSubscription) -> AppResult<Subscription> {
        store_down()
    }

    async fn get_by_id(&self, _id: Uuid) -> AppResult<Option<Subscription>> {
        store_down()
    }

    async fn apply_update(
        &self,
        _id: Uuid,
        _changes: &SubscriptionChanges,
    ) -> AppResult<DateTime<Utc>> {
        store_down()
    }

    async fn delete(&self, _id: Uuid) -> AppResult<bool> {
        store_down()
    }

    async fn list(&self, _filter: &SubscriptionFilter) -> AppResult<Vec<Subscription>> {
        store_down()
    }

    async fn count(&self, _filter: &SubscriptionFilter) -> AppResult<i64> {
        store_down()
    }

    async fn sum_for_window(&self, _filter: &SubscriptionFilter, _window: Window) -> AppResult<i64> {
        store_down()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::subscription::PeriodEnd;
    use crate::domain::overlap::billed_total;
    use crate::test_utils::{create_test_subscription, month};
    use proptest::prelude::*;

    #[tokio::test]
    async fn test_insert_assigns_identity() {
        let repo = InMemorySubscriptionRepo::new();
        let new = NewSubscription {
            owner_id: Uuid::new_v4(),
            name: "Netflix".into(),
            price: 499,
            start: month("07-2025"),
            end: PeriodEnd::Open,
        };
        let created = repo.insert(&new).await.unwrap();
        assert_eq!(created.created_at, created.updated_at);
        assert_eq!(repo.get(created.id), Some(created));
    }

    #[tokio::test]
    async fn test_apply_update_missing_is_not_found() {
        let repo = InMemorySubscriptionRepo::new();
        let changes = create_test_subscription(|_| {}).changes();
        let result = repo.apply_update(Uuid::new_v4(), &changes).await;
        assert!(matches!(result, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn test_delete_reports_presence() {
        let sub = create_test_subscription(|_| {});
        let id = sub.id;
        let repo = InMemorySubscriptionRepo::with_subscriptions(vec![sub]);
        assert!(repo.delete(id).await.unwrap());
        assert!(!repo.delete(id).await.unwrap());
    }

    #[test]
    fn test_month_by_month_matches_examples() {
        let subs = vec![
            create_test_subscription(|s| {
                s.start = month("01-2024");
                s.end = PeriodEnd::Open;
                s.price = 100;
            }),
            create_test_subscription(|s| {
                s.start = month("01-2025");
                s.end = PeriodEnd::Bounded(month("03-2025"));
                s.price = 50;
            }),
        ];
        let window = Window::new(month("06-2025"), month("08-2025")).unwrap();
        let total = month_by_month_total(&subs, &SubscriptionFilter::new(), window).unwrap();
        assert_eq!(total, 300);
    }

    fn arb_month() -> impl Strategy<Value = crate::domain::entities::month::Month> {
        (2020i32..=2027, 1u32..=12)
            .prop_map(|(y, m)| crate::domain::entities::month::Month::new(y, m).unwrap())
    }

    fn arb_subscription(owners: Vec<Uuid>) -> impl Strategy<Value = Subscription> {
        (
            arb_month(),
            proptest::option::of(0i64..48),
            0i64..100_000,
            0..owners.len(),
            prop_oneof![Just("Netflix"), Just("Spotify")],
        )
            .prop_map(move |(start, span, price, owner_idx, name)| {
                let end = span
                    .map(|extra| {
                        (0..extra).fold(start, |m, _| m.succ().unwrap_or(m))
                    })
                    .into();
                create_test_subscription(|s| {
                    s.owner_id = owners[owner_idx];
                    s.name = name.to_string();
                    s.start = start;
                    s.end = end;
                    s.price = price;
                })
            })
    }

    proptest! {
        #[test]
        fn fold_equals_month_by_month_total(
            subs in proptest::collection::vec(
                arb_subscription(vec![Uuid::from_u128(1), Uuid::from_u128(2)]),
                0..40,
            ),
            a in arb_month(),
            b in arb_month(),
            owner_pick in proptest::option::of(prop_oneof![Just(1u128), Just(2u128)]),
            name_pick in proptest::option::of(prop_oneof![Just("Netflix"), Just("Spotify")]),
        ) {
            let window = Window::new(a.min(b), a.max(b)).unwrap();
            let mut filter = SubscriptionFilter::new().from(window.from()).to(window.to());
            filter.owner_id = owner_pick.map(Uuid::from_u128);
            filter.name = name_pick.map(str::to_string);

            let matching: Vec<Subscription> =
                subs.iter().filter(|s| filter.matches(s)).cloned().collect();
            let folded = billed_total(&matching, window);
            let oracle = month_by_month_total(&subs, &filter, window);

            prop_assert_eq!(folded, oracle);
        }
    }
}
