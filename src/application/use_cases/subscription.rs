use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::app_error::{AppError, AppResult, FieldErrors};
use crate::application::validators::{is_valid_price, normalize_name, parse_month_field};
use crate::domain::{
    entities::{
        month::Month,
        subscription::{NewSubscription, PeriodEnd, Subscription, SubscriptionChanges},
        subscription_filter::{DEFAULT_SCAN_LIMIT, SubscriptionFilter, Window},
    },
    overlap::billed_total,
};

// ============================================================================
// Repository Trait
// ============================================================================

#[async_trait]
pub trait SubscriptionRepoTrait: Send + Sync {
    /// Persists a validated record; the store assigns id and timestamps.
    async fn insert(&self, new: &NewSubscription) -> AppResult<Subscription>;

    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Subscription>>;

    /// Overwrites every mutable field and returns the new `updated_at`.
    /// Fails with `NotFound` when the id does not exist.
    async fn apply_update(
        &self,
        id: Uuid,
        changes: &SubscriptionChanges,
    ) -> AppResult<DateTime<Utc>>;

    /// Returns `true` when a record was removed.
    async fn delete(&self, id: Uuid) -> AppResult<bool>;

    /// Records matching `filter`, paged by `filter.limit` / `filter.offset`.
    async fn list(&self, filter: &SubscriptionFilter) -> AppResult<Vec<Subscription>>;

    /// Number of records matching `filter`, ignoring paging.
    async fn count(&self, filter: &SubscriptionFilter) -> AppResult<i64>;

    /// Billed total over `window` for records matching the owner/name
    /// predicates, computed by the store itself.
    async fn sum_for_window(&self, filter: &SubscriptionFilter, window: Window) -> AppResult<i64>;
}

// ============================================================================
// Inputs
// ============================================================================

#[derive(Debug, Clone)]
pub struct CreateSubscriptionInput {
    pub owner_id: Uuid,
    pub name: String,
    pub price: i64,
    pub start_date: String,
    pub end_date: Option<String>,
}

/// What an update does to the end month.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EndDateUpdate {
    /// Field not supplied.
    #[default]
    Keep,
    /// Make the subscription open-ended.
    Clear,
    Set(String),
}

#[derive(Debug, Clone, Default)]
pub struct UpdateSubscriptionInput {
    pub name: Option<String>,
    pub price: Option<i64>,
    pub start_date: Option<String>,
    pub end_date: EndDateUpdate,
}

/// Where `sum` is computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SumStrategy {
    /// A single aggregate query in the store.
    #[default]
    PushDown,
    /// One scan of matching records folded in process.
    ///
    /// The scan reads at most the configured scan limit. Records past it are
    /// left out of the total and a warning is logged, so this strategy only
    /// agrees with `PushDown` while fewer records match than the limit allows.
    InProcess,
}

impl FromStr for SumStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pushdown" | "push_down" | "store" => Ok(SumStrategy::PushDown),
            "in_process" | "inprocess" | "fold" => Ok(SumStrategy::InProcess),
            _ => Err(format!("Invalid sum strategy: {s}")),
        }
    }
}

// ============================================================================
// Use Cases
// ============================================================================

#[derive(Clone)]
pub struct SubscriptionUseCases {
    repo: Arc<dyn SubscriptionRepoTrait>,
    sum_strategy: SumStrategy,
    scan_limit: i64,
}

impl SubscriptionUseCases {
    pub fn new(repo: Arc<dyn SubscriptionRepoTrait>) -> Self {
        Self {
            repo,
            sum_strategy: SumStrategy::default(),
            scan_limit: DEFAULT_SCAN_LIMIT,
        }
    }

    pub fn with_sum_strategy(mut self, strategy: SumStrategy, scan_limit: i64) -> Self {
        self.sum_strategy = strategy;
        self.scan_limit = scan_limit.max(1);
        self
    }

    #[instrument(skip(self, input), fields(owner_id = %input.owner_id))]
    pub async fn create(&self, input: CreateSubscriptionInput) -> AppResult<Subscription> {
        let mut errors = FieldErrors::new();

        let name = normalize_name(&input.name);
        if name.is_none() {
            errors.add("service_name", "required, max 255 chars");
        }
        if !is_valid_price(input.price) {
            errors.add("price", "must be >= 0");
        }
        let start = parse_month_field("start_date", &input.start_date, &mut errors);
        let end = input
            .end_date
            .as_deref()
            .and_then(|raw| parse_month_field("end_date", raw, &mut errors));
        if let (Some(start), Some(end)) = (start, end) {
            check_period(start, PeriodEnd::Bounded(end), &mut errors);
        }

        if let Err(err) = errors.into_result() {
            debug!(error = %err, "Rejected subscription create");
            return Err(err);
        }
        let (Some(name), Some(start)) = (name, start) else {
            return Err(AppError::Internal("validated create input incomplete".into()));
        };

        let new = NewSubscription {
            owner_id: input.owner_id,
            name,
            price: input.price,
            start,
            end: end.into(),
        };
        self.repo.insert(&new).await
    }

    #[instrument(skip(self))]
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Subscription> {
        self.repo.get_by_id(id).await?.ok_or(AppError::NotFound)
    }

    /// Applies the supplied fields to the stored record and validates the
    /// combined result before anything is written.
    ///
    /// Concurrent updates to the same id are last-write-wins.
    #[instrument(skip(self, input))]
    pub async fn update(&self, id: Uuid, input: UpdateSubscriptionInput) -> AppResult<Subscription> {
        let existing = self.get_by_id(id).await?;
        let mut candidate = existing.changes();
        let mut errors = FieldErrors::new();

        if let Some(raw) = input.name.as_deref() {
            match normalize_name(raw) {
                Some(name) => candidate.name = name,
                None => errors.add("service_name", "required, max 255 chars"),
            }
        }
        if let Some(price) = input.price {
            if is_valid_price(price) {
                candidate.price = price;
            } else {
                errors.add("price", "must be >= 0");
            }
        }
        if let Some(raw) = input.start_date.as_deref() {
            if let Some(start) = parse_month_field("start_date", raw, &mut errors) {
                candidate.start = start;
            }
        }
        match &input.end_date {
            EndDateUpdate::Keep => {}
            EndDateUpdate::Clear => candidate.end = PeriodEnd::Open,
            EndDateUpdate::Set(raw) => {
                if let Some(end) = parse_month_field("end_date", raw, &mut errors) {
                    candidate.end = PeriodEnd::Bounded(end);
                }
            }
        }
        check_period(candidate.start, candidate.end, &mut errors);

        if let Err(err) = errors.into_result() {
            debug!(error = %err, "Rejected subscription update");
            return Err(err);
        }

        let updated_at = self.repo.apply_update(id, &candidate).await?;
        Ok(existing.with_changes(candidate, updated_at))
    }

    /// Deleting an id that does not exist succeeds, so repeated deletes agree.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        if !self.repo.delete(id).await? {
            debug!(%id, "Delete of absent subscription treated as success");
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn list(&self, filter: &SubscriptionFilter) -> AppResult<Vec<Subscription>> {
        check_window_order(filter)?;
        self.repo.list(filter).await
    }

    #[instrument(skip(self))]
    pub async fn count(&self, filter: &SubscriptionFilter) -> AppResult<i64> {
        check_window_order(filter)?;
        self.repo.count(filter).await
    }

    /// Billed total over the filter's window. Without both bounds there is
    /// no defined total and the result is `0`.
    #[instrument(skip(self))]
    pub async fn sum(&self, filter: &SubscriptionFilter) -> AppResult<i64> {
        let Some((from, to)) = filter.bounds() else {
            return Ok(0);
        };
        let window =
            Window::new(from, to).ok_or_else(|| AppError::invalid_field("from", "must be <= to"))?;

        match self.sum_strategy {
            SumStrategy::PushDown => self.repo.sum_for_window(filter, window).await,
            SumStrategy::InProcess => {
                // One extra row tells a full page apart from a truncated one.
                let scan = filter.for_scan(self.scan_limit.saturating_add(1));
                let mut records = self.repo.list(&scan).await?;
                if records.len() as i64 > self.scan_limit {
                    records.truncate(self.scan_limit as usize);
                    warn!(
                        limit = self.scan_limit,
                        "Sum scan truncated; total omits records past the limit"
                    );
                }
                Ok(billed_total(&records, window)?)
            }
        }
    }
}

fn check_period(start: Month, end: PeriodEnd, errors: &mut FieldErrors) {
    if !end.reaches(start) {
        errors.add("end_date", "must be >= start_date");
    }
}

fn check_window_order(filter: &SubscriptionFilter) -> AppResult<()> {
    match filter.bounds() {
        Some((from, to)) if from > to => Err(AppError::invalid_field("from", "must be <= to")),
        _ => Ok(()),
    }
}
