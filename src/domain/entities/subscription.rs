use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::month::Month;

/// Inclusive end of a subscription's validity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeriodEnd {
    Bounded(Month),
    /// Still active; overlaps any upper bound it is queried with.
    Open,
}

impl PeriodEnd {
    pub fn month(&self) -> Option<Month> {
        match self {
            PeriodEnd::Bounded(month) => Some(*month),
            PeriodEnd::Open => None,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, PeriodEnd::Open)
    }

    /// The effective end when capped by `cap`.
    pub fn clip_to(&self, cap: Month) -> Month {
        match self {
            PeriodEnd::Bounded(month) => (*month).min(cap),
            PeriodEnd::Open => cap,
        }
    }

    /// Whether this end reaches at least `month`.
    pub fn reaches(&self, month: Month) -> bool {
        match self {
            PeriodEnd::Bounded(end) => *end >= month,
            PeriodEnd::Open => true,
        }
    }
}

impl From<Option<Month>> for PeriodEnd {
    fn from(value: Option<Month>) -> Self {
        value.map_or(PeriodEnd::Open, PeriodEnd::Bounded)
    }
}

impl Serialize for PeriodEnd {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.month().serialize(serializer)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Subscription {
    pub id: Uuid,
    #[serde(rename = "user_id")]
    pub owner_id: Uuid,
    #[serde(rename = "service_name")]
    pub name: String,
    /// Monthly price in the smallest whole currency unit.
    pub price: i64,
    #[serde(rename = "start_date")]
    #[schema(value_type = String, example = "07-2025")]
    pub start: Month,
    /// Absent while the subscription is still active.
    #[serde(rename = "end_date", skip_serializing_if = "PeriodEnd::is_open")]
    #[schema(value_type = Option<String>, example = "12-2025")]
    pub end: PeriodEnd,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    pub fn changes(&self) -> SubscriptionChanges {
        SubscriptionChanges {
            name: self.name.clone(),
            price: self.price,
            start: self.start,
            end: self.end,
        }
    }

    pub fn with_changes(&self, changes: SubscriptionChanges, updated_at: DateTime<Utc>) -> Self {
        Self {
            name: changes.name,
            price: changes.price,
            start: changes.start,
            end: changes.end,
            updated_at,
            ..self.clone()
        }
    }
}

/// A validated record that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubscription {
    pub owner_id: Uuid,
    pub name: String,
    pub price: i64,
    pub start: Month,
    pub end: PeriodEnd,
}

/// The full set of mutable fields after an update has been applied and validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionChanges {
    pub name: String,
    pub price: i64,
    pub start: Month,
    pub end: PeriodEnd,
}
