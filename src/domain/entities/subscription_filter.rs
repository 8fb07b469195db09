use uuid::Uuid;

use super::{month::Month, subscription::Subscription};

pub const DEFAULT_LIST_LIMIT: i64 = 100;
pub const MAX_LIST_LIMIT: i64 = 1000;
/// Page size used when loading records for an in-process sum.
pub const DEFAULT_SCAN_LIMIT: i64 = 1000;

/// Optional predicates combined conjunctively. Listing, counting and summing
/// all consume the same filter so their predicate semantics cannot drift.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionFilter {
    pub owner_id: Option<Uuid>,
    /// Exact match on the record name.
    pub name: Option<String>,
    pub window_from: Option<Month>,
    pub window_to: Option<Month>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for SubscriptionFilter {
    fn default() -> Self {
        Self {
            owner_id: None,
            name: None,
            window_from: None,
            window_to: None,
            limit: DEFAULT_LIST_LIMIT,
            offset: 0,
        }
    }
}

impl SubscriptionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn owner(mut self, owner_id: Uuid) -> Self {
        self.owner_id = Some(owner_id);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn from(mut self, month: Month) -> Self {
        self.window_from = Some(month);
        self
    }

    pub fn to(mut self, month: Month) -> Self {
        self.window_to = Some(month);
        self
    }

    /// Clamps into `1..=MAX_LIST_LIMIT`; non-positive values fall back to the default.
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = if limit <= 0 {
            DEFAULT_LIST_LIMIT
        } else {
            limit.min(MAX_LIST_LIMIT)
        };
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = offset.max(0);
        self
    }

    /// Same predicates, paged for the aggregation scan.
    pub fn for_scan(&self, scan_limit: i64) -> Self {
        Self {
            limit: scan_limit.max(1),
            offset: 0,
            ..self.clone()
        }
    }

    /// Both bounds, when present. Ordering is not checked here.
    pub fn bounds(&self) -> Option<(Month, Month)> {
        Some((self.window_from?, self.window_to?))
    }

    /// Whether `record` satisfies every predicate, ignoring paging.
    ///
    /// A record `[start, end]` meets an open upper query bound `(-inf, to]` iff
    /// `start <= to`, and an open lower bound `[from, inf)` iff `end` is open or
    /// `end >= from`; with both bounds present both conditions must hold.
    pub fn matches(&self, record: &Subscription) -> bool {
        if self.owner_id.is_some_and(|owner| owner != record.owner_id) {
            return false;
        }
        if self.name.as_deref().is_some_and(|name| name != record.name) {
            return false;
        }
        if self.window_to.is_some_and(|to| record.start > to) {
            return false;
        }
        if self.window_from.is_some_and(|from| !record.end.reaches(from)) {
            return false;
        }
        true
    }
}

/// A closed `[from, to]` range of months with `from <= to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    from: Month,
    to: Month,
}

impl Window {
    /// `None` when `from` is after `to`.
    pub fn new(from: Month, to: Month) -> Option<Self> {
        (from <= to).then_some(Self { from, to })
    }

    pub fn from(&self) -> Month {
        self.from
    }

    pub fn to(&self) -> Month {
        self.to
    }

    pub fn len_months(&self) -> i64 {
        self.from.months_until(self.to) + 1
    }
}
