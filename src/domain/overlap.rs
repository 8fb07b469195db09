//! Billed cost of subscriptions over a month window.
//!
//! For each record the validity interval is clipped to the window,
//! `s = max(start, from)` and `e = min(end or to, to)`. A record with
//! `e < s` contributes nothing; otherwise it contributes
//! `price * (months_between(s, e) + 1)`. Every multiplication and addition
//! is checked so an oversized total surfaces as [`OverflowError`] instead of
//! wrapping.

use thiserror::Error;

use crate::domain::entities::{
    month::months_between,
    subscription::Subscription,
    subscription_filter::Window,
};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("billed total exceeds the 64-bit integer range")]
pub struct OverflowError;

/// Inclusive count of months the record is billed for inside `window`.
pub fn overlap_months(record: &Subscription, window: Window) -> i64 {
    let start = record.start.max(window.from());
    let end = record.end.clip_to(window.to());
    if end < start {
        return 0;
    }
    months_between(start, end) + 1
}

/// `price * overlap_months`, checked.
pub fn contribution(record: &Subscription, window: Window) -> Result<i64, OverflowError> {
    record
        .price
        .checked_mul(overlap_months(record, window))
        .ok_or(OverflowError)
}

/// Sum of contributions over an already filtered record set.
pub fn billed_total<'a, I>(records: I, window: Window) -> Result<i64, OverflowError>
where
    I: IntoIterator<Item = &'a Subscription>,
{
    records.into_iter().try_fold(0i64, |total, record| {
        total
            .checked_add(contribution(record, window)?)
            .ok_or(OverflowError)
    })
}
