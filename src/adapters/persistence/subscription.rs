use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::{PgRow, Postgres};
use sqlx::{QueryBuilder, Row};
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::subscription::SubscriptionRepoTrait,
    domain::entities::{
        month::Month,
        subscription::{NewSubscription, PeriodEnd, Subscription, SubscriptionChanges},
        subscription_filter::{SubscriptionFilter, Window},
    },
};

const SELECT_COLS: &str =
    "id, user_id, service_name, price, start_date, end_date, created_at, updated_at";

fn month_from_column(date: NaiveDate) -> AppResult<Month> {
    Month::from_date(date).map_err(|err| {
        tracing::error!(error = %err, %date, "Stored date is outside the month range");
        AppError::Internal("Corrupt subscription period".into())
    })
}

fn row_to_subscription(row: PgRow) -> AppResult<Subscription> {
    let start: NaiveDate = row.try_get("start_date")?;
    let end: Option<NaiveDate> = row.try_get("end_date")?;
    Ok(Subscription {
        id: row.try_get("id")?,
        owner_id: row.try_get("user_id")?,
        name: row.try_get("service_name")?,
        price: row.try_get("price")?,
        start: month_from_column(start)?,
        end: end.map(month_from_column).transpose()?.into(),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn end_column(end: &PeriodEnd) -> Option<NaiveDate> {
    end.month().map(NaiveDate::from)
}

/// Pushes the conjunctive filter predicates onto a builder that already ends
/// in a `WHERE` clause with at least one condition.
fn push_subscription_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &SubscriptionFilter) {
    if let Some(owner_id) = filter.owner_id {
        builder.push(" AND user_id = ").push_bind(owner_id);
    }
    if let Some(name) = &filter.name {
        builder.push(" AND service_name = ").push_bind(name.clone());
    }
    if let Some(to) = filter.window_to {
        builder
            .push(" AND start_date <= ")
            .push_bind(NaiveDate::from(to));
    }
    if let Some(from) = filter.window_from {
        builder
            .push(" AND (end_date IS NULL OR end_date >= ")
            .push_bind(NaiveDate::from(from))
            .push(")");
    }
}

/// Postgres renders an exact NUMERIC total; anything outside `i64` is an overflow.
fn parse_total(text: &str) -> AppResult<i64> {
    text.parse::<i64>().map_err(|_| {
        tracing::warn!(total = %text, "Billed total exceeds the integer range");
        AppError::Overflow
    })
}

#[async_trait]
impl SubscriptionRepoTrait for PostgresPersistence {
    async fn insert(&self, new: &NewSubscription) -> AppResult<Subscription> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO subscriptions (id, user_id, service_name, price, start_date, end_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(Uuid::new_v4())
        .bind(new.owner_id)
        .bind(&new.name)
        .bind(new.price)
        .bind(NaiveDate::from(new.start))
        .bind(end_column(&new.end))
        .fetch_one(self.pool())
        .await
        .map_err(AppError::from)?;

        row_to_subscription(row)
    }

    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Subscription>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM subscriptions WHERE id = $1",
            SELECT_COLS
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?;

        row.map(row_to_subscription).transpose()
    }

    async fn apply_update(
        &self,
        id: Uuid,
        changes: &SubscriptionChanges,
    ) -> AppResult<DateTime<Utc>> {
        let row = sqlx::query(
            r#"
            UPDATE subscriptions
            SET service_name = $2, price = $3, start_date = $4, end_date = $5,
                updated_at = now()
            WHERE id = $1
            RETURNING updated_at
            "#,
        )
        .bind(id)
        .bind(&changes.name)
        .bind(changes.price)
        .bind(NaiveDate::from(changes.start))
        .bind(end_column(&changes.end))
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?
        .ok_or(AppError::NotFound)?;

        Ok(row.try_get("updated_at")?)
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM subscriptions WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(AppError::from)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, filter: &SubscriptionFilter) -> AppResult<Vec<Subscription>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {} FROM subscriptions WHERE TRUE",
            SELECT_COLS
        ));
        push_subscription_filters(&mut builder, filter);
        builder
            .push(" ORDER BY created_at, id LIMIT ")
            .push_bind(filter.limit)
            .push(" OFFSET ")
            .push_bind(filter.offset);

        let rows = builder
            .build()
            .fetch_all(self.pool())
            .await
            .map_err(AppError::from)?;

        rows.into_iter().map(row_to_subscription).collect()
    }

    async fn count(&self, filter: &SubscriptionFilter) -> AppResult<i64> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM subscriptions WHERE TRUE");
        push_subscription_filters(&mut builder, filter);

        let total: i64 = builder
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(AppError::from)?;
        Ok(total)
    }

    async fn sum_for_window(&self, filter: &SubscriptionFilter, window: Window) -> AppResult<i64> {
        let from = NaiveDate::from(window.from());
        let to = NaiveDate::from(window.to());

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "WITH clipped AS (SELECT price, GREATEST(start_date, ",
        );
        builder
            .push_bind(from)
            .push(") AS lo, LEAST(COALESCE(end_date, ")
            .push_bind(to)
            .push("), ")
            .push_bind(to)
            .push(") AS hi FROM subscriptions WHERE TRUE");
        push_subscription_filters(&mut builder, filter);
        builder.push(
            ") SELECT COALESCE(SUM(price::numeric * ( \
               (EXTRACT(YEAR FROM hi)::bigint - EXTRACT(YEAR FROM lo)::bigint) * 12 \
               + EXTRACT(MONTH FROM hi)::bigint - EXTRACT(MONTH FROM lo)::bigint + 1)), 0)::text \
             FROM clipped WHERE lo <= hi",
        );

        let total: String = builder
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(AppError::from)?;

        parse_total(&total)
    }
}
