use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::{HeaderName, StatusCode},
    response::IntoResponse,
    routing::get,
};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult, FieldErrors},
    application::{
        use_cases::subscription::{CreateSubscriptionInput, EndDateUpdate, UpdateSubscriptionInput},
        validators::parse_month_field,
    },
    adapters::http::app_error_impl::ErrorBody,
    domain::entities::{subscription::Subscription, subscription_filter::SubscriptionFilter},
};

pub const TOTAL_COUNT_HEADER: HeaderName = HeaderName::from_static("x-total-count");

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_subscriptions).post(create_subscription))
        .route("/sum", get(sum_subscriptions))
        .route(
            "/{id}",
            get(get_subscription)
                .put(update_subscription)
                .patch(update_subscription)
                .delete(delete_subscription),
        )
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize, ToSchema)]
pub struct CreateSubscriptionPayload {
    user_id: Uuid,
    #[schema(example = "Yandex Plus")]
    service_name: String,
    #[schema(minimum = 0, example = 400)]
    price: i64,
    #[schema(example = "07-2025")]
    start_date: String,
    #[serde(default)]
    #[schema(example = "12-2025")]
    end_date: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateSubscriptionPayload {
    #[serde(default)]
    service_name: Option<String>,
    #[serde(default)]
    price: Option<i64>,
    #[serde(default)]
    start_date: Option<String>,
    /// Outer `None`: field absent. `Some(None)`: explicit `null`.
    #[serde(default, deserialize_with = "present_or_null")]
    #[schema(value_type = Option<String>)]
    end_date: Option<Option<String>>,
}

fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

impl From<UpdateSubscriptionPayload> for UpdateSubscriptionInput {
    fn from(payload: UpdateSubscriptionPayload) -> Self {
        let end_date = match payload.end_date {
            None => EndDateUpdate::Keep,
            Some(None) => EndDateUpdate::Clear,
            Some(Some(raw)) if raw.is_empty() => EndDateUpdate::Clear,
            Some(Some(raw)) => EndDateUpdate::Set(raw),
        };
        UpdateSubscriptionInput {
            name: payload.service_name,
            price: payload.price,
            start_date: payload.start_date,
            end_date,
        }
    }
}

/// Raw query parameters; empty values count as absent.
#[derive(Deserialize, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FilterParams {
    /// Owner uuid
    user_id: Option<String>,
    /// Exact service name
    service_name: Option<String>,
    /// First month of the window, `MM-YYYY`
    #[param(example = "01-2025")]
    from: Option<String>,
    /// Last month of the window, `MM-YYYY`
    #[param(example = "12-2025")]
    to: Option<String>,
    /// Page size, default 100, at most 1000
    limit: Option<String>,
    /// Records to skip, default 0
    offset: Option<String>,
}

impl FilterParams {
    fn into_filter(self) -> AppResult<SubscriptionFilter> {
        let mut errors = FieldErrors::new();
        let mut filter = SubscriptionFilter::new();

        if let Some(raw) = non_empty(self.user_id) {
            match Uuid::parse_str(&raw) {
                Ok(owner_id) => filter = filter.owner(owner_id),
                Err(_) => errors.add("user_id", "invalid uuid"),
            }
        }
        if let Some(name) = non_empty(self.service_name) {
            filter = filter.name(name);
        }
        if let Some(raw) = non_empty(self.from) {
            if let Some(from) = parse_month_field("from", &raw, &mut errors) {
                filter = filter.from(from);
            }
        }
        if let Some(raw) = non_empty(self.to) {
            if let Some(to) = parse_month_field("to", &raw, &mut errors) {
                filter = filter.to(to);
            }
        }
        errors.into_result()?;

        // Unparsable paging values fall back to the defaults.
        if let Some(limit) = non_empty(self.limit).and_then(|raw| raw.parse::<i64>().ok()) {
            filter = filter.limit(limit);
        }
        if let Some(offset) = non_empty(self.offset).and_then(|raw| raw.parse::<i64>().ok()) {
            filter = filter.offset(offset);
        }
        Ok(filter)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::invalid_field("id", "invalid uuid"))
}

fn body_error(rejection: JsonRejection) -> AppError {
    AppError::invalid_field("body", rejection.body_text())
}

#[derive(Serialize, ToSchema)]
pub struct TotalResponse {
    total: i64,
}

// ============================================================================
// Handlers
// ============================================================================

#[utoipa::path(
    post,
    path = "/api/subscriptions",
    tag = "subscriptions",
    request_body = CreateSubscriptionPayload,
    responses(
        (status = 201, description = "Subscription created", body = Subscription),
        (status = 400, description = "Invalid body or fields", body = ErrorBody),
        (status = 500, description = "Storage failure", body = ErrorBody)
    )
)]
pub async fn create_subscription(
    State(app_state): State<AppState>,
    payload: Result<Json<CreateSubscriptionPayload>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(payload) = payload.map_err(body_error)?;

    let created = app_state
        .subscription_use_cases
        .create(CreateSubscriptionInput {
            owner_id: payload.user_id,
            name: payload.service_name,
            price: payload.price,
            start_date: payload.start_date,
            end_date: non_empty(payload.end_date),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// The `X-Total-Count` header carries the unpaged match count.
#[utoipa::path(
    get,
    path = "/api/subscriptions",
    tag = "subscriptions",
    params(FilterParams),
    responses(
        (status = 200, description = "One page of matching subscriptions", body = [Subscription],
            headers(("x-total-count" = i64, description = "Match count before paging"))),
        (status = 400, description = "Invalid query values", body = ErrorBody)
    )
)]
pub async fn list_subscriptions(
    State(app_state): State<AppState>,
    Query(params): Query<FilterParams>,
) -> AppResult<impl IntoResponse> {
    let filter = params.into_filter()?;
    let use_cases = &app_state.subscription_use_cases;

    let total = use_cases.count(&filter).await?;
    let subscriptions = use_cases.list(&filter).await?;

    Ok(([(TOTAL_COUNT_HEADER, total.to_string())], Json(subscriptions)))
}

#[utoipa::path(
    get,
    path = "/api/subscriptions/sum",
    tag = "subscriptions",
    params(FilterParams),
    responses(
        (status = 200, description = "Billed total over the window, 0 without both bounds", body = TotalResponse),
        (status = 400, description = "Invalid query values", body = ErrorBody),
        (status = 422, description = "Total exceeds the 64-bit range", body = ErrorBody)
    )
)]
pub async fn sum_subscriptions(
    State(app_state): State<AppState>,
    Query(params): Query<FilterParams>,
) -> AppResult<impl IntoResponse> {
    let filter = params.into_filter()?;
    let total = app_state.subscription_use_cases.sum(&filter).await?;
    Ok(Json(TotalResponse { total }))
}

#[utoipa::path(
    get,
    path = "/api/subscriptions/{id}",
    tag = "subscriptions",
    params(("id" = Uuid, Path, description = "Subscription id")),
    responses(
        (status = 200, description = "The subscription", body = Subscription),
        (status = 400, description = "Malformed id", body = ErrorBody),
        (status = 404, description = "No such subscription", body = ErrorBody)
    )
)]
pub async fn get_subscription(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let id = parse_id(&id)?;
    let subscription = app_state.subscription_use_cases.get_by_id(id).await?;
    Ok(Json(subscription))
}

/// Absent fields are kept; `end_date: null` or `""` makes the subscription open-ended.
#[utoipa::path(
    method(put, patch),
    path = "/api/subscriptions/{id}",
    tag = "subscriptions",
    params(("id" = Uuid, Path, description = "Subscription id")),
    request_body = UpdateSubscriptionPayload,
    responses(
        (status = 200, description = "The updated subscription", body = Subscription),
        (status = 400, description = "Invalid body or fields", body = ErrorBody),
        (status = 404, description = "No such subscription", body = ErrorBody)
    )
)]
pub async fn update_subscription(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateSubscriptionPayload>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let id = parse_id(&id)?;
    let Json(payload) = payload.map_err(body_error)?;

    let updated = app_state
        .subscription_use_cases
        .update(id, payload.into())
        .await?;
    Ok(Json(updated))
}

#[utoipa::path(
    delete,
    path = "/api/subscriptions/{id}",
    tag = "subscriptions",
    params(("id" = Uuid, Path, description = "Subscription id")),
    responses(
        (status = 204, description = "Deleted, or already absent"),
        (status = 400, description = "Malformed id", body = ErrorBody)
    )
)]
pub async fn delete_subscription(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let id = parse_id(&id)?;
    app_state.subscription_use_cases.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
