use axum::Json;
use utoipa::OpenApi;

use crate::adapters::http::{app_error_impl::ErrorBody, routes::subscriptions};
use crate::domain::entities::subscription::Subscription;

pub const OPENAPI_JSON_PATH: &str = "/swagger/doc.json";

#[derive(OpenApi)]
#[openapi(
    paths(
        subscriptions::create_subscription,
        subscriptions::list_subscriptions,
        subscriptions::sum_subscriptions,
        subscriptions::get_subscription,
        subscriptions::update_subscription,
        subscriptions::delete_subscription,
    ),
    components(schemas(
        Subscription,
        subscriptions::CreateSubscriptionPayload,
        subscriptions::UpdateSubscriptionPayload,
        subscriptions::TotalResponse,
        ErrorBody,
    )),
    tags((name = "subscriptions", description = "Subscription records and billed totals")),
    info(
        title = "Subscription ledger API",
        description = "Stores subscriptions and sums what they bill over a month window"
    )
)]
pub struct ApiDoc;

/// GET /swagger/doc.json
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
