use crate::app_error::{AppError, ErrorCode, FieldErrors};
use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use utoipa::ToSchema;

/// Body of every non-2xx response.
#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    #[schema(example = "VALIDATION_FAILED")]
    pub code: &'static str,
    pub message: String,
    /// Field name to reason, present on validation failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub fields: Option<FieldErrors>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the error before it gets converted into a status response.
        match &self {
            AppError::Database(_) | AppError::Internal(_) => {
                tracing::error!(error = ?self, "Request failed")
            }
            _ => tracing::debug!(error = %self, "Request rejected"),
        }

        match self {
            AppError::Database(_) => error_resp(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::DatabaseError,
                "database operation failed",
                None,
            ),
            AppError::Validation(fields) => error_resp(
                StatusCode::BAD_REQUEST,
                ErrorCode::ValidationFailed,
                "validation failed",
                Some(fields),
            ),
            AppError::NotFound => {
                error_resp(StatusCode::NOT_FOUND, ErrorCode::NotFound, "not found", None)
            }
            AppError::Overflow => error_resp(
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorCode::Overflow,
                "billed total exceeds the representable range",
                None,
            ),
            AppError::Internal(_) => error_resp(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::InternalError,
                "internal error",
                None,
            ),
        }
    }
}

fn error_resp(
    status: StatusCode,
    code: ErrorCode,
    message: &str,
    fields: Option<FieldErrors>,
) -> Response {
    let body = ErrorBody {
        code: code.as_str(),
        message: message.to_string(),
        fields,
    };
    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_per_variant() {
        let cases = [
            (AppError::Database("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (AppError::invalid_field("price", "must be >= 0"), StatusCode::BAD_REQUEST),
            (AppError::NotFound, StatusCode::NOT_FOUND),
            (AppError::Overflow, StatusCode::UNPROCESSABLE_ENTITY),
            (AppError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    async fn body_of(err: AppError) -> serde_json::Value {
        let bytes = axum::body::to_bytes(err.into_response().into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn fields_only_present_on_validation_errors() {
        let body = body_of(AppError::invalid_field("price", "must be >= 0")).await;
        assert_eq!(body["code"], "VALIDATION_FAILED");
        assert_eq!(body["fields"]["price"], "must be >= 0");

        let body = body_of(AppError::NotFound).await;
        assert_eq!(body["code"], "NOT_FOUND");
        assert!(body.get("fields").is_none());
    }
}
