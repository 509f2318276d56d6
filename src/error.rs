use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Every failure a request can produce, mapped to a status code in one place.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    /// Covers both unknown email and wrong password so the response does not
    /// reveal which one it was.
    #[error("Invalid email or password.")]
    InvalidCredentials,

    #[error("Email exists already.")]
    EmailTaken,

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Invalid CSRF token")]
    InvalidCsrf,

    #[error("Not the owner of this product")]
    NotOwner,

    #[error("{0} not found")]
    NotFound(&'static str),

    /// Unknown and expired tokens produce the same outcome.
    #[error("Invalid or expired password reset link")]
    ResetTokenInvalid,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "Invalid email or password.".to_string())
            }
            AppError::EmailTaken => (StatusCode::CONFLICT, "Email exists already.".to_string()),
            AppError::NotAuthenticated => {
                (StatusCode::UNAUTHORIZED, "Not authenticated".to_string())
            }
            AppError::InvalidCsrf => (StatusCode::FORBIDDEN, "Invalid CSRF token".to_string()),
            AppError::NotOwner => {
                (StatusCode::FORBIDDEN, "Not the owner of this product".to_string())
            }
            AppError::NotFound(what) => (StatusCode::NOT_FOUND, format!("{what} not found")),
            AppError::ResetTokenInvalid => (
                StatusCode::BAD_REQUEST,
                "Invalid or expired password reset link".to_string(),
            ),
            AppError::Database(e) => {
                tracing::error!(error = %e, "database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            AppError::Storage(e) => {
                tracing::error!(error = %e, "storage error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            AppError::Internal(e) => {
                tracing::error!(error = %e, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        (status, axum::Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn validation_maps_to_422_with_message() {
        let res = AppError::Validation("Attached file is not an image.".into()).into_response();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = axum::body::to_bytes(res.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Attached file is not an image.");
    }

    #[tokio::test]
    async fn credential_failures_share_one_message() {
        let res = AppError::InvalidCredentials.into_response();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let body = axum::body::to_bytes(res.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Invalid email or password.");
    }

    #[tokio::test]
    async fn infrastructure_failures_do_not_leak_details() {
        let res = AppError::Internal(anyhow::anyhow!("pool exhausted at 10.0.0.3")).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(res.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Internal server error");
    }

    #[test]
    fn csrf_and_ownership_fail_closed() {
        assert_eq!(
            AppError::InvalidCsrf.into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::NotOwner.into_response().status(),
            StatusCode::FORBIDDEN
        );
    }
}
