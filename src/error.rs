// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::provider::DataError;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    InvalidJson(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::InvalidJson(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::InvalidJson(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::InternalServerError(msg)
            | ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::InvalidJson(_) => "INVALID_JSON",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// `{ "error": { "message", "code" } }`
    pub fn to_json(&self) -> Value {
        json!({
            "error": {
                "message": self.message(),
                "code": self.error_code(),
            }
        })
    }

    /// Map a data-access failure, logging anything the client will only see as a 5xx.
    pub fn from_data(err: DataError, resource: &str) -> Self {
        match err {
            DataError::NotFound(msg) => ApiError::not_found(msg),
            DataError::PermissionDenied(msg) => ApiError::forbidden(msg),
            DataError::Conflict(msg) => ApiError::conflict(msg),
            DataError::Validation(msg) => ApiError::bad_request(msg),
            DataError::Unavailable(msg) => {
                tracing::error!(resource, error = %msg, "database unavailable");
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            DataError::Internal(msg) => {
                tracing::error!(resource, error = %msg, "data provider error");
                ApiError::internal_server_error(msg)
            }
        }
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        ApiError::InvalidJson(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

impl From<DataError> for ApiError {
    fn from(err: DataError) -> Self {
        ApiError::from_data(err, "-")
    }
}

impl From<crate::resources::ResolveError> for ApiError {
    fn from(err: crate::resources::ResolveError) -> Self {
        use crate::resources::ResolveError;
        match err {
            ResolveError::InvalidKey(msg) => ApiError::bad_request(msg),
            ResolveError::NotFound(_) | ResolveError::Misconfigured(_) => ApiError::not_found(err.to_string()),
        }
    }
}

impl From<crate::stock::LocationError> for ApiError {
    fn from(err: crate::stock::LocationError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

impl From<crate::auth::AuthError> for ApiError {
    fn from(err: crate::auth::AuthError) -> Self {
        match err {
            crate::auth::AuthError::NotConfigured => {
                tracing::error!("SUPABASE_JWT_SECRET is not set; rejecting session");
                ApiError::internal_server_error(err.to_string())
            }
            _ => ApiError::unauthorized(err.to_string()),
        }
    }
}

impl From<axum::extract::rejection::JsonRejection> for ApiError {
    fn from(rejection: axum::extract::rejection::JsonRejection) -> Self {
        ApiError::invalid_json(format!("Invalid JSON body: {}", rejection.body_text()))
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_errors_map_to_statuses() {
        let cases = [
            (DataError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (DataError::PermissionDenied("x".into()), StatusCode::FORBIDDEN),
            (DataError::Conflict("x".into()), StatusCode::CONFLICT),
            (DataError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (DataError::Unavailable("x".into()), StatusCode::SERVICE_UNAVAILABLE),
            (DataError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from_data(err, "tally_cards").status_code(), status);
        }
    }

    #[test]
    fn error_body_nests_message() {
        let body = ApiError::bad_request("nope").to_json();
        assert_eq!(body["error"]["message"], "nope");
        assert_eq!(body["error"]["code"], "BAD_REQUEST");
    }
}
