//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use isc_models::ResolveError;
use isc_store::{CatalogError, StoreError};

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl ApiError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) | ApiError::Validation(_) | ApiError::Resolve(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Catalog(e) => match e {
                CatalogError::DuplicateReference(_) => StatusCode::CONFLICT,
                CatalogError::NotFound(_) | CatalogError::ThemeNotFound(_) => StatusCode::NOT_FOUND,
                CatalogError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Internal(_) | ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable code, for errors a client can act on.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            ApiError::Resolve(e) => Some(e.code()),
            ApiError::Validation(_) => Some("validation_failed"),
            ApiError::Catalog(CatalogError::DuplicateReference(_)) => Some("duplicate_reference"),
            ApiError::Catalog(CatalogError::NotFound(_)) => Some("not_found"),
            ApiError::Catalog(CatalogError::ThemeNotFound(_)) => Some("theme_not_found"),
            ApiError::Unauthorized(_) => Some("unauthorized"),
            ApiError::Forbidden(_) => Some("forbidden"),
            ApiError::RateLimited => Some("rate_limited"),
            _ => None,
        }
    }

    fn is_internal(&self) -> bool {
        self.status_code().is_server_error()
            && !matches!(self, ApiError::Unavailable(_) | ApiError::Upstream(_))
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't expose internal error details in production
        let detail = if self.is_internal() {
            tracing::error!(error = %self, "Request failed");
            if std::env::var("ENVIRONMENT").unwrap_or_default() == "production" {
                "An internal error occurred".to_string()
            } else {
                self.to_string()
            }
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            detail,
            code: self.code(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isc_models::{VideoId, VideoReference};

    #[test]
    fn test_status_mapping() {
        let dup = ApiError::from(CatalogError::DuplicateReference(VideoReference::youtube("abc")));
        assert_eq!(dup.status_code(), StatusCode::CONFLICT);
        assert_eq!(dup.code(), Some("duplicate_reference"));

        let missing = ApiError::from(CatalogError::NotFound(VideoId::from_string("x")));
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);

        let store = ApiError::from(CatalogError::Store(StoreError::RequestFailed("boom".into())));
        assert_eq!(store.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(store.is_internal());

        assert!(!ApiError::unavailable("no key").is_internal());
    }

    #[test]
    fn test_resolve_errors_carry_their_code() {
        let err = ApiError::from(isc_models::resolve("https://vimeo.com/1").unwrap_err());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), Some("unrecognized_url"));

        let err = ApiError::from(isc_models::resolve("not a url").unwrap_err());
        assert_eq!(err.code(), Some("invalid_url"));
    }
}
