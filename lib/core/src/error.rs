use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

// ── Error kinds ─────────────────────────────────────────────────────
//
// Stable, machine-readable identifiers. Clients match on these —
// never on the human-readable message string.

/// Stable error kind constants.
///
/// Clients should match on `error` from `{"error": "NOT_FOUND", "message": "..."}`.
/// Kinds never change; messages may be reworded.
pub mod error_kind {
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const FORBIDDEN: &str = "FORBIDDEN";
    pub const UNAUTHENTICATED: &str = "UNAUTHENTICATED";
    pub const INVALID_CONTENT: &str = "INVALID_CONTENT";
    pub const CROSS_RECIPE_PARENT: &str = "CROSS_RECIPE_PARENT";
    pub const INVALID_TRANSITION: &str = "INVALID_TRANSITION";
    pub const STORAGE_UNAVAILABLE: &str = "STORAGE_UNAVAILABLE";
    pub const INTERNAL: &str = "INTERNAL";
}

// ── ServiceError ────────────────────────────────────────────────────

/// Unified service error type used across all modules.
///
/// Each variant maps to a stable error kind (see [`error_kind`]) and an
/// HTTP status code. The JSON response always includes both:
///
/// ```json
/// {"error": "NOT_FOUND", "message": "recipe 42 not found"}
/// ```
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Resource does not exist, or is not visible to the caller. HTTP 404.
    #[error("{0}")]
    NotFound(String),

    /// Authenticated but not the owner / not an admin. HTTP 403.
    #[error("{0}")]
    Forbidden(String),

    /// The operation requires an authenticated user. HTTP 401.
    #[error("{0}")]
    Unauthenticated(String),

    /// Submitted text content is empty or whitespace-only. HTTP 400.
    #[error("{0}")]
    InvalidContent(String),

    /// A reply's parent comment belongs to a different recipe. HTTP 400.
    #[error("{0}")]
    CrossRecipeParent(String),

    /// No workflow transition matches the recipe's current status. HTTP 409.
    #[error("{0}")]
    InvalidTransition(String),

    /// Storage backend timed out or lost its connection. HTTP 503.
    #[error("{0}")]
    StorageUnavailable(String),

    /// Unexpected internal error. HTTP 500.
    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    /// Stable, machine-readable error kind.
    pub fn error_kind(&self) -> &'static str {
        match self {
            ServiceError::NotFound(_) => error_kind::NOT_FOUND,
            ServiceError::Forbidden(_) => error_kind::FORBIDDEN,
            ServiceError::Unauthenticated(_) => error_kind::UNAUTHENTICATED,
            ServiceError::InvalidContent(_) => error_kind::INVALID_CONTENT,
            ServiceError::CrossRecipeParent(_) => error_kind::CROSS_RECIPE_PARENT,
            ServiceError::InvalidTransition(_) => error_kind::INVALID_TRANSITION,
            ServiceError::StorageUnavailable(_) => error_kind::STORAGE_UNAVAILABLE,
            ServiceError::Internal(_) => error_kind::INTERNAL,
        }
    }

    /// HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ServiceError::InvalidContent(_) => StatusCode::BAD_REQUEST,
            ServiceError::CrossRecipeParent(_) => StatusCode::BAD_REQUEST,
            ServiceError::InvalidTransition(_) => StatusCode::CONFLICT,
            ServiceError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = serde_json::json!({
            "error": self.error_kind(),
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}
