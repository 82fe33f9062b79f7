//! Error taxonomy for the authentication service

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Custom error type for authentication errors
#[derive(Error, Debug)]
pub enum AuthError {
    /// A session or identity lookup missed
    #[error("{0}")]
    NotFound(String),

    /// The request was rejected before anything was written
    #[error("{0}")]
    InvalidArgument(String),

    /// Missing or invalid access token, or rejected credentials
    #[error("{0}")]
    Unauthenticated(String),

    /// Duplicate record
    #[error("{0}")]
    Conflict(String),

    /// The database or a peer service could not be reached
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// A peer accepted a request but its answer could not be decoded, so
    /// whether it committed anything is unknown
    #[error("unreadable peer response: {0}")]
    UnreadableResponse(String),

    /// Signing, encoding or unexpected storage failure
    #[error("internal error: {0}")]
    Internal(String),

    /// Side effects (an identity, a session) were committed but the caller
    /// did not receive tokens; retry by re-authenticating, not resubmitting
    #[error("request partially committed, {stage} failed: {source}")]
    Incomplete {
        stage: &'static str,
        #[source]
        source: Box<AuthError>,
    },
}

/// Type alias for authentication results
pub type AuthResult<T> = Result<T, AuthError>;

impl AuthError {
    /// Wrap an error raised after an identity or session was written
    pub fn incomplete(stage: &'static str, source: AuthError) -> Self {
        match source {
            // already carries the earliest failing stage
            incomplete @ AuthError::Incomplete { .. } => incomplete,
            source => AuthError::Incomplete {
                stage,
                source: Box::new(source),
            },
        }
    }

    /// True when the failed request committed nothing
    pub fn is_side_effect_free(&self) -> bool {
        !matches!(self, AuthError::Incomplete { .. })
    }

    /// Stable machine-readable kind
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::NotFound(_) => "not_found",
            AuthError::InvalidArgument(_) => "invalid_argument",
            AuthError::Unauthenticated(_) => "unauthenticated",
            AuthError::Conflict(_) => "conflict",
            AuthError::Unavailable(_) => "unavailable",
            AuthError::UnreadableResponse(_) => "bad_gateway",
            AuthError::Internal(_) => "internal",
            AuthError::Incomplete { source, .. } => source.code(),
        }
    }

    /// HTTP status the transport maps this error to
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::NotFound(_) => StatusCode::NOT_FOUND,
            AuthError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            AuthError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AuthError::Conflict(_) => StatusCode::CONFLICT,
            AuthError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AuthError::UnreadableResponse(_) => StatusCode::BAD_GATEWAY,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::Incomplete { source, .. } => source.status(),
        }
    }

    fn public_message(&self) -> String {
        match self {
            AuthError::Internal(_) => "Internal server error".to_string(),
            AuthError::Unavailable(_) => "Service unavailable".to_string(),
            AuthError::UnreadableResponse(_) => "Unreadable peer response".to_string(),
            AuthError::Incomplete { stage, source } => {
                format!(
                    "request partially committed, {} failed: {}",
                    stage,
                    source.public_message()
                )
            }
            other => other.to_string(),
        }
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AuthError::NotFound("Session not found".to_string()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AuthError::Conflict("Session already exists".to_string())
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                AuthError::Unavailable(err.to_string())
            }
            _ => AuthError::Internal(err.to_string()),
        }
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        AuthError::Unavailable(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AuthError::Internal(format!("access token signing failed: {}", err))
    }
}

impl From<JsonRejection> for AuthError {
    fn from(rejection: JsonRejection) -> Self {
        AuthError::InvalidArgument(rejection.body_text())
    }
}

impl From<QueryRejection> for AuthError {
    fn from(rejection: QueryRejection) -> Self {
        AuthError::InvalidArgument(rejection.body_text())
    }
}

impl From<PathRejection> for AuthError {
    fn from(rejection: PathRejection) -> Self {
        AuthError::InvalidArgument(rejection.body_text())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        let body = Json(json!({
            "error": self.public_message(),
            "code": self.code(),
            "committed": !self.is_side_effect_free(),
        }));

        (status, body).into_response()
    }
}
