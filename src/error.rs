//! Crate-level error types.
//!
//! Scheduling conflicts are their own variant because they map to HTTP 409 and
//! are fully recoverable by the caller re-querying debate state. Provider
//! failures inside the memory pipeline never surface here — they are absorbed
//! fail-soft at the call site.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use thiserror::Error;

/// Errors surfaced to API callers.
#[derive(Error, Debug)]
pub enum AgoraError {
    #[error("Debate not found: {0}")]
    DebateNotFound(String),

    #[error("Unknown character: {0}")]
    UnknownCharacter(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// It is not the requested speaker's turn, or the debate is complete.
    #[error("{0}")]
    Conflict(ConflictKind),

    #[error("Provider error: {0}")]
    Provider(#[from] crate::provider::ProviderError),

    /// The model declined the forced topic-suggestion tool call.
    #[error("Failed to generate topics")]
    TopicGeneration,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Config error: {0}")]
    Config(String),
}

/// The two scheduling-conflict cases. Neither mutates any state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictKind {
    /// The format's phase sequence has been exhausted.
    DebateComplete,
    /// Another participant holds the current slot.
    NotYourTurn { expected: String, requested: String },
}

impl std::fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DebateComplete => write!(f, "Debate complete — no more turns"),
            Self::NotYourTurn {
                expected,
                requested,
            } => write!(f, "Not {requested}'s turn. Expected: {expected}"),
        }
    }
}

impl AgoraError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::DebateNotFound(_) => StatusCode::NOT_FOUND,
            Self::UnknownCharacter(_) | Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Provider(_) | Self::TopicGeneration | Self::Database(_) | Self::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AgoraError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }
        let body = serde_json::json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}

/// Convenience result alias for API-facing code.
pub type Result<T> = std::result::Result<T, AgoraError>;
