use anyhow::Error as AnyError;
use http::StatusCode;
use serde_json::json;
use thiserror::Error;

/// Application-level error that carries an HTTP status code.
///
/// Adapters turn this into their platform's response type; the JSON
/// payload shape is shared via [`NoteError::to_json`].
#[derive(Debug, Error)]
pub enum NoteError {
    #[error("{message}")]
    BadRequest { message: String },
    #[error("not found: {what}")]
    NotFound { what: String },
    /// A required service binding is missing from the hosting context.
    /// Surfaced distinctly from data errors so misconfiguration is
    /// recognizable from the response alone.
    #[error("binding {binding} is not configured")]
    BindingUnavailable { binding: &'static str },
    #[error("internal error: {source}")]
    Internal {
        #[from]
        source: AnyError,
    },
}

impl NoteError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        NoteError::BadRequest {
            message: message.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        NoteError::NotFound { what: what.into() }
    }

    pub fn binding_unavailable(binding: &'static str) -> Self {
        NoteError::BindingUnavailable { binding }
    }

    pub fn internal<E>(error: E) -> Self
    where
        E: Into<AnyError>,
    {
        NoteError::Internal {
            source: error.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            NoteError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            NoteError::NotFound { .. } => StatusCode::NOT_FOUND,
            NoteError::BindingUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            NoteError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> String {
        match self {
            NoteError::BadRequest { message } => message.clone(),
            NoteError::NotFound { what } => format!("not found: {what}"),
            NoteError::BindingUnavailable { binding } => {
                format!("binding {binding} is not configured")
            }
            NoteError::Internal { source } => format!("internal error: {source}"),
        }
    }

    /// JSON error payload rendered by every adapter.
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "error": {
                "status": self.status().as_u16(),
                "message": self.message(),
            }
        })
    }
}
