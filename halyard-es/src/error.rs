//! Error types for engine communication

use serde::Deserialize;

/// Errors raised by the search engine or while talking to it
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Transport error during {operation}: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{operation} timed out")]
    Timeout { operation: &'static str },

    #[error("Engine rejected {operation} with status {status} ({error_type}): {reason}")]
    Status {
        operation: &'static str,
        status: u16,
        error_type: String,
        reason: String,
    },

    #[error("Unexpected engine response: {0}")]
    Decode(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid client configuration: {0}")]
    Config(String),
}

/// Engine error body.
///
/// Most APIs answer with a structured `{"error": {"type", "reason"}}`, but a
/// few (alias lookups among them) put a bare message in `error`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorDetail {
    Structured {
        #[serde(rename = "type")]
        error_type: String,
        #[serde(default)]
        reason: Option<String>,
    },
    Message(String),
}

impl EngineError {
    /// Build a transport error, folding timeouts into [`EngineError::Timeout`]
    pub fn transport(operation: &'static str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout { operation }
        } else {
            Self::Transport { operation, source }
        }
    }

    /// Decode a non-success response body into a status error
    pub fn from_response(operation: &'static str, status: u16, body: &str) -> Self {
        let (error_type, reason) = match serde_json::from_str::<ErrorBody>(body) {
            Ok(ErrorBody {
                error: ErrorDetail::Structured { error_type, reason },
            }) => {
                let reason = reason.unwrap_or_else(|| error_type.clone());
                (error_type, reason)
            }
            Ok(ErrorBody {
                error: ErrorDetail::Message(message),
            }) => ("error".to_string(), message),
            Err(_) => ("http_error".to_string(), body.trim().to_string()),
        };

        Self::Status {
            operation,
            status,
            error_type,
            reason,
        }
    }

    /// HTTP status reported by the engine, if the engine answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Short label for log fields
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "transport",
            Self::Timeout { .. } => "timeout",
            Self::Status { .. } => "status",
            Self::Decode(_) => "decode",
            Self::Json(_) => "json",
            Self::Config(_) => "config",
        }
    }
}
