//! Response stream error types.

use serde_json::Value;

/// Errors from the response stream pipeline.
///
/// Inside a turn every variant except `Cancelled` ends up as an error entry in the
/// transcript; `is_terminal` decides whether the turn keeps going afterwards.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// The service reported an error; the turn is over.
    #[error("{0}")]
    Stream(String),
    /// A payload could not be converted into transcript content.
    #[error("Could not decode {what}: {reason}")]
    Decode { what: &'static str, reason: String },
    #[error("Invalid JSON in response stream: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to read response stream: {0}")]
    Io(#[from] std::io::Error),
    /// The caller abandoned the turn.
    #[error("Request cancelled")]
    Cancelled,
}

impl ChatError {
    pub(crate) fn decode(what: &'static str, reason: impl Into<String>) -> Self {
        ChatError::Decode {
            what,
            reason: reason.into(),
        }
    }

    /// Whether the failure ends the turn, as opposed to spoiling a single unit.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ChatError::Decode { .. } | ChatError::Json(_))
    }
}

/// Map a service error envelope (`{"error": {"code", "message", "status"}}`) into ChatError.
/// Returns None when the value is not an envelope.
pub fn map_service_error(value: &Value) -> Option<ChatError> {
    let err = value.get("error")?;
    let message = err
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| err.as_str())
        .unwrap_or("Unknown error");
    let code = err.get("code").and_then(Value::as_i64);
    let status = err.get("status").and_then(Value::as_str);
    if code == Some(403) || status == Some("PERMISSION_DENIED") {
        return Some(ChatError::Stream(format!(
            "Service error (403): {}. The request must carry the data agent context \
             alongside the conversation reference (check DEFAULT_AGENT_ID).",
            message
        )));
    }
    Some(ChatError::Stream(format!("Service error: {}", message)))
}
