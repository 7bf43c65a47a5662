//! Error taxonomy for the console core.
//!
//! Every failure that can reach a caller of the session controller or the
//! resource client is translated into one [`ConsoleError`] variant before it
//! leaves the library. Raw transport errors never cross this boundary.
//!
//! Nothing is retried automatically. [`ConsoleError::is_retryable`] only tells
//! the caller whether a manual retry makes sense.

use thiserror::Error;

/// Result alias used across the session and resource explorer modules
pub type ConsoleResult<T> = Result<T, ConsoleError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConsoleError {
    /// Bad login form input, recoverable locally by re-prompting
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Role assumption was rejected or could not be performed. No session was created.
    #[error("failed to assume role: {message}")]
    AuthenticationFailed { message: String },

    /// A fetch was attempted without an active session
    #[error("no active session, login first")]
    NoSession,

    /// The backend rejected the session (HTTP 401). The session has been cleared.
    #[error("session expired, please login again")]
    SessionExpired,

    /// No response was received from the backend. The session is preserved.
    #[error("backend unreachable: {message}")]
    BackendUnreachable { message: String },

    /// Any other fetch failure, carried verbatim for diagnostics
    #[error("fetch failed: {message}")]
    UnknownFetch { message: String },

    /// The session file could not be read or written
    #[error("session storage error: {0}")]
    Storage(String),
}

impl ConsoleError {
    /// Returns true if a user-initiated retry of the same action can succeed
    /// without logging in again
    pub fn is_retryable(&self) -> bool {
        matches!(self, ConsoleError::BackendUnreachable { .. })
    }

    /// Returns true if the caller must send the user back to the login surface
    pub fn requires_login(&self) -> bool {
        matches!(self, ConsoleError::NoSession | ConsoleError::SessionExpired)
    }

    /// Short label for compact display
    pub fn short_label(&self) -> &'static str {
        match self {
            ConsoleError::InvalidInput(_) => "invalid-input",
            ConsoleError::AuthenticationFailed { .. } => "auth-failed",
            ConsoleError::NoSession => "no-session",
            ConsoleError::SessionExpired => "expired",
            ConsoleError::BackendUnreachable { .. } => "unreachable",
            ConsoleError::UnknownFetch { .. } => "error",
            ConsoleError::Storage(_) => "storage",
        }
    }

    /// User-friendly message for status display
    pub fn user_message(&self) -> String {
        match self {
            ConsoleError::InvalidInput(msg) => msg.clone(),
            ConsoleError::AuthenticationFailed { .. } => "Failed to assume role.".to_string(),
            ConsoleError::NoSession => "You must log in first.".to_string(),
            ConsoleError::SessionExpired => "Unauthorized. Please login again.".to_string(),
            ConsoleError::BackendUnreachable { .. } => {
                "No response from backend service.".to_string()
            }
            ConsoleError::UnknownFetch { message } => truncate_message(message, 200),
            ConsoleError::Storage(msg) => format!("Session storage error: {}", msg),
        }
    }
}

/// Truncate a message to a maximum length, adding ellipsis if needed
pub(crate) fn truncate_message(msg: &str, max_len: usize) -> String {
    if msg.chars().count() <= max_len {
        msg.to_string()
    } else {
        let truncated: String = msg.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}
