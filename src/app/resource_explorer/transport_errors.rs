//! Transport error categorization for backend requests.
//!
//! Distinguishes the failure classes the console reacts to differently:
//! the backend rejecting the session (401), the backend not answering at
//! all, and everything else. The categories are translated into
//! [`ConsoleError`](crate::app::errors::ConsoleError) at the resource client
//! boundary, where the session side effects live.

use reqwest::StatusCode;

/// Categorized failure of one backend request.
///
/// Messages are kept whole; shortening is left to display code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// HTTP 401. The only authorization-failure signal the console recognizes.
    Unauthorized,
    /// No response was received (connect, DNS, timeout, send failure)
    Unreachable { message: String },
    /// A response arrived with a non-success status other than 401
    Status { status: u16, message: String },
    /// A success response whose body could not be decoded
    Decode { message: String },
}

impl TransportError {
    /// Short label for compact display
    pub fn short_label(&self) -> &'static str {
        match self {
            TransportError::Unauthorized => "unauthorized",
            TransportError::Unreachable { .. } => "unreachable",
            TransportError::Status { .. } => "status",
            TransportError::Decode { .. } => "decode",
        }
    }

    /// Raw diagnostic message
    pub fn message(&self) -> String {
        match self {
            TransportError::Unauthorized => "HTTP 401 Unauthorized".to_string(),
            TransportError::Unreachable { message } => message.clone(),
            TransportError::Status { status, message } => {
                format!("HTTP {}: {}", status, message)
            }
            TransportError::Decode { message } => format!("invalid response body: {}", message),
        }
    }
}

/// Categorize a `reqwest` error raised before or while receiving a response
pub fn categorize_reqwest_error(error: &reqwest::Error) -> TransportError {
    if let Some(status) = error.status() {
        return categorize_status(status, &error.to_string());
    }

    if error.is_decode() {
        return TransportError::Decode {
            message: error.to_string(),
        };
    }

    // Connect, timeout and request errors all mean no response was received
    TransportError::Unreachable {
        message: describe_chain(error),
    }
}

/// Categorize a non-success HTTP status with the response body as detail
pub fn categorize_status(status: StatusCode, body: &str) -> TransportError {
    if status == StatusCode::UNAUTHORIZED {
        return TransportError::Unauthorized;
    }

    TransportError::Status {
        status: status.as_u16(),
        message: extract_detail(body),
    }
}

/// Pull the `detail` field out of a JSON error body, falling back to the raw body
pub fn extract_detail(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("detail")
                .or_else(|| v.get("error"))
                .map(|d| match d {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
        })
        .unwrap_or_else(|| body.trim().to_string())
}

fn describe_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
