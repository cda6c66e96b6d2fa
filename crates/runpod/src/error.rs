//! Error types for RunPod API operations.

use thiserror::Error;

/// Errors that can occur while talking to the RunPod API.
#[derive(Error, Debug)]
pub enum RunpodError {
    /// Connection or IO failure. Never retried.
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Rate limiting or service overload outlasted the retry budget.
    #[error("max retries exceeded after {attempts} attempts (last status {status})")]
    MaxRetriesExceeded { attempts: u32, status: u16 },

    /// API returned a non-retryable error status.
    #[error("API returned status {status}: {body}")]
    Api { status: u16, body: String },

    /// The GraphQL `errors` array was non-empty.
    ///
    /// Only the first message is displayed; the full list is kept for logging.
    #[error("GraphQL error: {}", first_message(.messages))]
    Protocol { messages: Vec<String> },

    /// The call succeeded but the expected object was absent.
    #[error("not found: {0}")]
    EmptyResult(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration or input.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The caller cancelled the request.
    #[error("request cancelled")]
    Cancelled,

    /// The request worker has shut down.
    #[error("request worker stopped")]
    WorkerStopped,
}

fn first_message(messages: &[String]) -> &str {
    messages.first().map_or("unknown error", String::as_str)
}

impl RunpodError {
    /// Whether this error means the remote object does not exist.
    ///
    /// RunPod has no structured error codes, so apart from [`RunpodError::EmptyResult`]
    /// this falls back to matching "not found" in the first GraphQL message.
    /// HTTP failures never count: a 404 page from a proxy says nothing about the pod.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::EmptyResult(_) => true,
            Self::Protocol { messages } => messages.first().is_some_and(|m| mentions_not_found(m)),
            _ => false,
        }
    }

    /// Every message carried by this error, first one first.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        match self {
            Self::Protocol { messages } => messages.clone(),
            other => vec![other.to_string()],
        }
    }
}

fn mentions_not_found(message: &str) -> bool {
    message.to_ascii_lowercase().contains("not found")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_displays_first_message() {
        let err = RunpodError::Protocol {
            messages: vec!["first".to_string(), "second".to_string()],
        };
        assert_eq!(err.to_string(), "GraphQL error: first");
        assert_eq!(err.messages().len(), 2);
    }

    #[test]
    fn test_not_found_classification() {
        let protocol = RunpodError::Protocol {
            messages: vec!["Pod not found".to_string()],
        };
        assert!(protocol.is_not_found());
        assert!(RunpodError::EmptyResult("pod p1".to_string()).is_not_found());

        let api = RunpodError::Api {
            status: 400,
            body: "bad input".to_string(),
        };
        assert!(!api.is_not_found());
        assert!(!RunpodError::Cancelled.is_not_found());
    }

    #[test]
    fn test_http_not_found_is_not_a_missing_pod() {
        let api = RunpodError::Api {
            status: 404,
            body: "<html><title>404 Not Found</title></html>".to_string(),
        };
        assert!(!api.is_not_found());
    }

    #[test]
    fn test_only_first_message_decides_not_found() {
        let later = RunpodError::Protocol {
            messages: vec!["permission denied".to_string(), "pod not found".to_string()],
        };
        assert!(!later.is_not_found());

        let first = RunpodError::Protocol {
            messages: vec!["pod not found".to_string(), "permission denied".to_string()],
        };
        assert!(first.is_not_found());
    }
}
