//! Structured error types for backend calls and user-triggered actions.
//!
//! These are designed to be displayable in both CLI and TUI contexts.

use thiserror::Error;

/// Failure of a fetch or of the validation guarding one.
///
/// Supersession is deliberately absent: a superseded result is dropped by the
/// fetch controller and never surfaces as an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("network failure: {0}")]
    NetworkFailure(String),

    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Non-success HTTP status. `message` is the body's `error` field when present.
    #[error("{message}")]
    ServerError { status: u16, message: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("{0}")]
    ValidationFailure(String),
}

impl FetchError {
    pub fn validation(msg: impl Into<String>) -> Self {
        FetchError::ValidationFailure(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::NetworkFailure(_) => ErrorKind::Network,
            FetchError::Timeout { .. } => ErrorKind::Timeout,
            FetchError::ServerError { .. } => ErrorKind::Server,
            FetchError::MalformedResponse(_) => ErrorKind::Malformed,
            FetchError::ValidationFailure(_) => ErrorKind::Validation,
        }
    }

    /// The text shown to the user in the error banner.
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

/// Error category for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Network,
    Timeout,
    Server,
    Malformed,
    Validation,
}

impl ErrorKind {
    pub fn label(self) -> &'static str {
        match self {
            ErrorKind::Network => "NET",
            ErrorKind::Timeout => "TIME",
            ErrorKind::Server => "SRV",
            ErrorKind::Malformed => "DATA",
            ErrorKind::Validation => "VAL",
        }
    }
}

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_error_displays_backend_message() {
        let err = FetchError::ServerError {
            status: 500,
            message: "model unavailable".into(),
        };
        assert_eq!(err.user_message(), "model unavailable");
        assert_eq!(err.kind(), ErrorKind::Server);
    }

    #[test]
    fn kinds_have_distinct_labels() {
        let labels = [
            ErrorKind::Network.label(),
            ErrorKind::Timeout.label(),
            ErrorKind::Server.label(),
            ErrorKind::Malformed.label(),
            ErrorKind::Validation.label(),
        ];
        for (i, a) in labels.iter().enumerate() {
            for b in &labels[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn timeout_is_not_a_network_failure() {
        let err = FetchError::Timeout { secs: 30 };
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(err.to_string().contains("30s"));
    }
}
