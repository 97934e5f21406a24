//! Error types for chatledger
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for chatledger operations
///
/// This enum encompasses all possible errors that can occur while loading
/// configuration, talking to the completion endpoint, decoding the response
/// stream, and persisting usage statistics or conversation history.
#[derive(Error, Debug)]
pub enum ChatLedgerError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport failures: network errors, aborted requests, non-2xx status
    #[error("Transport error: {0}")]
    Transport(String),

    /// Completion endpoint returned a non-success HTTP status
    #[error("Completion request failed with status {status}: {message}")]
    CompletionStatus {
        /// HTTP status code returned by the endpoint
        status: u16,
        /// Response body or status description
        message: String,
    },

    /// A second request was started while one was still in flight
    #[error("A request is already in flight for this conversation")]
    TurnInFlight,

    /// Stream decoding errors (not used for malformed records, which are skipped)
    #[error("Stream error: {0}")]
    Stream(String),

    /// Usage/conversation storage errors (database operations)
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for chatledger operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let error = ChatLedgerError::Config("invalid format".to_string());
        assert_eq!(error.to_string(), "Configuration error: invalid format");
    }

    #[test]
    fn test_transport_error_display() {
        let error = ChatLedgerError::Transport("connection reset".to_string());
        assert_eq!(error.to_string(), "Transport error: connection reset");
    }

    #[test]
    fn test_completion_status_display() {
        let error = ChatLedgerError::CompletionStatus {
            status: 503,
            message: "service unavailable".to_string(),
        };
        let s = error.to_string();
        assert!(s.contains("503"));
        assert!(s.contains("service unavailable"));
    }

    #[test]
    fn test_turn_in_flight_display() {
        let error = ChatLedgerError::TurnInFlight;
        assert_eq!(
            error.to_string(),
            "A request is already in flight for this conversation"
        );
    }

    #[test]
    fn test_storage_error_display() {
        let error = ChatLedgerError::Storage("database connection failed".to_string());
        assert_eq!(
            error.to_string(),
            "Storage error: database connection failed"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: ChatLedgerError = io_error.into();
        assert!(matches!(error, ChatLedgerError::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_str = "{invalid json}";
        let json_error = serde_json::from_str::<serde_json::Value>(json_str).unwrap_err();
        let error: ChatLedgerError = json_error.into();
        assert!(matches!(error, ChatLedgerError::Serialization(_)));
    }

    #[test]
    fn test_yaml_error_conversion() {
        let yaml_str = "invalid: : yaml";
        let yaml_error = serde_yaml::from_str::<serde_yaml::Value>(yaml_str).unwrap_err();
        let error: ChatLedgerError = yaml_error.into();
        assert!(matches!(error, ChatLedgerError::Yaml(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ChatLedgerError>();
    }
}
