//! Error types and handling for the canopy application

use std::collections::HashMap;
use thiserror::Error;

/// Classification of failures talking to the weather provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// HTTP 401, usually a missing or revoked API key
    ApiUnauthorized,
    /// HTTP 404
    ApiNotFound,
    /// HTTP 429 or local limiter exhaustion
    ApiRateLimit,
    /// Transport failure or unexpected status
    ApiNetworkError,
    /// Body could not be parsed or lacked required data
    ApiInvalidResponse,
}

/// Main error type for the canopy application
#[derive(Error, Debug)]
pub enum CanopyError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Weather provider communication errors
    #[error("API error ({code:?}): {message}")]
    Api {
        message: String,
        code: ErrorCode,
        context: HashMap<String, String>,
    },

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// Local store errors
    #[error("Store error: {message}")]
    Store { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// General application errors
    #[error("Application error: {message}")]
    General { message: String },
}

impl CanopyError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new API error without extra context
    pub fn api<S: Into<String>>(message: S, code: ErrorCode) -> Self {
        Self::api_with_context(message, code, HashMap::new())
    }

    /// Create a new API error carrying diagnostic key/value pairs
    pub fn api_with_context<S: Into<String>>(
        message: S,
        code: ErrorCode,
        context: HashMap<String, String>,
    ) -> Self {
        Self::Api {
            message: message.into(),
            code,
            context,
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new store error
    pub fn store<S: Into<String>>(message: S) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// Create a new general error
    pub fn general<S: Into<String>>(message: S) -> Self {
        Self::General {
            message: message.into(),
        }
    }

    /// API error code, if this is an API error
    #[must_use]
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            CanopyError::Api { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            CanopyError::Config { .. } => {
                "Configuration error. Please check your config file and API key.".to_string()
            }
            CanopyError::Api {
                code: ErrorCode::ApiUnauthorized,
                ..
            } => "The weather provider rejected the API key.".to_string(),
            CanopyError::Api { .. } => {
                "Unable to reach the weather provider. Please check your internet connection."
                    .to_string()
            }
            CanopyError::Validation { message } => {
                format!("Invalid input: {message}")
            }
            CanopyError::Store { .. } => {
                "Local storage is unavailable. Check that the data directory is writable and not in use by another canopy process."
                    .to_string()
            }
            CanopyError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
            CanopyError::General { message } => message.clone(),
        }
    }
}

impl From<fjall::Error> for CanopyError {
    fn from(err: fjall::Error) -> Self {
        CanopyError::store(err.to_string())
    }
}

impl From<postcard::Error> for CanopyError {
    fn from(err: postcard::Error) -> Self {
        CanopyError::store(format!("encoding failed: {err}"))
    }
}

impl From<tokio::task::JoinError> for CanopyError {
    fn from(err: tokio::task::JoinError) -> Self {
        CanopyError::store(format!("storage task failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let config_err = CanopyError::config("missing API key");
        assert!(matches!(config_err, CanopyError::Config { .. }));

        let api_err = CanopyError::api("connection failed", ErrorCode::ApiNetworkError);
        assert!(matches!(api_err, CanopyError::Api { .. }));
        assert_eq!(api_err.code(), Some(ErrorCode::ApiNetworkError));

        let validation_err = CanopyError::validation("invalid coordinates");
        assert!(matches!(validation_err, CanopyError::Validation { .. }));
        assert_eq!(validation_err.code(), None);
    }

    #[test]
    fn test_user_messages() {
        let config_err = CanopyError::config("test");
        assert!(config_err.user_message().contains("Configuration error"));

        let api_err = CanopyError::api("test", ErrorCode::ApiNetworkError);
        assert!(api_err.user_message().contains("Unable to reach"));

        let auth_err = CanopyError::api("test", ErrorCode::ApiUnauthorized);
        assert!(auth_err.user_message().contains("API key"));

        let validation_err = CanopyError::validation("test input");
        assert!(validation_err.user_message().contains("test input"));

        let store_err = CanopyError::store("Locked by another process");
        assert!(store_err.user_message().contains("not in use by another canopy process"));
        assert!(!store_err.user_message().contains("delete"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: CanopyError = io_err.into();
        assert!(matches!(err, CanopyError::Io { .. }));
    }
}
