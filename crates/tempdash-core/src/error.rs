//! Centralized error types for the dashboard.
//!
//! Each crate keeps its own precise error enum; this module holds the
//! categories they map into, with user-facing messages for the UI layer.

use thiserror::Error;

/// Top-level application error type.
///
/// Use `user_message()` to get a UI-appropriate message.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Returns a user-friendly message suitable for display in the UI.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Config(e) => e.user_message(),
            AppError::Sync(e) => e.user_message(),
            AppError::Data(e) => e.user_message(),
            AppError::Io(_) => "A file operation failed. Please try again.",
            AppError::Other(_) => "An unexpected error occurred. Please try again.",
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),

    #[error("Missing required setting: {0}")]
    MissingSetting(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::NotFound(_) => "Configuration not found. Using defaults.",
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::ParseError(_) => "Configuration file is malformed. Check your settings.",
            ConfigError::MissingSetting(_) => "A required setting is missing. Check your settings.",
        }
    }
}

/// Errors talking to the document database (subscriptions and fetches).
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Database unavailable: {0}")]
    Unavailable(String),

    #[error("Permission denied on collection: {0}")]
    PermissionDenied(String),

    #[error("Subscription closed")]
    Closed,

    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

impl SyncError {
    pub fn user_message(&self) -> &'static str {
        match self {
            SyncError::Unavailable(_) => "Live data is unavailable. Retrying in the background.",
            SyncError::PermissionDenied(_) => "Access to sensor data was denied.",
            SyncError::Closed => "Live updates stopped. Reload to reconnect.",
            SyncError::InvalidQuery(_) => "Sensor data request was rejected.",
        }
    }
}

/// Errors in the shape of sensor documents.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("Malformed document {id}: {message}")]
    Malformed { id: String, message: String },

    #[error("Document {0} has no readings")]
    Empty(String),
}

impl DataError {
    pub fn user_message(&self) -> &'static str {
        match self {
            DataError::Malformed { .. } => "Some sensor data could not be read.",
            DataError::Empty(_) => "No readings recorded yet.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_conversion() {
        let sync_err = SyncError::Closed;
        let app_err: AppError = sync_err.into();
        assert!(matches!(app_err, AppError::Sync(SyncError::Closed)));
    }

    #[test]
    fn test_user_message_propagation() {
        let app_err = AppError::Data(DataError::Empty("2024-03-01".into()));
        assert_eq!(app_err.user_message(), "No readings recorded yet.");
    }

    #[test]
    fn test_malformed_display_names_document() {
        let err = DataError::Malformed {
            id: "2024-03-01".into(),
            message: "missing field `date`".into(),
        };
        assert!(err.to_string().contains("2024-03-01"));
    }
}
