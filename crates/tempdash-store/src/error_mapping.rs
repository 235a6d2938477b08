//! Mapping of store and series errors into the application error hierarchy.

use tempdash_core::{AppError, ConfigError, DataError, SyncError};
use tempdash_series::DocumentError;

use crate::preferences::PreferenceError;
use crate::source::SourceError;

impl From<SourceError> for AppError {
    fn from(e: SourceError) -> Self {
        match e {
            SourceError::Unavailable(s) => AppError::Sync(SyncError::Unavailable(s)),
            SourceError::PermissionDenied(s) => AppError::Sync(SyncError::PermissionDenied(s)),
            SourceError::Closed => AppError::Sync(SyncError::Closed),
            SourceError::InvalidQuery(s) => AppError::Sync(SyncError::InvalidQuery(s)),
            SourceError::Fixture(s) => AppError::Config(ConfigError::Invalid(s)),
        }
    }
}

impl From<PreferenceError> for AppError {
    fn from(e: PreferenceError) -> Self {
        AppError::Config(ConfigError::Invalid(e.to_string()))
    }
}

/// Both types are foreign to this crate, so this is a function rather than a `From` impl.
pub fn document_error(e: DocumentError) -> DataError {
    match e {
        DocumentError::Malformed { id, source } => DataError::Malformed {
            id,
            message: source.to_string(),
        },
        DocumentError::Empty(id) => DataError::Empty(id),
    }
}
