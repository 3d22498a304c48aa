//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use vocab_core::model::SessionSummaryError;

/// Errors emitted by session services.
///
/// Calling an engine operation in the wrong phase is not an error; those
/// calls are ignored and reported through the operation's outcome instead.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no questions available for session")]
    Empty,
    #[error("session already in progress")]
    InProgress,
    #[error("session is not complete")]
    NotComplete,
    #[error(transparent)]
    Summary(#[from] SessionSummaryError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `AchievementService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AchievementServiceError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `SettingsService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SettingsServiceError {
    #[error(transparent)]
    Settings(#[from] vocab_core::model::SettingsError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
