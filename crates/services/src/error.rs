//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;
use tellect_core::model::{AiSettingsError, MindmapError, StudyItemError};
use tellect_core::session::StudySessionError;

/// Errors emitted by `GenerationService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GenerationError {
    #[error("content generation is not configured")]
    Disabled,
    #[error("topic cannot be empty")]
    EmptyTopic,
    #[error("content generation returned an empty response")]
    EmptyResponse,
    #[error("content generation request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("could not parse generated content: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Settings(#[from] AiSettingsError),
}

/// Errors emitted by `StudyItemService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StudyItemServiceError {
    #[error(transparent)]
    Item(#[from] StudyItemError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `MindmapService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MindmapServiceError {
    #[error(transparent)]
    Mindmap(#[from] MindmapError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressServiceError {
    #[error("no profile for this user")]
    MissingProfile,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ContentService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ContentServiceError {
    #[error("nothing to save")]
    NothingToSave,
    #[error(transparent)]
    Item(#[from] StudyItemError),
    #[error(transparent)]
    Mindmap(#[from] MindmapError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by the study loop.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error(transparent)]
    Session(#[from] StudySessionError),
    /// A stats or record value broke a model invariant before it was written.
    #[error(transparent)]
    Domain(#[from] tellect_core::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Progress(#[from] ProgressServiceError),
}
