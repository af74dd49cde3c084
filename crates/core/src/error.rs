use thiserror::Error;

use crate::model::{MindmapError, StudyItemError, StudySessionRecordError};
use crate::session::StudySessionError;

/// Domain invariant violations raised by the core model.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    StudyItem(#[from] StudyItemError),
    #[error(transparent)]
    Mindmap(#[from] MindmapError),
    #[error(transparent)]
    Session(#[from] StudySessionError),
    #[error(transparent)]
    Record(#[from] StudySessionRecordError),
}
