mod active;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use active::ActiveSession;
pub use workflow::{SessionAnswerResult, StudyLoopService};
