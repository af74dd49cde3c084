use chrono::{DateTime, Utc};
use storage::repository::StudySessionId;
use tellect_core::model::{StudyItem, UserId};
use tellect_core::{StudySession, Tally};

/// A running study session plus the bookkeeping needed to persist its effects.
#[derive(Debug, Clone)]
pub struct ActiveSession {
    pub(crate) owner: UserId,
    pub(crate) started_at: DateTime<Utc>,
    pub(crate) completed_at: Option<DateTime<Utc>>,
    pub(crate) engine: StudySession,
    pub(crate) record_id: Option<StudySessionId>,
    pub(crate) persistence_failures: u32,
}

impl ActiveSession {
    pub(crate) fn new(owner: UserId, started_at: DateTime<Utc>, engine: StudySession) -> Self {
        Self {
            owner,
            started_at,
            completed_at: None,
            engine,
            record_id: None,
            persistence_failures: 0,
        }
    }

    #[must_use]
    pub fn owner(&self) -> UserId {
        self.owner
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// The underlying state machine, for read-only inspection.
    #[must_use]
    pub fn engine(&self) -> &StudySession {
        &self.engine
    }

    #[must_use]
    pub fn current_item(&self) -> Option<&StudyItem> {
        self.engine.current_item()
    }

    #[must_use]
    pub fn is_revealed(&self) -> bool {
        self.engine.is_revealed()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.engine.is_complete()
    }

    #[must_use]
    pub fn tally(&self) -> Tally {
        self.engine.tally()
    }

    #[must_use]
    pub fn progress_fraction(&self) -> f64 {
        self.engine.progress_fraction()
    }

    /// Identifier of the persisted session record, once written.
    #[must_use]
    pub fn record_id(&self) -> Option<StudySessionId> {
        self.record_id
    }

    /// How many side effects could not be persisted during this session.
    #[must_use]
    pub fn persistence_failures(&self) -> u32 {
        self.persistence_failures
    }
}
