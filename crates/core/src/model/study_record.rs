use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

use crate::model::UserId;
use crate::scoring::XP_PER_CORRECT_ANSWER;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StudySessionRecordError {
    #[error("completed_at is before started_at")]
    InvalidTimeRange,

    #[error("items count ({total}) does not match answer counts ({sum})")]
    CountMismatch { total: u32, sum: u32 },

    #[error("unknown session type: {0}")]
    UnknownKind(String),
}

/// What was studied in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum SessionKind {
    Flashcards,
}

impl SessionKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SessionKind::Flashcards => "flashcards",
        }
    }

    /// # Errors
    ///
    /// Returns `StudySessionRecordError::UnknownKind` for unrecognised values.
    pub fn parse(raw: &str) -> Result<Self, StudySessionRecordError> {
        match raw {
            "flashcards" => Ok(SessionKind::Flashcards),
            other => Err(StudySessionRecordError::UnknownKind(other.to_string())),
        }
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate record of a completed study session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudySessionRecord {
    user_id: UserId,
    kind: SessionKind,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
    items_count: u32,
    correct: u32,
    incorrect: u32,
    xp_earned: u32,
}

impl StudySessionRecord {
    /// Rehydrate a record from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `StudySessionRecordError::InvalidTimeRange` if the timestamps are reversed.
    /// Returns `StudySessionRecordError::CountMismatch` if totals do not align.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        user_id: UserId,
        kind: SessionKind,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        items_count: u32,
        correct: u32,
        incorrect: u32,
        xp_earned: u32,
    ) -> Result<Self, StudySessionRecordError> {
        if completed_at < started_at {
            return Err(StudySessionRecordError::InvalidTimeRange);
        }
        let sum = correct.saturating_add(incorrect);
        if sum != items_count {
            return Err(StudySessionRecordError::CountMismatch {
                total: items_count,
                sum,
            });
        }

        Ok(Self {
            user_id,
            kind,
            started_at,
            completed_at,
            items_count,
            correct,
            incorrect,
            xp_earned,
        })
    }

    /// Build a flashcard session record from final tallies.
    ///
    /// # Errors
    ///
    /// Returns `StudySessionRecordError::InvalidTimeRange` if `completed_at` is before `started_at`.
    pub fn from_tally(
        user_id: UserId,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        correct: u32,
        incorrect: u32,
    ) -> Result<Self, StudySessionRecordError> {
        Self::from_persisted(
            user_id,
            SessionKind::Flashcards,
            started_at,
            completed_at,
            correct.saturating_add(incorrect),
            correct,
            incorrect,
            correct.saturating_mul(XP_PER_CORRECT_ANSWER),
        )
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn kind(&self) -> SessionKind {
        self.kind
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    #[must_use]
    pub fn items_count(&self) -> u32 {
        self.items_count
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn incorrect(&self) -> u32 {
        self.incorrect
    }

    #[must_use]
    pub fn xp_earned(&self) -> u32 {
        self.xp_earned
    }

    /// Whole minutes between start and completion, rounded down.
    #[must_use]
    pub fn duration_minutes(&self) -> u32 {
        let minutes = self
            .completed_at
            .signed_duration_since(self.started_at)
            .num_minutes()
            .max(0);
        u32::try_from(minutes).unwrap_or(u32::MAX)
    }
}
