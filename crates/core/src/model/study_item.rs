use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::{ItemId, UserId};
use crate::model::subject::{Difficulty, Subject};
use crate::scoring;

/// Upper bound on prompt/response length, in characters.
pub const MAX_TEXT_CHARS: usize = 4_000;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StudyItemError {
    #[error("prompt cannot be empty")]
    EmptyPrompt,

    #[error("response cannot be empty")]
    EmptyResponse,

    #[error("{field} is too long: {len} characters (max {max})")]
    TooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("times_correct ({correct}) exceeds times_studied ({studied})")]
    InconsistentStats { studied: u32, correct: u32 },
}

//
// ─── STATS ─────────────────────────────────────────────────────────────────────
//

/// Historical study counters for one item.
///
/// `times_correct <= times_studied` holds for every value of this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StudyStats {
    times_studied: u32,
    times_correct: u32,
}

impl StudyStats {
    /// # Errors
    ///
    /// Returns `StudyItemError::InconsistentStats` if `times_correct > times_studied`.
    pub fn new(times_studied: u32, times_correct: u32) -> Result<Self, StudyItemError> {
        if times_correct > times_studied {
            return Err(StudyItemError::InconsistentStats {
                studied: times_studied,
                correct: times_correct,
            });
        }
        Ok(Self {
            times_studied,
            times_correct,
        })
    }

    #[must_use]
    pub fn times_studied(&self) -> u32 {
        self.times_studied
    }

    #[must_use]
    pub fn times_correct(&self) -> u32 {
        self.times_correct
    }

    /// Counters after one more answer.
    #[must_use]
    pub fn record(self, is_correct: bool) -> Self {
        let times_studied = self.times_studied.saturating_add(1);
        let times_correct = if is_correct {
            self.times_correct.saturating_add(1).min(times_studied)
        } else {
            self.times_correct
        };
        Self {
            times_studied,
            times_correct,
        }
    }

    /// Rounded accuracy percentage; 0 for an item never studied.
    #[must_use]
    pub fn accuracy_percent(&self) -> u32 {
        scoring::accuracy(self.times_correct, self.times_studied)
    }
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// User-supplied fields for a new or edited study item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyItemDraft {
    pub prompt: String,
    pub response: String,
    pub subject: Subject,
    pub difficulty: Difficulty,
}

impl StudyItemDraft {
    #[must_use]
    pub fn new(prompt: impl Into<String>, response: impl Into<String>, subject: Subject) -> Self {
        Self {
            prompt: prompt.into(),
            response: response.into(),
            subject,
            difficulty: Difficulty::default(),
        }
    }

    #[must_use]
    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    /// Validate the draft and build a fresh item with zeroed stats.
    ///
    /// # Errors
    ///
    /// Returns `StudyItemError` if the prompt or response is blank or too long.
    pub fn validate(
        self,
        id: ItemId,
        owner: UserId,
        now: DateTime<Utc>,
    ) -> Result<StudyItem, StudyItemError> {
        let prompt = normalize_text(self.prompt, "prompt", StudyItemError::EmptyPrompt)?;
        let response = normalize_text(self.response, "response", StudyItemError::EmptyResponse)?;

        Ok(StudyItem {
            id,
            owner,
            prompt,
            response,
            subject: self.subject,
            difficulty: self.difficulty,
            stats: StudyStats::default(),
            created_at: now,
            updated_at: now,
        })
    }
}

fn normalize_text(
    raw: String,
    field: &'static str,
    empty: StudyItemError,
) -> Result<String, StudyItemError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(empty);
    }
    let len = trimmed.chars().count();
    if len > MAX_TEXT_CHARS {
        return Err(StudyItemError::TooLong {
            field,
            len,
            max: MAX_TEXT_CHARS,
        });
    }
    Ok(trimmed.to_string())
}

//
// ─── STUDY ITEM ────────────────────────────────────────────────────────────────
//

/// One learnable unit: a prompt, its response and the owner's study history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyItem {
    id: ItemId,
    owner: UserId,
    prompt: String,
    response: String,
    subject: Subject,
    difficulty: Difficulty,
    stats: StudyStats,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl StudyItem {
    /// Rehydrate an item from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `StudyItemError` if the stored text is blank.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: ItemId,
        owner: UserId,
        prompt: String,
        response: String,
        subject: Subject,
        difficulty: Difficulty,
        stats: StudyStats,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, StudyItemError> {
        if prompt.trim().is_empty() {
            return Err(StudyItemError::EmptyPrompt);
        }
        if response.trim().is_empty() {
            return Err(StudyItemError::EmptyResponse);
        }
        Ok(Self {
            id,
            owner,
            prompt,
            response,
            subject,
            difficulty,
            stats,
            created_at,
            updated_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> ItemId {
        self.id
    }

    #[must_use]
    pub fn owner(&self) -> UserId {
        self.owner
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn response(&self) -> &str {
        &self.response
    }

    #[must_use]
    pub fn subject(&self) -> Subject {
        self.subject
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn stats(&self) -> StudyStats {
        self.stats
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Replace the editable fields, keeping identity and study history.
    ///
    /// # Errors
    ///
    /// Returns `StudyItemError` if the draft fails validation; the item is left untouched.
    pub fn apply_edit(
        &mut self,
        draft: StudyItemDraft,
        now: DateTime<Utc>,
    ) -> Result<(), StudyItemError> {
        let edited = draft.validate(self.id, self.owner, self.created_at)?;
        self.prompt = edited.prompt;
        self.response = edited.response;
        self.subject = edited.subject;
        self.difficulty = edited.difficulty;
        self.updated_at = now;
        Ok(())
    }

    /// Store counters reported back by the persistence gateway.
    pub fn set_stats(&mut self, stats: StudyStats, now: DateTime<Utc>) {
        self.stats = stats;
        self.updated_at = now;
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
