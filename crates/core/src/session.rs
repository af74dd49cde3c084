//! Study session state machine.
//!
//! A session walks one user through a fixed, ordered list of study items:
//!
//! ```text
//! Presenting(p) --reveal--> Revealed(p) --answer--> Presenting(p + 1)
//!                                               \-> Complete      (p + 1 == len)
//! ```
//!
//! The session never touches persistence. Each answer yields [`SessionEvent`]s
//! that the caller hands to its collaborators (item store, progress store,
//! notifications); whatever happens to those events, the in-memory tally here
//! stays authoritative.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use crate::model::{ItemId, StudyItem, StudyStats};
use crate::scoring::XP_PER_CORRECT_ANSWER;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StudySessionError {
    #[error("cannot start a study session without items")]
    EmptySession,

    #[error("cannot {operation} while the session is {state}")]
    InvalidTransition {
        operation: &'static str,
        state: &'static str,
    },
}

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

/// Where the session currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Prompt shown, response hidden.
    Presenting { position: usize },
    /// Response shown, waiting for the user to classify their answer.
    Revealed { position: usize },
    /// Every item has been answered.
    Complete,
}

impl SessionState {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Presenting { .. } => "presenting",
            SessionState::Revealed { .. } => "revealed",
            SessionState::Complete => "complete",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Presenting { position } => write!(f, "presenting item {position}"),
            SessionState::Revealed { position } => write!(f, "revealed item {position}"),
            SessionState::Complete => f.write_str("complete"),
        }
    }
}

/// Running count of answers in this session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tally {
    pub correct: u32,
    pub incorrect: u32,
}

impl Tally {
    #[must_use]
    pub fn answered(&self) -> u32 {
        self.correct.saturating_add(self.incorrect)
    }

    #[must_use]
    pub fn xp_earned(&self) -> u32 {
        self.correct.saturating_mul(XP_PER_CORRECT_ANSWER)
    }
}

/// Side effects requested by the session, in the order they occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The item's stored counters should become `times_studied` / `times_correct`.
    ItemAnswered {
        item_id: ItemId,
        is_correct: bool,
        times_studied: u32,
        times_correct: u32,
    },
    /// Credit XP to the learner's progress.
    XpAward { amount: u32 },
    /// Emitted once, when the last item is answered.
    SessionCompleted {
        total_correct: u32,
        total_incorrect: u32,
        xp_earned: u32,
    },
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// In-memory study session over a fixed list of items.
#[derive(Debug, Clone)]
pub struct StudySession {
    items: Vec<StudyItem>,
    state: SessionState,
    tally: Tally,
    // Counters already emitted for items answered earlier in this session, so a
    // repeated item builds on its previous answer rather than the stale snapshot.
    answered: HashMap<ItemId, StudyStats>,
}

impl StudySession {
    /// Start a session at the first item.
    ///
    /// # Errors
    ///
    /// Returns `StudySessionError::EmptySession` if `items` is empty.
    pub fn new(items: Vec<StudyItem>) -> Result<Self, StudySessionError> {
        if items.is_empty() {
            return Err(StudySessionError::EmptySession);
        }
        Ok(Self {
            items,
            state: SessionState::Presenting { position: 0 },
            tally: Tally::default(),
            answered: HashMap::new(),
        })
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn tally(&self) -> Tally {
        self.tally
    }

    #[must_use]
    pub fn items(&self) -> &[StudyItem] {
        &self.items
    }

    /// Number of items in the session. Never zero.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Always false; present for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Index of the current item, or `len()` once complete.
    #[must_use]
    pub fn position(&self) -> usize {
        match self.state {
            SessionState::Presenting { position } | SessionState::Revealed { position } => position,
            SessionState::Complete => self.items.len(),
        }
    }

    #[must_use]
    pub fn is_revealed(&self) -> bool {
        matches!(self.state, SessionState::Revealed { .. })
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self.state, SessionState::Complete)
    }

    /// The item being studied, or `None` once complete.
    #[must_use]
    pub fn current_item(&self) -> Option<&StudyItem> {
        match self.state {
            SessionState::Presenting { position } | SessionState::Revealed { position } => {
                self.items.get(position)
            }
            SessionState::Complete => None,
        }
    }

    /// XP awarded so far in this session.
    #[must_use]
    pub fn xp_awarded(&self) -> u32 {
        self.tally.xp_earned()
    }

    /// Display-only progress in `[0, 1]`; a revealed item counts as half done.
    #[must_use]
    pub fn progress_fraction(&self) -> f64 {
        let len = self.items.len();
        let halves = match self.state {
            SessionState::Presenting { position } => position * 2,
            SessionState::Revealed { position } => position * 2 + 1,
            SessionState::Complete => return 1.0,
        };
        to_f64(halves) / to_f64(len * 2)
    }

    /// Show the current item's response. A second call while revealed is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `StudySessionError::InvalidTransition` once the session is complete.
    pub fn reveal(&mut self) -> Result<(), StudySessionError> {
        match self.state {
            SessionState::Presenting { position } => {
                self.state = SessionState::Revealed { position };
                Ok(())
            }
            SessionState::Revealed { .. } => Ok(()),
            SessionState::Complete => Err(self.invalid("reveal")),
        }
    }

    /// Classify the revealed item and move on.
    ///
    /// Returns the events produced by this answer: always an `ItemAnswered`,
    /// an `XpAward` when correct, and a `SessionCompleted` after the last item.
    ///
    /// # Errors
    ///
    /// Returns `StudySessionError::InvalidTransition` unless the current item
    /// has been revealed. The tally is left unchanged in that case.
    pub fn answer(&mut self, is_correct: bool) -> Result<Vec<SessionEvent>, StudySessionError> {
        let SessionState::Revealed { position } = self.state else {
            return Err(self.invalid("answer"));
        };
        let item = &self.items[position];
        let item_id = item.id();

        let stats = self
            .answered
            .get(&item_id)
            .copied()
            .unwrap_or_else(|| item.stats())
            .record(is_correct);
        self.answered.insert(item_id, stats);

        let mut events = Vec::with_capacity(3);
        events.push(SessionEvent::ItemAnswered {
            item_id,
            is_correct,
            times_studied: stats.times_studied(),
            times_correct: stats.times_correct(),
        });

        if is_correct {
            self.tally.correct = self.tally.correct.saturating_add(1);
            events.push(SessionEvent::XpAward {
                amount: XP_PER_CORRECT_ANSWER,
            });
        } else {
            self.tally.incorrect = self.tally.incorrect.saturating_add(1);
        }

        let next = position + 1;
        if next < self.items.len() {
            self.state = SessionState::Presenting { position: next };
        } else {
            self.state = SessionState::Complete;
            events.push(SessionEvent::SessionCompleted {
                total_correct: self.tally.correct,
                total_incorrect: self.tally.incorrect,
                xp_earned: self.tally.xp_earned(),
            });
        }

        Ok(events)
    }

    fn invalid(&self, operation: &'static str) -> StudySessionError {
        StudySessionError::InvalidTransition {
            operation,
            state: self.state.name(),
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn to_f64(value: usize) -> f64 {
    value as f64
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
