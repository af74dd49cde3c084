use std::fmt::Display;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use storage::repository::{
    ProgressRepository, StudyItemRepository, StudySessionId, StudySessionRepository,
};
use tellect_core::model::{StudyItem, StudySessionRecord, StudyStats, Subject, UserId};
use tellect_core::{SessionEvent, StudySession, StudySessionError};

use super::active::ActiveSession;
use crate::Clock;
use crate::error::SessionError;
use crate::notify::{LogNotifier, Notice, Notifier};

/// Result of answering a single item in a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionAnswerResult {
    pub events: Vec<SessionEvent>,
    pub is_complete: bool,
    pub record_id: Option<StudySessionId>,
    /// Side effects of this answer that could not be persisted.
    pub failed_effects: u32,
}

/// Orchestrates session start and persisted answering.
#[derive(Clone)]
pub struct StudyLoopService {
    clock: Clock,
    items: Arc<dyn StudyItemRepository>,
    progress: Arc<dyn ProgressRepository>,
    sessions: Arc<dyn StudySessionRepository>,
    notifier: Arc<dyn Notifier>,
    shuffle: bool,
}

impl StudyLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        items: Arc<dyn StudyItemRepository>,
        progress: Arc<dyn ProgressRepository>,
        sessions: Arc<dyn StudySessionRepository>,
    ) -> Self {
        Self {
            clock,
            items,
            progress,
            sessions,
            notifier: Arc::new(LogNotifier),
            shuffle: false,
        }
    }

    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    #[must_use]
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Start a session over the owner's items, newest first unless shuffling.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Session(StudySessionError::EmptySession)` when no
    /// items match, or `SessionError::Storage` if the items cannot be loaded.
    pub async fn start_session(
        &self,
        owner: UserId,
        subject: Option<Subject>,
    ) -> Result<ActiveSession, SessionError> {
        let mut items = self.items.list_items(owner, subject).await?;
        if self.shuffle {
            items.shuffle(&mut rand::rng());
        }
        self.start_with_items(owner, items)
    }

    /// Start a session over a caller-supplied list, in the given order.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Session(StudySessionError::EmptySession)` for an empty list.
    pub fn start_with_items(
        &self,
        owner: UserId,
        items: Vec<StudyItem>,
    ) -> Result<ActiveSession, SessionError> {
        let engine = StudySession::new(items)?;
        log::debug!("starting study session with {} items", engine.len());
        Ok(ActiveSession::new(owner, self.clock.now(), engine))
    }

    /// Show the answer for the current item.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Session` if the session is already complete.
    pub fn reveal(&self, session: &mut ActiveSession) -> Result<(), SessionError> {
        session.engine.reveal()?;
        Ok(())
    }

    /// Answer the current item and persist the resulting side effects.
    ///
    /// Persistence failures are logged, counted on the session and reported
    /// to the notifier; the session still advances.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Session` if the current item has not been revealed
    /// or the session is already complete.
    pub async fn answer_current(
        &self,
        session: &mut ActiveSession,
        is_correct: bool,
    ) -> Result<SessionAnswerResult, SessionError> {
        let answered_at = self.clock.now();
        let events = session.engine.answer(is_correct)?;

        let mut failed_effects = 0;
        for event in &events {
            if let Err(e) = self.apply_event(session, event, answered_at).await {
                failed_effects += 1;
                self.report_failure(session, &e);
            }
        }

        Ok(SessionAnswerResult {
            events,
            is_complete: session.is_complete(),
            record_id: session.record_id,
            failed_effects,
        })
    }

    /// Retry record persistence after a completed session.
    ///
    /// This is useful when the final record append failed.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Session` if the session is not complete.
    /// Returns `SessionError::Domain` if the record is inconsistent and
    /// `SessionError::Storage` if persistence fails again.
    pub async fn finalize_record(
        &self,
        session: &mut ActiveSession,
    ) -> Result<StudySessionId, SessionError> {
        if let Some(id) = session.record_id {
            return Ok(id);
        }
        let Some(completed_at) = session.completed_at else {
            return Err(StudySessionError::InvalidTransition {
                operation: "finalize",
                state: session.engine.state().name(),
            }
            .into());
        };
        let tally = session.tally();
        self.append_record(session, completed_at, tally.correct, tally.incorrect)
            .await
    }

    async fn apply_event(
        &self,
        session: &mut ActiveSession,
        event: &SessionEvent,
        at: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        match *event {
            SessionEvent::ItemAnswered {
                item_id,
                times_studied,
                times_correct,
                ..
            } => {
                let stats = StudyStats::new(times_studied, times_correct)
                    .map_err(tellect_core::Error::from)?;
                self.items
                    .update_stats(session.owner, item_id, stats, at)
                    .await?;
                Ok(())
            }
            SessionEvent::XpAward { amount } => {
                self.progress.add_xp(session.owner, amount, at).await?;
                Ok(())
            }
            SessionEvent::SessionCompleted {
                total_correct,
                total_incorrect,
                xp_earned,
            } => {
                session.completed_at = Some(at);
                self.notifier.notify(Notice::success(format!(
                    "Session completed! Earned {xp_earned} XP"
                )));
                self.append_record(session, at, total_correct, total_incorrect)
                    .await?;
                Ok(())
            }
        }
    }

    async fn append_record(
        &self,
        session: &mut ActiveSession,
        completed_at: DateTime<Utc>,
        correct: u32,
        incorrect: u32,
    ) -> Result<StudySessionId, SessionError> {
        let record = StudySessionRecord::from_tally(
            session.owner,
            session.started_at,
            completed_at,
            correct,
            incorrect,
        )
        .map_err(tellect_core::Error::from)?;
        let id = self.sessions.append_session(&record).await?;
        session.record_id = Some(id);
        log::debug!("persisted study session record {id}");
        Ok(id)
    }

    fn report_failure(&self, session: &mut ActiveSession, error: &impl Display) {
        session.persistence_failures = session.persistence_failures.saturating_add(1);
        log::warn!("failed to persist study progress: {error}");
        self.notifier
            .notify(Notice::error(format!("Could not save progress: {error}")));
    }
}
