use std::sync::Arc;

use storage::repository::{
    MindmapRepository, ProgressRepository, StudyItemRepository, StudySessionRepository,
    StudySessionRow,
};
use tellect_core::model::{Profile, StudyItem, StudyStats, Subject, UserId};
use tellect_core::scoring::{self, TopicMastery};

use crate::Clock;
use crate::error::ProgressServiceError;

/// Number of recent sessions shown on the dashboard.
pub const RECENT_SESSIONS_LIMIT: u32 = 5;

/// Everything the progress screen shows for one learner.
#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub display_name: String,
    pub xp: u64,
    pub level: u32,
    /// Fraction of the current level already earned, in `[0, 1)`.
    pub level_progress: f64,
    pub xp_to_next_level: u64,
    pub item_count: u32,
    pub total_studied: u64,
    pub average_accuracy: u32,
    /// Per-subject mastery, only for subjects with at least one answer.
    pub subject_mastery: Vec<TopicMastery>,
    /// `None` until some subject has been studied.
    pub average_mastery: Option<f64>,
    pub mindmap_count: u32,
    pub recent_sessions: Vec<StudySessionRow>,
}

/// XP bookkeeping and the dashboard read model.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    progress: Arc<dyn ProgressRepository>,
    items: Arc<dyn StudyItemRepository>,
    sessions: Arc<dyn StudySessionRepository>,
    mindmaps: Arc<dyn MindmapRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(
        clock: Clock,
        progress: Arc<dyn ProgressRepository>,
        items: Arc<dyn StudyItemRepository>,
        sessions: Arc<dyn StudySessionRepository>,
        mindmaps: Arc<dyn MindmapRepository>,
    ) -> Self {
        Self {
            clock,
            progress,
            items,
            sessions,
            mindmaps,
        }
    }

    /// Return the user's profile, creating a zero-XP one if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` on repository failures.
    pub async fn ensure_profile(
        &self,
        user: UserId,
        username: Option<String>,
    ) -> Result<Profile, ProgressServiceError> {
        if let Some(existing) = self.progress.get_profile(user).await? {
            return Ok(existing);
        }
        let profile = Profile::new(user, username, self.clock.now());
        self.progress.upsert_profile(&profile).await?;
        log::info!("created profile {user}");
        Ok(profile)
    }

    /// # Errors
    ///
    /// Returns `ProgressServiceError::MissingProfile` if the user has no profile.
    pub async fn profile(&self, user: UserId) -> Result<Profile, ProgressServiceError> {
        self.progress
            .get_profile(user)
            .await?
            .ok_or(ProgressServiceError::MissingProfile)
    }

    /// The oldest local profile, if any exists.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` on repository failures.
    pub async fn first_profile(&self) -> Result<Option<Profile>, ProgressServiceError> {
        Ok(self.progress.list_profiles(1).await?.into_iter().next())
    }

    /// Credit XP and return the updated profile.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the profile is missing or the write fails.
    pub async fn award_xp(&self, user: UserId, amount: u32) -> Result<Profile, ProgressServiceError> {
        let profile = self.progress.add_xp(user, amount, self.clock.now()).await?;
        log::debug!("awarded {amount} XP to {user}, total {}", profile.xp());
        Ok(profile)
    }

    /// Gather the dashboard numbers for a user.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::MissingProfile` if the user has no profile
    /// and `ProgressServiceError::Storage` on repository failures.
    pub async fn dashboard(&self, user: UserId) -> Result<Dashboard, ProgressServiceError> {
        let profile = self.profile(user).await?;
        let items = self.items.list_items(user, None).await?;
        let mindmaps = self.mindmaps.list_mindmaps(user).await?;
        let recent_sessions = self
            .sessions
            .list_sessions(user, RECENT_SESSIONS_LIMIT)
            .await?;

        let stats: Vec<StudyStats> = items.iter().map(StudyItem::stats).collect();
        let total_studied = stats.iter().map(|s| u64::from(s.times_studied())).sum();
        let subject_mastery = subject_mastery(&items);

        Ok(Dashboard {
            display_name: profile.display_name().to_string(),
            xp: profile.xp(),
            level: profile.level(),
            level_progress: scoring::level_progress(profile.xp()),
            xp_to_next_level: scoring::xp_to_next_level(profile.xp()),
            item_count: count(items.len()),
            total_studied,
            average_accuracy: scoring::average_accuracy(&stats),
            average_mastery: scoring::average_mastery(&subject_mastery),
            subject_mastery,
            mindmap_count: count(mindmaps.len()),
            recent_sessions,
        })
    }
}

impl Dashboard {
    /// Studied subjects whose mastery is still below the target.
    pub fn areas_to_improve(&self) -> impl Iterator<Item = &TopicMastery> {
        self.subject_mastery
            .iter()
            .filter(|topic| topic.needs_improvement())
    }
}

fn subject_mastery(items: &[StudyItem]) -> Vec<TopicMastery> {
    Subject::ALL
        .into_iter()
        .filter_map(|subject| {
            let stats: Vec<StudyStats> = items
                .iter()
                .filter(|item| item.subject() == subject)
                .map(StudyItem::stats)
                .collect();
            TopicMastery::from_stats(subject.as_str(), &stats)
        })
        .collect()
}

fn count(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}
