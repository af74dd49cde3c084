use std::sync::Arc;

use storage::repository::Storage;
use tellect_core::model::UserId;

use crate::Clock;
use crate::content_service::ContentService;
use crate::error::{AppServicesError, ProgressServiceError};
use crate::generation::GenerationService;
use crate::mindmap_service::MindmapService;
use crate::notify::Notifier;
use crate::progress_service::ProgressService;
use crate::sessions::StudyLoopService;
use crate::study_item_service::StudyItemService;

/// Assembles app-facing services and resolves the active learner.
#[derive(Clone)]
pub struct AppServices {
    user: UserId,
    created_profile: bool,
    study_loop: Arc<StudyLoopService>,
    items: Arc<StudyItemService>,
    mindmaps: Arc<MindmapService>,
    progress: Arc<ProgressService>,
    generation: Arc<GenerationService>,
    content: Arc<ContentService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization or profile setup fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        preferred_user: Option<UserId>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Self::from_storage(
            storage,
            clock,
            preferred_user,
            notifier,
            GenerationService::from_env(),
        )
        .await
    }

    /// Build services over an existing storage aggregate.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the learner profile cannot be resolved.
    pub async fn from_storage(
        storage: Storage,
        clock: Clock,
        preferred_user: Option<UserId>,
        notifier: Arc<dyn Notifier>,
        generation: GenerationService,
    ) -> Result<Self, AppServicesError> {
        let progress = Arc::new(ProgressService::new(
            clock,
            Arc::clone(&storage.progress),
            Arc::clone(&storage.items),
            Arc::clone(&storage.sessions),
            Arc::clone(&storage.mindmaps),
        ));
        let (user, created_profile) = ensure_learner(&progress, preferred_user).await?;

        let study_loop = Arc::new(
            StudyLoopService::new(
                clock,
                Arc::clone(&storage.items),
                Arc::clone(&storage.progress),
                Arc::clone(&storage.sessions),
            )
            .with_notifier(notifier),
        );
        let items = Arc::new(StudyItemService::new(clock, Arc::clone(&storage.items)));
        let mindmaps = Arc::new(MindmapService::new(clock, Arc::clone(&storage.mindmaps)));
        let content = Arc::new(ContentService::new(
            clock,
            Arc::clone(&storage.items),
            Arc::clone(&storage.mindmaps),
            Arc::clone(&storage.progress),
        ));

        Ok(Self {
            user,
            created_profile,
            study_loop,
            items,
            mindmaps,
            progress,
            generation: Arc::new(generation),
            content,
        })
    }

    #[must_use]
    pub fn user(&self) -> UserId {
        self.user
    }

    /// Whether resolving the learner created a fresh profile.
    #[must_use]
    pub fn created_profile(&self) -> bool {
        self.created_profile
    }

    #[must_use]
    pub fn study_loop(&self) -> Arc<StudyLoopService> {
        Arc::clone(&self.study_loop)
    }

    #[must_use]
    pub fn items(&self) -> Arc<StudyItemService> {
        Arc::clone(&self.items)
    }

    #[must_use]
    pub fn mindmaps(&self) -> Arc<MindmapService> {
        Arc::clone(&self.mindmaps)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn generation(&self) -> Arc<GenerationService> {
        Arc::clone(&self.generation)
    }

    #[must_use]
    pub fn content(&self) -> Arc<ContentService> {
        Arc::clone(&self.content)
    }
}

async fn ensure_learner(
    progress: &ProgressService,
    preferred: Option<UserId>,
) -> Result<(UserId, bool), AppServicesError> {
    if let Some(user) = preferred {
        let existed = match progress.profile(user).await {
            Ok(_) => true,
            Err(ProgressServiceError::MissingProfile) => false,
            Err(e) => return Err(e.into()),
        };
        progress.ensure_profile(user, None).await?;
        return Ok((user, !existed));
    }

    if let Some(first) = progress.first_profile().await? {
        return Ok((first.user_id(), false));
    }

    let profile = progress.ensure_profile(UserId::random(), None).await?;
    Ok((profile.user_id(), true))
}
