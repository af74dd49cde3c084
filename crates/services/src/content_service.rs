use std::sync::Arc;

use storage::repository::{MindmapRepository, ProgressRepository, StudyItemRepository};
use tellect_core::model::{
    Difficulty, ItemId, Mindmap, MindmapId, StudyItem, StudyItemDraft, Subject, UserId,
};
use tellect_core::scoring::{XP_FOR_SAVED_FLASHCARDS, XP_FOR_SAVED_MINDMAP};

use crate::Clock;
use crate::error::ContentServiceError;
use crate::generation::{GeneratedFlashcards, GeneratedMindmap};

/// What a save produced and the XP it earned.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedContent<T> {
    pub content: T,
    pub xp_awarded: u32,
}

/// Persists generated content and credits the learner for it.
#[derive(Clone)]
pub struct ContentService {
    clock: Clock,
    items: Arc<dyn StudyItemRepository>,
    mindmaps: Arc<dyn MindmapRepository>,
    progress: Arc<dyn ProgressRepository>,
}

impl ContentService {
    #[must_use]
    pub fn new(
        clock: Clock,
        items: Arc<dyn StudyItemRepository>,
        mindmaps: Arc<dyn MindmapRepository>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            clock,
            items,
            mindmaps,
            progress,
        }
    }

    /// Store every generated flashcard as a medium-difficulty item and award XP once.
    ///
    /// All cards are validated before anything is written.
    ///
    /// # Errors
    ///
    /// Returns `ContentServiceError::NothingToSave` for an empty batch,
    /// `ContentServiceError::Item` if a card has blank text, and
    /// `ContentServiceError::Storage` if persistence fails.
    pub async fn save_flashcards(
        &self,
        owner: UserId,
        subject: Subject,
        generated: GeneratedFlashcards,
    ) -> Result<SavedContent<Vec<StudyItem>>, ContentServiceError> {
        if generated.flashcards.is_empty() {
            return Err(ContentServiceError::NothingToSave);
        }

        let now = self.clock.now();
        let items = generated
            .flashcards
            .into_iter()
            .map(|card| {
                StudyItemDraft::new(card.question, card.answer, subject)
                    .with_difficulty(Difficulty::Medium)
                    .validate(ItemId::random(), owner, now)
            })
            .collect::<Result<Vec<_>, _>>()?;

        for item in &items {
            self.items.insert_item(item).await?;
        }
        self.progress
            .add_xp(owner, XP_FOR_SAVED_FLASHCARDS, now)
            .await?;
        log::info!("saved {} generated flashcards", items.len());

        Ok(SavedContent {
            content: items,
            xp_awarded: XP_FOR_SAVED_FLASHCARDS,
        })
    }

    /// Validate and store a generated mindmap, then award XP.
    ///
    /// # Errors
    ///
    /// Returns `ContentServiceError::Mindmap` for a malformed graph and
    /// `ContentServiceError::Storage` if persistence fails.
    pub async fn save_mindmap(
        &self,
        owner: UserId,
        generated: GeneratedMindmap,
    ) -> Result<SavedContent<Mindmap>, ContentServiceError> {
        let now = self.clock.now();
        let mindmap = generated
            .mindmap
            .validate(MindmapId::random(), owner, now)?;
        self.mindmaps.insert_mindmap(&mindmap).await?;
        self.progress
            .add_xp(owner, XP_FOR_SAVED_MINDMAP, now)
            .await?;
        log::info!("saved generated mindmap {:?}", mindmap.title());

        Ok(SavedContent {
            content: mindmap,
            xp_awarded: XP_FOR_SAVED_MINDMAP,
        })
    }
}
