use std::sync::Arc;

use storage::repository::StudyItemRepository;
use tellect_core::model::{ItemId, StudyItem, StudyItemDraft, Subject, UserId};

use crate::Clock;
use crate::error::StudyItemServiceError;

/// Owner-scoped creation, editing and removal of study items.
#[derive(Clone)]
pub struct StudyItemService {
    clock: Clock,
    items: Arc<dyn StudyItemRepository>,
}

impl StudyItemService {
    #[must_use]
    pub fn new(clock: Clock, items: Arc<dyn StudyItemRepository>) -> Self {
        Self { clock, items }
    }

    /// Validate a draft and persist it as a new item.
    ///
    /// # Errors
    ///
    /// Returns `StudyItemServiceError::Item` for invalid text and
    /// `StudyItemServiceError::Storage` if persistence fails.
    pub async fn create_item(
        &self,
        owner: UserId,
        draft: StudyItemDraft,
    ) -> Result<StudyItem, StudyItemServiceError> {
        let item = draft.validate(ItemId::random(), owner, self.clock.now())?;
        self.items.insert_item(&item).await?;
        log::debug!("created study item {}", item.id());
        Ok(item)
    }

    /// List the owner's items, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StudyItemServiceError::Storage` on repository failures.
    pub async fn list_items(
        &self,
        owner: UserId,
        subject: Option<Subject>,
    ) -> Result<Vec<StudyItem>, StudyItemServiceError> {
        Ok(self.items.list_items(owner, subject).await?)
    }

    /// # Errors
    ///
    /// Returns `StudyItemServiceError::Storage` if the item is missing.
    pub async fn get_item(
        &self,
        owner: UserId,
        id: ItemId,
    ) -> Result<StudyItem, StudyItemServiceError> {
        Ok(self.items.get_item(owner, id).await?)
    }

    /// Replace an item's text, subject and difficulty. Study counters are kept.
    ///
    /// # Errors
    ///
    /// Returns `StudyItemServiceError::Item` for invalid text and
    /// `StudyItemServiceError::Storage` if the item is missing.
    pub async fn edit_item(
        &self,
        owner: UserId,
        id: ItemId,
        draft: StudyItemDraft,
    ) -> Result<StudyItem, StudyItemServiceError> {
        let mut item = self.items.get_item(owner, id).await?;
        item.apply_edit(draft, self.clock.now())?;
        self.items.update_item(&item).await?;
        Ok(item)
    }

    /// # Errors
    ///
    /// Returns `StudyItemServiceError::Storage` if the item is missing.
    pub async fn delete_item(&self, owner: UserId, id: ItemId) -> Result<(), StudyItemServiceError> {
        self.items.delete_item(owner, id).await?;
        log::debug!("deleted study item {id}");
        Ok(())
    }
}
