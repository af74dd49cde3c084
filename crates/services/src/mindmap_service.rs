use std::sync::Arc;

use storage::repository::MindmapRepository;
use tellect_core::model::{Mindmap, MindmapDraft, MindmapId, UserId};

use crate::Clock;
use crate::error::MindmapServiceError;

/// Owner-scoped persistence of mindmaps.
#[derive(Clone)]
pub struct MindmapService {
    clock: Clock,
    mindmaps: Arc<dyn MindmapRepository>,
}

impl MindmapService {
    #[must_use]
    pub fn new(clock: Clock, mindmaps: Arc<dyn MindmapRepository>) -> Self {
        Self { clock, mindmaps }
    }

    /// Validate and persist a mindmap.
    ///
    /// # Errors
    ///
    /// Returns `MindmapServiceError::Mindmap` for a malformed graph and
    /// `MindmapServiceError::Storage` if persistence fails.
    pub async fn create_mindmap(
        &self,
        owner: UserId,
        draft: MindmapDraft,
    ) -> Result<Mindmap, MindmapServiceError> {
        let mindmap = draft.validate(MindmapId::random(), owner, self.clock.now())?;
        self.mindmaps.insert_mindmap(&mindmap).await?;
        Ok(mindmap)
    }

    /// # Errors
    ///
    /// Returns `MindmapServiceError::Storage` on repository failures.
    pub async fn list_mindmaps(&self, owner: UserId) -> Result<Vec<Mindmap>, MindmapServiceError> {
        Ok(self.mindmaps.list_mindmaps(owner).await?)
    }

    /// # Errors
    ///
    /// Returns `MindmapServiceError::Storage` if the mindmap is missing.
    pub async fn get_mindmap(
        &self,
        owner: UserId,
        id: MindmapId,
    ) -> Result<Mindmap, MindmapServiceError> {
        Ok(self.mindmaps.get_mindmap(owner, id).await?)
    }

    /// # Errors
    ///
    /// Returns `MindmapServiceError::Storage` if the mindmap is missing.
    pub async fn delete_mindmap(
        &self,
        owner: UserId,
        id: MindmapId,
    ) -> Result<(), MindmapServiceError> {
        Ok(self.mindmaps.delete_mindmap(owner, id).await?)
    }
}
