use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tellect_core::model::{
    ItemId, Mindmap, MindmapId, Profile, StudyItem, StudySessionRecord, StudyStats, Subject,
    UserId,
};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Storage identifier for a persisted study session record.
///
/// NOTE: This is `i64` to match `SQLite` row IDs.
pub type StudySessionId = i64;

/// A persisted session record together with its row id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudySessionRow {
    pub id: StudySessionId,
    pub record: StudySessionRecord,
}

impl StudySessionRow {
    #[must_use]
    pub fn new(id: StudySessionId, record: StudySessionRecord) -> Self {
        Self { id, record }
    }
}

/// Owner-scoped persistence for study items.
#[async_trait]
pub trait StudyItemRepository: Send + Sync {
    /// Persist a new item.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if an item with the same id exists.
    async fn insert_item(&self, item: &StudyItem) -> Result<(), StorageError>;

    /// Fetch one of the owner's items.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the item does not exist or belongs to someone else.
    async fn get_item(&self, owner: UserId, id: ItemId) -> Result<StudyItem, StorageError>;

    /// List the owner's items, newest first, optionally restricted to one subject.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_items(
        &self,
        owner: UserId,
        subject: Option<Subject>,
    ) -> Result<Vec<StudyItem>, StorageError>;

    /// Overwrite the editable fields of an existing item.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the owner has no such item.
    async fn update_item(&self, item: &StudyItem) -> Result<(), StorageError>;

    /// Store new study counters for one of the owner's items.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the owner has no such item.
    async fn update_stats(
        &self,
        owner: UserId,
        id: ItemId,
        stats: StudyStats,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// Delete one of the owner's items.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the owner has no such item.
    async fn delete_item(&self, owner: UserId, id: ItemId) -> Result<(), StorageError>;
}

/// XP/level store keyed by user.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_profile(&self, user: UserId) -> Result<Option<Profile>, StorageError>;

    /// Create or replace a profile.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn upsert_profile(&self, profile: &Profile) -> Result<(), StorageError>;

    /// List profiles, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_profiles(&self, limit: u32) -> Result<Vec<Profile>, StorageError>;

    /// Add XP to a profile and return the updated profile.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the user has no profile.
    async fn add_xp(
        &self,
        user: UserId,
        amount: u32,
        at: DateTime<Utc>,
    ) -> Result<Profile, StorageError>;
}

/// Append-only log of completed study sessions.
#[async_trait]
pub trait StudySessionRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn append_session(
        &self,
        record: &StudySessionRecord,
    ) -> Result<StudySessionId, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no record has this id.
    async fn get_session(&self, id: StudySessionId) -> Result<StudySessionRecord, StorageError>;

    /// Most recent sessions for a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_sessions(
        &self,
        user: UserId,
        limit: u32,
    ) -> Result<Vec<StudySessionRow>, StorageError>;
}

/// Owner-scoped persistence for mindmaps.
#[async_trait]
pub trait MindmapRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if a mindmap with the same id exists.
    async fn insert_mindmap(&self, mindmap: &Mindmap) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the owner has no such mindmap.
    async fn get_mindmap(&self, owner: UserId, id: MindmapId) -> Result<Mindmap, StorageError>;

    /// The owner's mindmaps, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_mindmaps(&self, owner: UserId) -> Result<Vec<Mindmap>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the owner has no such mindmap.
    async fn delete_mindmap(&self, owner: UserId, id: MindmapId) -> Result<(), StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

/// Simple in-memory repository implementation for testing and prototyping.
///
/// Items and mindmaps are kept in insertion order so "newest first" listings
/// are stable when timestamps tie.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    items: Arc<Mutex<Vec<StudyItem>>>,
    profiles: Arc<Mutex<HashMap<UserId, Profile>>>,
    sessions: Arc<Mutex<Vec<StudySessionRecord>>>,
    mindmaps: Arc<Mutex<Vec<Mindmap>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StorageError> {
    mutex
        .lock()
        .map_err(|e| StorageError::Connection(e.to_string()))
}

fn newest_first<T: Clone>(
    rows: &[T],
    keep: impl Fn(&T) -> bool,
    created_at: impl Fn(&T) -> DateTime<Utc>,
) -> Vec<T> {
    let mut out: Vec<T> = rows.iter().rev().filter(|r| keep(r)).cloned().collect();
    out.sort_by_key(|r| std::cmp::Reverse(created_at(r)));
    out
}

#[async_trait]
impl StudyItemRepository for InMemoryRepository {
    async fn insert_item(&self, item: &StudyItem) -> Result<(), StorageError> {
        let mut guard = lock(&self.items)?;
        if guard.iter().any(|existing| existing.id() == item.id()) {
            return Err(StorageError::Conflict);
        }
        guard.push(item.clone());
        Ok(())
    }

    async fn get_item(&self, owner: UserId, id: ItemId) -> Result<StudyItem, StorageError> {
        let guard = lock(&self.items)?;
        guard
            .iter()
            .find(|item| item.id() == id && item.owner() == owner)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn list_items(
        &self,
        owner: UserId,
        subject: Option<Subject>,
    ) -> Result<Vec<StudyItem>, StorageError> {
        let guard = lock(&self.items)?;
        Ok(newest_first(
            &guard,
            |item| item.owner() == owner && subject.is_none_or(|s| item.subject() == s),
            StudyItem::created_at,
        ))
    }

    async fn update_item(&self, item: &StudyItem) -> Result<(), StorageError> {
        let mut guard = lock(&self.items)?;
        let slot = guard
            .iter_mut()
            .find(|existing| existing.id() == item.id() && existing.owner() == item.owner())
            .ok_or(StorageError::NotFound)?;
        *slot = item.clone();
        Ok(())
    }

    async fn update_stats(
        &self,
        owner: UserId,
        id: ItemId,
        stats: StudyStats,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut guard = lock(&self.items)?;
        let item = guard
            .iter_mut()
            .find(|item| item.id() == id && item.owner() == owner)
            .ok_or(StorageError::NotFound)?;
        item.set_stats(stats, updated_at);
        Ok(())
    }

    async fn delete_item(&self, owner: UserId, id: ItemId) -> Result<(), StorageError> {
        let mut guard = lock(&self.items)?;
        let before = guard.len();
        guard.retain(|item| !(item.id() == id && item.owner() == owner));
        if guard.len() == before {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn get_profile(&self, user: UserId) -> Result<Option<Profile>, StorageError> {
        let guard = lock(&self.profiles)?;
        Ok(guard.get(&user).cloned())
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<(), StorageError> {
        let mut guard = lock(&self.profiles)?;
        guard.insert(profile.user_id(), profile.clone());
        Ok(())
    }

    async fn list_profiles(&self, limit: u32) -> Result<Vec<Profile>, StorageError> {
        let guard = lock(&self.profiles)?;
        let mut out: Vec<Profile> = guard.values().cloned().collect();
        out.sort_by_key(|p| (p.created_at(), p.user_id()));
        out.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(out)
    }

    async fn add_xp(
        &self,
        user: UserId,
        amount: u32,
        at: DateTime<Utc>,
    ) -> Result<Profile, StorageError> {
        let mut guard = lock(&self.profiles)?;
        let profile = guard.get_mut(&user).ok_or(StorageError::NotFound)?;
        profile.add_xp(amount, at);
        Ok(profile.clone())
    }
}

#[async_trait]
impl StudySessionRepository for InMemoryRepository {
    async fn append_session(
        &self,
        record: &StudySessionRecord,
    ) -> Result<StudySessionId, StorageError> {
        let mut guard = lock(&self.sessions)?;
        guard.push(record.clone());
        StudySessionId::try_from(guard.len())
            .map_err(|_| StorageError::Serialization("session id overflow".into()))
    }

    async fn get_session(&self, id: StudySessionId) -> Result<StudySessionRecord, StorageError> {
        let guard = lock(&self.sessions)?;
        usize::try_from(id)
            .ok()
            .and_then(|id| id.checked_sub(1))
            .and_then(|idx| guard.get(idx))
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn list_sessions(
        &self,
        user: UserId,
        limit: u32,
    ) -> Result<Vec<StudySessionRow>, StorageError> {
        let guard = lock(&self.sessions)?;
        let mut rows = Vec::new();
        for (idx, record) in guard.iter().enumerate().rev() {
            if record.user_id() != user {
                continue;
            }
            let id = StudySessionId::try_from(idx + 1)
                .map_err(|_| StorageError::Serialization("session id overflow".into()))?;
            rows.push(StudySessionRow::new(id, record.clone()));
        }
        rows.sort_by_key(|row| std::cmp::Reverse(row.record.completed_at()));
        rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(rows)
    }
}

#[async_trait]
impl MindmapRepository for InMemoryRepository {
    async fn insert_mindmap(&self, mindmap: &Mindmap) -> Result<(), StorageError> {
        let mut guard = lock(&self.mindmaps)?;
        if guard.iter().any(|existing| existing.id() == mindmap.id()) {
            return Err(StorageError::Conflict);
        }
        guard.push(mindmap.clone());
        Ok(())
    }

    async fn get_mindmap(&self, owner: UserId, id: MindmapId) -> Result<Mindmap, StorageError> {
        let guard = lock(&self.mindmaps)?;
        guard
            .iter()
            .find(|map| map.id() == id && map.owner() == owner)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn list_mindmaps(&self, owner: UserId) -> Result<Vec<Mindmap>, StorageError> {
        let guard = lock(&self.mindmaps)?;
        Ok(newest_first(
            &guard,
            |map| map.owner() == owner,
            Mindmap::created_at,
        ))
    }

    async fn delete_mindmap(&self, owner: UserId, id: MindmapId) -> Result<(), StorageError> {
        let mut guard = lock(&self.mindmaps)?;
        let before = guard.len();
        guard.retain(|map| !(map.id() == id && map.owner() == owner));
        if guard.len() == before {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub items: Arc<dyn StudyItemRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub sessions: Arc<dyn StudySessionRepository>,
    pub mindmaps: Arc<dyn MindmapRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            items: Arc::new(repo.clone()),
            progress: Arc::new(repo.clone()),
            sessions: Arc::new(repo.clone()),
            mindmaps: Arc::new(repo),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tellect_core::model::{StudyItemDraft, Subject};
    use tellect_core::time::fixed_now;

    fn build_item(owner: UserId, prompt: &str, subject: Subject, offset_secs: i64) -> StudyItem {
        StudyItemDraft::new(prompt, "A", subject)
            .validate(
                ItemId::random(),
                owner,
                fixed_now() + Duration::seconds(offset_secs),
            )
            .unwrap()
    }

    #[tokio::test]
    async fn lists_items_newest_first_and_filters_by_subject() {
        let repo = InMemoryRepository::new();
        let owner = UserId::random();
        let other = UserId::random();

        repo.insert_item(&build_item(owner, "old math", Subject::Math, 0))
            .await
            .unwrap();
        repo.insert_item(&build_item(owner, "new math", Subject::Math, 10))
            .await
            .unwrap();
        repo.insert_item(&build_item(owner, "science", Subject::Science, 5))
            .await
            .unwrap();
        repo.insert_item(&build_item(other, "not mine", Subject::Math, 20))
            .await
            .unwrap();

        let all = repo.list_items(owner, None).await.unwrap();
        let prompts: Vec<_> = all.iter().map(StudyItem::prompt).collect();
        assert_eq!(prompts, vec!["new math", "science", "old math"]);

        let math = repo.list_items(owner, Some(Subject::Math)).await.unwrap();
        assert_eq!(math.len(), 2);
    }

    #[tokio::test]
    async fn duplicate_insert_conflicts() {
        let repo = InMemoryRepository::new();
        let item = build_item(UserId::random(), "q", Subject::General, 0);
        repo.insert_item(&item).await.unwrap();
        let err = repo.insert_item(&item).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn update_stats_round_trips() {
        let repo = InMemoryRepository::new();
        let owner = UserId::random();
        let item = build_item(owner, "q", Subject::General, 0);
        repo.insert_item(&item).await.unwrap();

        let stats = StudyStats::new(3, 2).unwrap();
        repo.update_stats(owner, item.id(), stats, fixed_now())
            .await
            .unwrap();

        let fetched = repo.get_item(owner, item.id()).await.unwrap();
        assert_eq!(fetched.stats(), stats);
    }

    #[tokio::test]
    async fn other_owners_cannot_update_stats() {
        let repo = InMemoryRepository::new();
        let owner = UserId::random();
        let item = build_item(owner, "q", Subject::General, 0);
        repo.insert_item(&item).await.unwrap();

        let err = repo
            .update_stats(
                UserId::random(),
                item.id(),
                StudyStats::new(1, 1).unwrap(),
                fixed_now(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
        let fetched = repo.get_item(owner, item.id()).await.unwrap();
        assert_eq!(fetched.stats().times_studied(), 0);
    }

    #[tokio::test]
    async fn other_owners_cannot_delete() {
        let repo = InMemoryRepository::new();
        let owner = UserId::random();
        let item = build_item(owner, "q", Subject::General, 0);
        repo.insert_item(&item).await.unwrap();

        let err = repo.delete_item(UserId::random(), item.id()).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
        repo.delete_item(owner, item.id()).await.unwrap();
        assert!(repo.list_items(owner, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn add_xp_requires_profile() {
        let repo = InMemoryRepository::new();
        let user = UserId::random();
        let err = repo.add_xp(user, 10, fixed_now()).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));

        repo.upsert_profile(&Profile::new(user, None, fixed_now()))
            .await
            .unwrap();
        let updated = repo.add_xp(user, 1_200, fixed_now()).await.unwrap();
        assert_eq!(updated.xp(), 1_200);
        assert_eq!(updated.level(), 2);
    }

    #[tokio::test]
    async fn sessions_are_listed_per_user() {
        let repo = InMemoryRepository::new();
        let user = UserId::random();
        let now = fixed_now();
        let first = StudySessionRecord::from_tally(user, now, now, 1, 1).unwrap();
        let second =
            StudySessionRecord::from_tally(user, now, now + Duration::minutes(3), 2, 0).unwrap();
        let foreign = StudySessionRecord::from_tally(UserId::random(), now, now, 0, 1).unwrap();

        let first_id = repo.append_session(&first).await.unwrap();
        repo.append_session(&foreign).await.unwrap();
        repo.append_session(&second).await.unwrap();

        let rows = repo.list_sessions(user, 10).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].record, second);
        assert_eq!(repo.get_session(first_id).await.unwrap(), first);
        assert!(matches!(
            repo.get_session(99).await,
            Err(StorageError::NotFound)
        ));
    }
}
