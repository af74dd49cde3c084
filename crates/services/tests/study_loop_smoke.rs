use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use services::{Clock, MemoryNotifier, NoticeLevel, StudyLoopService};
use storage::repository::{
    InMemoryRepository, ProgressRepository, StorageError, StudyItemRepository,
    StudySessionRepository,
};
use tellect_core::model::{
    ItemId, Profile, StudyItem, StudyItemDraft, StudyStats, Subject, UserId,
};
use tellect_core::time::fixed_now;
use tellect_core::SessionEvent;

async fn seed(repo: &InMemoryRepository, owner: UserId, count: usize) -> Vec<StudyItem> {
    repo.upsert_profile(&Profile::new(owner, None, fixed_now()))
        .await
        .unwrap();
    let mut items = Vec::new();
    for i in 0..count {
        let item = StudyItemDraft::new(format!("Q{i}"), format!("A{i}"), Subject::Math)
            .validate(ItemId::random(), owner, fixed_now())
            .unwrap();
        repo.insert_item(&item).await.unwrap();
        items.push(item);
    }
    items
}

#[tokio::test]
async fn study_loop_persists_stats_xp_and_record() {
    let repo = InMemoryRepository::new();
    let owner = UserId::random();
    seed(&repo, owner, 3).await;
    let notifier = MemoryNotifier::new();

    let loop_svc = StudyLoopService::new(
        Clock::fixed(fixed_now()),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
    )
    .with_notifier(Arc::new(notifier.clone()));

    let mut session = loop_svc.start_session(owner, None).await.unwrap();
    let mut answers = [true, false, true].into_iter();
    while !session.is_complete() {
        loop_svc.reveal(&mut session).unwrap();
        let result = loop_svc
            .answer_current(&mut session, answers.next().unwrap())
            .await
            .unwrap();
        assert_eq!(result.failed_effects, 0);
    }

    let tally = session.tally();
    assert_eq!((tally.correct, tally.incorrect), (2, 1));
    assert_eq!(session.persistence_failures(), 0);

    let profile = repo.get_profile(owner).await.unwrap().unwrap();
    assert_eq!(profile.xp(), 20);

    let items = repo.list_items(owner, None).await.unwrap();
    let studied: u32 = items.iter().map(|i| i.stats().times_studied()).sum();
    let correct: u32 = items.iter().map(|i| i.stats().times_correct()).sum();
    assert_eq!((studied, correct), (3, 2));

    let record_id = session.record_id().expect("record persisted");
    let record = repo.get_session(record_id).await.unwrap();
    assert_eq!(record.items_count(), 3);
    assert_eq!(record.xp_earned(), 20);

    let rows = repo.list_sessions(owner, 10).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, record_id);

    let notices = notifier.drain();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Success);
    assert_eq!(notices[0].message, "Session completed! Earned 20 XP");
}

#[tokio::test]
async fn subject_filter_limits_the_session() {
    let repo = InMemoryRepository::new();
    let owner = UserId::random();
    seed(&repo, owner, 2).await;
    let history = StudyItemDraft::new("1066?", "Hastings", Subject::History)
        .validate(ItemId::random(), owner, fixed_now())
        .unwrap();
    repo.insert_item(&history).await.unwrap();

    let loop_svc = StudyLoopService::new(
        Clock::fixed(fixed_now()),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
    )
    .with_shuffle(true);

    let session = loop_svc
        .start_session(owner, Some(Subject::History))
        .await
        .unwrap();
    assert_eq!(session.engine().len(), 1);
    assert_eq!(session.current_item().unwrap().id(), history.id());

    let err = loop_svc
        .start_session(owner, Some(Subject::Language))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        services::SessionError::Session(tellect_core::StudySessionError::EmptySession)
    ));
}

/// Item store whose stat updates always fail.
struct FailingStats(InMemoryRepository);

#[async_trait]
impl StudyItemRepository for FailingStats {
    async fn insert_item(&self, item: &StudyItem) -> Result<(), StorageError> {
        self.0.insert_item(item).await
    }

    async fn get_item(&self, owner: UserId, id: ItemId) -> Result<StudyItem, StorageError> {
        self.0.get_item(owner, id).await
    }

    async fn list_items(
        &self,
        owner: UserId,
        subject: Option<Subject>,
    ) -> Result<Vec<StudyItem>, StorageError> {
        self.0.list_items(owner, subject).await
    }

    async fn update_item(&self, item: &StudyItem) -> Result<(), StorageError> {
        self.0.update_item(item).await
    }

    async fn update_stats(
        &self,
        _owner: UserId,
        _id: ItemId,
        _stats: StudyStats,
        _updated_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        Err(StorageError::Connection("disk unavailable".into()))
    }

    async fn delete_item(&self, owner: UserId, id: ItemId) -> Result<(), StorageError> {
        self.0.delete_item(owner, id).await
    }
}

#[tokio::test]
async fn persistence_failures_do_not_roll_back_the_session() {
    let repo = InMemoryRepository::new();
    let owner = UserId::random();
    seed(&repo, owner, 2).await;
    let notifier = MemoryNotifier::new();

    let loop_svc = StudyLoopService::new(
        Clock::fixed(fixed_now()),
        Arc::new(FailingStats(repo.clone())),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
    )
    .with_notifier(Arc::new(notifier.clone()));

    let mut session = loop_svc.start_session(owner, None).await.unwrap();
    loop_svc.reveal(&mut session).unwrap();
    let first = loop_svc.answer_current(&mut session, true).await.unwrap();
    assert_eq!(first.failed_effects, 1);
    assert!(matches!(first.events[0], SessionEvent::ItemAnswered { .. }));
    assert_eq!(session.engine().position(), 1);

    loop_svc.reveal(&mut session).unwrap();
    let last = loop_svc.answer_current(&mut session, true).await.unwrap();
    assert!(last.is_complete);
    assert_eq!(session.persistence_failures(), 2);

    // XP and the record still land; only the stat writes failed.
    let profile = repo.get_profile(owner).await.unwrap().unwrap();
    assert_eq!(profile.xp(), 20);
    assert!(session.record_id().is_some());

    let errors = notifier
        .drain()
        .into_iter()
        .filter(|n| n.level == NoticeLevel::Error)
        .count();
    assert_eq!(errors, 2);
}

#[tokio::test]
async fn missing_profile_is_reported_not_fatal() {
    let repo = InMemoryRepository::new();
    let owner = UserId::random();
    let item = StudyItemDraft::new("Q", "A", Subject::General)
        .validate(ItemId::random(), owner, fixed_now())
        .unwrap();
    repo.insert_item(&item).await.unwrap();

    let loop_svc = StudyLoopService::new(
        Clock::fixed(fixed_now()),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
    );
    let mut session = loop_svc.start_session(owner, None).await.unwrap();
    loop_svc.reveal(&mut session).unwrap();
    let result = loop_svc.answer_current(&mut session, true).await.unwrap();

    assert!(result.is_complete);
    assert_eq!(result.failed_effects, 1);
    assert_eq!(
        repo.get_item(owner, item.id()).await.unwrap().stats(),
        StudyStats::new(1, 1).unwrap()
    );
    let record_id = loop_svc.finalize_record(&mut session).await.unwrap();
    assert_eq!(Some(record_id), session.record_id());
}
