use chrono::Duration;
use storage::repository::{
    MindmapRepository, ProgressRepository, Storage, StorageError, StudyItemRepository,
    StudySessionRepository,
};
use storage::sqlite::SqliteRepository;
use tellect_core::model::{
    Difficulty, ItemId, MindmapDraft, MindmapEdge, MindmapId, MindmapNode, NodeKind,
    NodePosition, Profile, StudyItem, StudyItemDraft, StudySessionRecord, StudyStats, Subject,
    UserId,
};
use tellect_core::time::fixed_now;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn build_item(owner: UserId, prompt: &str, subject: Subject, offset_secs: i64) -> StudyItem {
    StudyItemDraft::new(prompt, "Answer", subject)
        .with_difficulty(Difficulty::Hard)
        .validate(
            ItemId::random(),
            owner,
            fixed_now() + Duration::seconds(offset_secs),
        )
        .unwrap()
}

#[tokio::test]
async fn sqlite_roundtrip_persists_items_and_stats() {
    let repo = connect("memdb_items").await;
    let owner = UserId::random();

    let item = build_item(owner, "What is 2+2?", Subject::Math, 0);
    repo.insert_item(&item).await.unwrap();

    let fetched = repo.get_item(owner, item.id()).await.unwrap();
    assert_eq!(fetched, item);
    assert_eq!(fetched.difficulty(), Difficulty::Hard);

    let stats = StudyStats::new(4, 3).unwrap();
    let later = fixed_now() + Duration::minutes(5);
    repo.update_stats(owner, item.id(), stats, later)
        .await
        .unwrap();

    let fetched = repo.get_item(owner, item.id()).await.unwrap();
    assert_eq!(fetched.stats(), stats);
    assert_eq!(fetched.updated_at(), later);
    assert_eq!(fetched.created_at(), item.created_at());

    let err = repo
        .update_stats(owner, ItemId::random(), stats, later)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));

    let err = repo
        .update_stats(UserId::random(), item.id(), StudyStats::new(9, 9).unwrap(), later)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
    assert_eq!(repo.get_item(owner, item.id()).await.unwrap().stats(), stats);
}

#[tokio::test]
async fn sqlite_lists_newest_first_with_subject_filter() {
    let repo = connect("memdb_listing").await;
    let owner = UserId::random();

    let old = build_item(owner, "old", Subject::Math, 0);
    let mid = build_item(owner, "mid", Subject::Science, 10);
    let new = build_item(owner, "new", Subject::Math, 20);
    for item in [&old, &mid, &new] {
        repo.insert_item(item).await.unwrap();
    }
    repo.insert_item(&build_item(UserId::random(), "foreign", Subject::Math, 30))
        .await
        .unwrap();

    let all = repo.list_items(owner, None).await.unwrap();
    let prompts: Vec<_> = all.iter().map(StudyItem::prompt).collect();
    assert_eq!(prompts, vec!["new", "mid", "old"]);

    let math = repo.list_items(owner, Some(Subject::Math)).await.unwrap();
    let prompts: Vec<_> = math.iter().map(StudyItem::prompt).collect();
    assert_eq!(prompts, vec!["new", "old"]);
}

#[tokio::test]
async fn sqlite_edit_and_delete_are_owner_scoped() {
    let repo = connect("memdb_edit_delete").await;
    let owner = UserId::random();
    let mut item = build_item(owner, "Capital of France?", Subject::History, 0);
    repo.insert_item(&item).await.unwrap();
    assert!(matches!(
        repo.insert_item(&item).await,
        Err(StorageError::Conflict)
    ));

    item.apply_edit(
        StudyItemDraft::new("Capital of Italy?", "Rome", Subject::History),
        fixed_now() + Duration::minutes(1),
    )
    .unwrap();
    repo.update_item(&item).await.unwrap();
    assert_eq!(
        repo.get_item(owner, item.id()).await.unwrap().response(),
        "Rome"
    );

    let stranger = UserId::random();
    assert!(matches!(
        repo.get_item(stranger, item.id()).await,
        Err(StorageError::NotFound)
    ));
    assert!(matches!(
        repo.delete_item(stranger, item.id()).await,
        Err(StorageError::NotFound)
    ));

    repo.delete_item(owner, item.id()).await.unwrap();
    assert!(repo.list_items(owner, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn sqlite_add_xp_accumulates_in_profile() {
    let repo = connect("memdb_progress").await;
    let user = UserId::random();

    assert!(repo.get_profile(user).await.unwrap().is_none());
    assert!(matches!(
        repo.add_xp(user, 10, fixed_now()).await,
        Err(StorageError::NotFound)
    ));

    repo.upsert_profile(&Profile::new(user, Some("ada".into()), fixed_now()))
        .await
        .unwrap();
    repo.add_xp(user, 990, fixed_now()).await.unwrap();
    let later = fixed_now() + Duration::minutes(3);
    let profile = repo.add_xp(user, 20, later).await.unwrap();
    assert_eq!(profile.xp(), 1_010);
    assert_eq!(profile.level(), 2);
    assert_eq!(profile.updated_at(), later);
    assert_eq!(profile.created_at(), fixed_now());

    let stored = repo.get_profile(user).await.unwrap().unwrap();
    assert_eq!(stored.xp(), 1_010);
    assert_eq!(stored.username(), Some("ada"));

    let profiles = repo.list_profiles(5).await.unwrap();
    assert!(profiles.iter().any(|p| p.user_id() == user));
}

#[tokio::test]
async fn sqlite_session_records_roundtrip() {
    let repo = connect("memdb_sessions").await;
    let user = UserId::random();
    let now = fixed_now();

    let first = StudySessionRecord::from_tally(user, now, now + Duration::minutes(2), 3, 1).unwrap();
    let second =
        StudySessionRecord::from_tally(user, now, now + Duration::minutes(9), 5, 0).unwrap();

    let first_id = repo.append_session(&first).await.unwrap();
    let second_id = repo.append_session(&second).await.unwrap();
    assert!(second_id > first_id);

    assert_eq!(repo.get_session(first_id).await.unwrap(), first);

    let rows = repo.list_sessions(user, 1).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, second_id);
    assert_eq!(rows[0].record.xp_earned(), 50);
    assert_eq!(rows[0].record.duration_minutes(), 9);
}

#[tokio::test]
async fn sqlite_mindmaps_roundtrip_graph() {
    let repo = connect("memdb_mindmaps").await;
    let owner = UserId::random();

    let draft = MindmapDraft {
        title: "Photosynthesis".into(),
        nodes: vec![
            MindmapNode {
                id: "1".into(),
                label: "Photosynthesis".into(),
                position: NodePosition { x: 0.0, y: 0.0 },
                kind: NodeKind::Central,
            },
            MindmapNode {
                id: "2".into(),
                label: "Light".into(),
                position: NodePosition { x: 200.0, y: -100.0 },
                kind: NodeKind::Branch,
            },
        ],
        edges: vec![MindmapEdge {
            id: "e1-2".into(),
            source: "1".into(),
            target: "2".into(),
        }],
    };
    let map = draft
        .validate(MindmapId::random(), owner, fixed_now())
        .unwrap();
    repo.insert_mindmap(&map).await.unwrap();

    let fetched = repo.get_mindmap(owner, map.id()).await.unwrap();
    assert_eq!(fetched, map);
    assert_eq!(repo.list_mindmaps(owner).await.unwrap().len(), 1);

    repo.delete_mindmap(owner, map.id()).await.unwrap();
    assert!(matches!(
        repo.get_mindmap(owner, map.id()).await,
        Err(StorageError::NotFound)
    ));
}

#[tokio::test]
async fn storage_sqlite_wires_all_repositories() {
    let storage = Storage::sqlite("sqlite:file:memdb_storage?mode=memory&cache=shared")
        .await
        .expect("storage");
    let user = UserId::random();

    storage
        .progress
        .upsert_profile(&Profile::new(user, None, fixed_now()))
        .await
        .unwrap();
    storage
        .items
        .insert_item(&build_item(user, "q", Subject::General, 0))
        .await
        .unwrap();

    assert_eq!(storage.items.list_items(user, None).await.unwrap().len(), 1);
    assert!(storage.sessions.list_sessions(user, 10).await.unwrap().is_empty());
    assert!(storage.mindmaps.list_mindmaps(user).await.unwrap().is_empty());
}
