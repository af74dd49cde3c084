use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use tellect_core::model::{
    Difficulty, ItemId, Mindmap, MindmapEdge, MindmapId, MindmapNode, Profile, SessionKind,
    StudyItem, StudySessionRecord, StudyStats, Subject, UserId,
};
use uuid::Uuid;

use crate::repository::{StorageError, StudySessionRow};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn uuid_column(row: &SqliteRow, column: &str) -> Result<Uuid, StorageError> {
    let raw: String = row.try_get(column).map_err(ser)?;
    Uuid::parse_str(&raw).map_err(ser)
}

fn u32_column(row: &SqliteRow, column: &'static str) -> Result<u32, StorageError> {
    let v: i64 = row.try_get(column).map_err(ser)?;
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {column}: {v}")))
}

pub(crate) fn xp_to_i64(xp: u64) -> Result<i64, StorageError> {
    i64::try_from(xp).map_err(|_| StorageError::Serialization("xp overflow".into()))
}

pub(crate) fn map_item_row(row: &SqliteRow) -> Result<StudyItem, StorageError> {
    let subject: Subject = row
        .try_get::<String, _>("subject")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let difficulty: Difficulty = row
        .try_get::<String, _>("difficulty")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let stats = StudyStats::new(
        u32_column(row, "times_studied")?,
        u32_column(row, "times_correct")?,
    )
    .map_err(ser)?;

    StudyItem::from_persisted(
        ItemId::new(uuid_column(row, "id")?),
        UserId::new(uuid_column(row, "owner_id")?),
        row.try_get("prompt").map_err(ser)?,
        row.try_get("response").map_err(ser)?,
        subject,
        difficulty,
        stats,
        row.try_get("created_at").map_err(ser)?,
        row.try_get("updated_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_profile_row(row: &SqliteRow) -> Result<Profile, StorageError> {
    let xp: i64 = row.try_get("xp").map_err(ser)?;
    let xp = u64::try_from(xp).map_err(|_| StorageError::Serialization("xp sign overflow".into()))?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(ser)?;

    Ok(Profile::from_persisted(
        UserId::new(uuid_column(row, "user_id")?),
        row.try_get("username").map_err(ser)?,
        xp,
        created_at,
        row.try_get("updated_at").map_err(ser)?,
    ))
}

pub(crate) fn map_session_row(row: &SqliteRow) -> Result<StudySessionRow, StorageError> {
    let kind = SessionKind::parse(&row.try_get::<String, _>("session_type").map_err(ser)?)
        .map_err(ser)?;
    let record = StudySessionRecord::from_persisted(
        UserId::new(uuid_column(row, "user_id")?),
        kind,
        row.try_get("started_at").map_err(ser)?,
        row.try_get("completed_at").map_err(ser)?,
        u32_column(row, "items_count")?,
        u32_column(row, "correct_count")?,
        u32_column(row, "incorrect_count")?,
        u32_column(row, "xp_earned")?,
    )
    .map_err(ser)?;

    Ok(StudySessionRow::new(row.try_get("id").map_err(ser)?, record))
}

pub(crate) fn map_mindmap_row(row: &SqliteRow) -> Result<Mindmap, StorageError> {
    let nodes: Vec<MindmapNode> =
        serde_json::from_str(&row.try_get::<String, _>("nodes").map_err(ser)?).map_err(ser)?;
    let edges: Vec<MindmapEdge> =
        serde_json::from_str(&row.try_get::<String, _>("edges").map_err(ser)?).map_err(ser)?;

    Mindmap::from_persisted(
        MindmapId::new(uuid_column(row, "id")?),
        UserId::new(uuid_column(row, "owner_id")?),
        row.try_get("title").map_err(ser)?,
        nodes,
        edges,
        row.try_get("created_at").map_err(ser)?,
        row.try_get("updated_at").map_err(ser)?,
    )
    .map_err(ser)
}

/// Maps a unique-constraint violation to `Conflict`, everything else to `Connection`.
pub(crate) fn map_write_error(e: sqlx::Error) -> StorageError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict,
        _ => StorageError::Connection(e.to_string()),
    }
}
