use tellect_core::model::{StudySessionRecord, UserId};

use super::{SqliteRepository, mapping::map_session_row};
use crate::repository::{StorageError, StudySessionId, StudySessionRepository, StudySessionRow};

#[async_trait::async_trait]
impl StudySessionRepository for SqliteRepository {
    async fn append_session(
        &self,
        record: &StudySessionRecord,
    ) -> Result<StudySessionId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO study_sessions (
                user_id, session_type, started_at, completed_at,
                items_count, correct_count, incorrect_count, xp_earned
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(record.user_id().to_string())
        .bind(record.kind().as_str())
        .bind(record.started_at())
        .bind(record.completed_at())
        .bind(i64::from(record.items_count()))
        .bind(i64::from(record.correct()))
        .bind(i64::from(record.incorrect()))
        .bind(i64::from(record.xp_earned()))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(res.last_insert_rowid())
    }

    async fn get_session(&self, id: StudySessionId) -> Result<StudySessionRecord, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, user_id, session_type, started_at, completed_at,
                   items_count, correct_count, incorrect_count, xp_earned
            FROM study_sessions
            WHERE id = ?1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?
        .ok_or(StorageError::NotFound)?;

        Ok(map_session_row(&row)?.record)
    }

    async fn list_sessions(
        &self,
        user: UserId,
        limit: u32,
    ) -> Result<Vec<StudySessionRow>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, user_id, session_type, started_at, completed_at,
                   items_count, correct_count, incorrect_count, xp_earned
            FROM study_sessions
            WHERE user_id = ?1
            ORDER BY completed_at DESC, id DESC
            LIMIT ?2
            ",
        )
        .bind(user.to_string())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_session_row).collect()
    }
}
