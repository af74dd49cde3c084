use chrono::{DateTime, Utc};
use tellect_core::model::{ItemId, StudyItem, StudyStats, Subject, UserId};

use super::{
    SqliteRepository,
    mapping::{map_item_row, map_write_error},
};
use crate::repository::{StorageError, StudyItemRepository};

const ITEM_COLUMNS: &str = r"
    id, owner_id, prompt, response, subject, difficulty,
    times_studied, times_correct, created_at, updated_at
";

#[async_trait::async_trait]
impl StudyItemRepository for SqliteRepository {
    async fn insert_item(&self, item: &StudyItem) -> Result<(), StorageError> {
        let stats = item.stats();
        sqlx::query(
            r"
            INSERT INTO study_items (
                id, owner_id, prompt, response, subject, difficulty,
                times_studied, times_correct, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ",
        )
        .bind(item.id().to_string())
        .bind(item.owner().to_string())
        .bind(item.prompt())
        .bind(item.response())
        .bind(item.subject().as_str())
        .bind(item.difficulty().as_str())
        .bind(i64::from(stats.times_studied()))
        .bind(i64::from(stats.times_correct()))
        .bind(item.created_at())
        .bind(item.updated_at())
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(())
    }

    async fn get_item(&self, owner: UserId, id: ItemId) -> Result<StudyItem, StorageError> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM study_items WHERE id = ?1 AND owner_id = ?2");
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .bind(owner.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?
            .ok_or(StorageError::NotFound)?;

        map_item_row(&row)
    }

    async fn list_items(
        &self,
        owner: UserId,
        subject: Option<Subject>,
    ) -> Result<Vec<StudyItem>, StorageError> {
        let sql = format!(
            r"
            SELECT {ITEM_COLUMNS}
            FROM study_items
            WHERE owner_id = ?1 AND (?2 IS NULL OR subject = ?2)
            ORDER BY created_at DESC, rowid DESC
            "
        );
        let rows = sqlx::query(&sql)
            .bind(owner.to_string())
            .bind(subject.map(Subject::as_str))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_item_row).collect()
    }

    async fn update_item(&self, item: &StudyItem) -> Result<(), StorageError> {
        let stats = item.stats();
        let res = sqlx::query(
            r"
            UPDATE study_items
            SET prompt = ?1, response = ?2, subject = ?3, difficulty = ?4,
                times_studied = ?5, times_correct = ?6, updated_at = ?7
            WHERE id = ?8 AND owner_id = ?9
            ",
        )
        .bind(item.prompt())
        .bind(item.response())
        .bind(item.subject().as_str())
        .bind(item.difficulty().as_str())
        .bind(i64::from(stats.times_studied()))
        .bind(i64::from(stats.times_correct()))
        .bind(item.updated_at())
        .bind(item.id().to_string())
        .bind(item.owner().to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn update_stats(
        &self,
        owner: UserId,
        id: ItemId,
        stats: StudyStats,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
            UPDATE study_items
            SET times_studied = ?1, times_correct = ?2, updated_at = ?3
            WHERE id = ?4 AND owner_id = ?5
            ",
        )
        .bind(i64::from(stats.times_studied()))
        .bind(i64::from(stats.times_correct()))
        .bind(updated_at)
        .bind(id.to_string())
        .bind(owner.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn delete_item(&self, owner: UserId, id: ItemId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM study_items WHERE id = ?1 AND owner_id = ?2")
            .bind(id.to_string())
            .bind(owner.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
