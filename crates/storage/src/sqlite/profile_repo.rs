use chrono::{DateTime, Utc};
use tellect_core::model::{Profile, UserId};

use super::{
    SqliteRepository,
    mapping::{map_profile_row, xp_to_i64},
};
use crate::repository::{ProgressRepository, StorageError};

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn get_profile(&self, user: UserId) -> Result<Option<Profile>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT user_id, username, xp, created_at, updated_at
            FROM profiles
            WHERE user_id = ?1
            ",
        )
        .bind(user.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_profile_row).transpose()
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO profiles (user_id, username, xp, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(user_id) DO UPDATE SET
                username = excluded.username,
                xp = excluded.xp,
                updated_at = excluded.updated_at
            ",
        )
        .bind(profile.user_id().to_string())
        .bind(profile.username())
        .bind(xp_to_i64(profile.xp())?)
        .bind(profile.created_at())
        .bind(profile.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn list_profiles(&self, limit: u32) -> Result<Vec<Profile>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT user_id, username, xp, created_at, updated_at
            FROM profiles
            ORDER BY created_at ASC, user_id ASC
            LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_profile_row).collect()
    }

    async fn add_xp(
        &self,
        user: UserId,
        amount: u32,
        at: DateTime<Utc>,
    ) -> Result<Profile, StorageError> {
        let amount = i64::from(amount);
        // one statement, so concurrent awards never lose an update
        let row = sqlx::query(
            r"
            UPDATE profiles
            SET xp = CASE WHEN xp > ?2 THEN ?3 ELSE xp + ?1 END,
                updated_at = ?4
            WHERE user_id = ?5
            RETURNING user_id, username, xp, created_at, updated_at
            ",
        )
        .bind(amount)
        .bind(i64::MAX - amount)
        .bind(i64::MAX)
        .bind(at)
        .bind(user.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?
        .ok_or(StorageError::NotFound)?;

        map_profile_row(&row)
    }
}
