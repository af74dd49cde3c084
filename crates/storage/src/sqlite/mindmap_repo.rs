use tellect_core::model::{Mindmap, MindmapId, UserId};

use super::{
    SqliteRepository,
    mapping::{map_mindmap_row, map_write_error, ser},
};
use crate::repository::{MindmapRepository, StorageError};

#[async_trait::async_trait]
impl MindmapRepository for SqliteRepository {
    async fn insert_mindmap(&self, mindmap: &Mindmap) -> Result<(), StorageError> {
        let nodes = serde_json::to_string(mindmap.nodes()).map_err(ser)?;
        let edges = serde_json::to_string(mindmap.edges()).map_err(ser)?;

        sqlx::query(
            r"
            INSERT INTO mindmaps (id, owner_id, title, nodes, edges, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(mindmap.id().to_string())
        .bind(mindmap.owner().to_string())
        .bind(mindmap.title())
        .bind(nodes)
        .bind(edges)
        .bind(mindmap.created_at())
        .bind(mindmap.updated_at())
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(())
    }

    async fn get_mindmap(&self, owner: UserId, id: MindmapId) -> Result<Mindmap, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, owner_id, title, nodes, edges, created_at, updated_at
            FROM mindmaps
            WHERE id = ?1 AND owner_id = ?2
            ",
        )
        .bind(id.to_string())
        .bind(owner.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?
        .ok_or(StorageError::NotFound)?;

        map_mindmap_row(&row)
    }

    async fn list_mindmaps(&self, owner: UserId) -> Result<Vec<Mindmap>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, owner_id, title, nodes, edges, created_at, updated_at
            FROM mindmaps
            WHERE owner_id = ?1
            ORDER BY created_at DESC, rowid DESC
            ",
        )
        .bind(owner.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_mindmap_row).collect()
    }

    async fn delete_mindmap(&self, owner: UserId, id: MindmapId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM mindmaps WHERE id = ?1 AND owner_id = ?2")
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
