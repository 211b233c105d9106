//! PostgreSQL [`DocumentStore`] over a single JSONB `documents` table.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::store::{
    ArchivedFilter, Collection, DocumentQuery, DocumentStore, StoreError, StoredDocument, WriteOp,
};

/// Column list for `documents` queries.
const COLUMNS: &str = "id, partition_key, archived, body";

#[derive(Debug, sqlx::FromRow)]
struct DocumentRow {
    id: String,
    partition_key: String,
    archived: bool,
    body: serde_json::Value,
}

impl From<DocumentRow> for StoredDocument {
    fn from(row: DocumentRow) -> Self {
        Self {
            id: row.id,
            partition_key: row.partition_key,
            archived: row.archived,
            body: row.body,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn find(&self, query: &DocumentQuery) -> Result<Vec<StoredDocument>, StoreError> {
        let archived: Option<bool> = match query.archived {
            ArchivedFilter::Exclude => Some(false),
            ArchivedFilter::Only => Some(true),
            ArchivedFilter::Include => None,
        };
        let sql = format!(
            "SELECT {COLUMNS} FROM documents \
             WHERE collection = $1 \
               AND ($2::text[] IS NULL OR partition_key = ANY($2)) \
               AND ($3::boolean IS NULL OR archived = $3) \
             ORDER BY id"
        );
        let rows = sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(query.collection.as_str())
            .bind(query.partitions.clone())
            .bind(archived)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(StoredDocument::from).collect())
    }

    async fn get(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<StoredDocument>, StoreError> {
        let sql = format!("SELECT {COLUMNS} FROM documents WHERE collection = $1 AND id = $2");
        let row = sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(collection.as_str())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(StoredDocument::from))
    }

    /// Apply all operations in one transaction.
    async fn commit(&self, ops: Vec<WriteOp>) -> Result<(), StoreError> {
        if ops.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for op in &ops {
            match op {
                WriteOp::Upsert {
                    collection,
                    document,
                } => {
                    sqlx::query(
                        "INSERT INTO documents (collection, id, partition_key, archived, body, updated_at) \
                         VALUES ($1, $2, $3, $4, $5, NOW()) \
                         ON CONFLICT (collection, id) DO UPDATE SET \
                             partition_key = EXCLUDED.partition_key, \
                             archived = EXCLUDED.archived, \
                             body = EXCLUDED.body, \
                             updated_at = NOW()",
                    )
                    .bind(collection.as_str())
                    .bind(&document.id)
                    .bind(&document.partition_key)
                    .bind(document.archived)
                    .bind(&document.body)
                    .execute(&mut *tx)
                    .await?;
                }
                WriteOp::Delete { collection, id } => {
                    sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
                        .bind(collection.as_str())
                        .bind(id)
                        .execute(&mut *tx)
                        .await?;
                }
            }
        }
        tx.commit().await?;

        tracing::debug!(ops = ops.len(), "Committed document writes");
        Ok(())
    }
}
