/// Partitioned knowledge store backed by SQLite
///
/// Documents are keyed by (id, partition_key). Point reads normalize
/// "no rows" to Ok(None); real database failures stay errors so callers
/// can tell "confirmed absent" from "could not determine". Ranked search
/// scores stored embeddings against a query vector in memory.
use crate::config::StoreConfig;
use crate::documents::patch::{apply_operations, PatchOperation};
use crate::documents::types::{KnowledgeDocument, ScoredDocument};
use crate::errors::{DashResult, StoreError};
use chrono::Utc;
use log::{debug, info, warn};
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use serde_json::Value;
use std::sync::Arc;

/// Store statistics
#[derive(Debug, Clone)]
pub struct StoreStats {
    pub document_count: usize,
    pub partition_count: usize,
}

#[derive(Clone)]
pub struct KnowledgeStore {
    conn: Arc<Mutex<Connection>>,
}

type DocumentRow = (String, String, String, String, Option<String>, String);

impl KnowledgeStore {
    /// Open (or create) the store and initialize its schema
    pub fn new(config: &StoreConfig) -> DashResult<Self> {
        let conn = match &config.database_path {
            Some(path) => Connection::open(path).map_err(StoreError::from)?,
            None => Connection::open_in_memory().map_err(StoreError::from)?,
        };

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.create_tables()?;

        info!(
            "Knowledge store ready ({})",
            config.database_path.as_deref().unwrap_or("in-memory")
        );
        Ok(store)
    }

    fn create_tables(&self) -> DashResult<()> {
        let conn = self.conn.lock();

        conn.execute(
            "CREATE TABLE IF NOT EXISTS documents (
                id TEXT NOT NULL,
                partition_key TEXT NOT NULL,
                url TEXT NOT NULL DEFAULT '',
                content TEXT NOT NULL DEFAULT '',
                embedding TEXT,
                metadata TEXT NOT NULL DEFAULT '{}',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (id, partition_key)
            )",
            [],
        )
        .map_err(StoreError::from)?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_documents_partition ON documents(partition_key)",
            [],
        )
        .map_err(StoreError::from)?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_documents_url ON documents(url)",
            [],
        )
        .map_err(StoreError::from)?;

        Ok(())
    }

    /// Insert a new document; fails with `Conflict` if (id, partition_key)
    /// already exists
    pub async fn create(&self, doc: &KnowledgeDocument) -> DashResult<()> {
        let (embedding, metadata) = Self::encode_fields(doc)?;
        let now = Utc::now().to_rfc3339();

        let conn = self.conn.lock();
        let result = conn.execute(
            "INSERT INTO documents (id, partition_key, url, content, embedding, metadata, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![doc.id, doc.partition_key, doc.url, doc.content, embedding, metadata, now],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::Conflict {
                    id: doc.id.clone(),
                    partition_key: doc.partition_key.clone(),
                }
                .into())
            }
            Err(e) => Err(StoreError::from(e).into()),
        }
    }

    /// Insert or fully overwrite by (id, partition_key); never fails on
    /// existence
    pub async fn upsert(&self, doc: &KnowledgeDocument) -> DashResult<()> {
        let (embedding, metadata) = Self::encode_fields(doc)?;
        let now = Utc::now().to_rfc3339();

        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO documents (id, partition_key, url, content, embedding, metadata, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![doc.id, doc.partition_key, doc.url, doc.content, embedding, metadata, now],
        )
        .map_err(StoreError::from)?;

        Ok(())
    }

    /// Point lookup; Ok(None) means confirmed absent
    pub async fn get(
        &self,
        id: &str,
        partition_key: &str,
    ) -> DashResult<Option<KnowledgeDocument>> {
        let conn = self.conn.lock();
        let result = conn.query_row(
            "SELECT id, partition_key, url, content, embedding, metadata
             FROM documents WHERE id = ?1 AND partition_key = ?2",
            params![id, partition_key],
            Self::map_row,
        );

        match result {
            Ok(row) => Ok(Some(Self::row_to_document(row)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::from(e).into()),
        }
    }

    /// Equality-filter scan over intrinsic fields or metadata keys.
    /// Result order is store-defined.
    pub async fn list_by_field(
        &self,
        field: &str,
        value: &Value,
    ) -> DashResult<Vec<KnowledgeDocument>> {
        // Indexed fast path for intrinsic string columns
        let column = match field {
            "id" => Some("id"),
            "partition_key" => Some("partition_key"),
            "url" => Some("url"),
            "content" => Some("content"),
            _ => None,
        };

        if let (Some(column), Some(text)) = (column, value.as_str()) {
            let sql = format!(
                "SELECT id, partition_key, url, content, embedding, metadata
                 FROM documents WHERE {} = ?1",
                column
            );
            let conn = self.conn.lock();
            let mut stmt = conn.prepare(&sql).map_err(StoreError::from)?;
            let rows = stmt
                .query_map(params![text], Self::map_row)
                .map_err(StoreError::from)?;

            let mut documents = Vec::new();
            for row in rows {
                documents.push(Self::row_to_document(row.map_err(StoreError::from)?)?);
            }
            return Ok(documents);
        }

        // Metadata keys require a scan
        let documents = self
            .load_all()
            .await?
            .into_iter()
            .filter(|doc| doc.metadata.get(field) == Some(value))
            .collect();

        Ok(documents)
    }

    /// Similarity-ranked search over stored embeddings.
    ///
    /// The score is cosine similarity: documents scoring strictly above
    /// `threshold` are kept, sorted ascending by score, truncated to
    /// `top_k`. Documents without an embedding never match.
    pub async fn search_by_embedding(
        &self,
        query: &[f32],
        threshold: f32,
        top_k: usize,
    ) -> DashResult<Vec<ScoredDocument>> {
        let mut scored: Vec<ScoredDocument> = self
            .load_all()
            .await?
            .into_iter()
            .filter_map(|doc| {
                let embedding = doc.summary_embedding.as_deref()?;
                let score = cosine_similarity(query, embedding);
                if score > threshold {
                    Some(ScoredDocument {
                        document: doc,
                        score,
                    })
                } else {
                    None
                }
            })
            .collect();

        scored.sort_by(|a, b| a.score.total_cmp(&b.score));
        scored.truncate(top_k);

        debug!(
            "Embedding search matched {} documents (threshold {}, top_k {})",
            scored.len(),
            threshold,
            top_k
        );

        Ok(scored)
    }

    /// Apply field-level operations in order; fails with `NotFound` if the
    /// document does not exist. Returns the updated document.
    pub async fn patch(
        &self,
        id: &str,
        partition_key: &str,
        operations: &[PatchOperation],
    ) -> DashResult<KnowledgeDocument> {
        let existing = self.get(id, partition_key).await?.ok_or_else(|| {
            StoreError::NotFound {
                id: id.to_string(),
                partition_key: partition_key.to_string(),
            }
        })?;

        let mut json = serde_json::to_value(&existing).map_err(StoreError::from)?;
        apply_operations(&mut json, operations)?;

        let updated: KnowledgeDocument =
            serde_json::from_value(json).map_err(StoreError::from)?;

        self.write_back(&updated).await?;
        Ok(updated)
    }

    /// Full overwrite preserving (id, partition_key); fails with `NotFound`
    /// if the document does not exist
    pub async fn replace(
        &self,
        id: &str,
        partition_key: &str,
        mut new_body: KnowledgeDocument,
    ) -> DashResult<KnowledgeDocument> {
        // Identity comes from the call, not the body
        new_body.id = id.to_string();
        new_body.partition_key = partition_key.to_string();

        if self.get(id, partition_key).await?.is_none() {
            return Err(StoreError::NotFound {
                id: id.to_string(),
                partition_key: partition_key.to_string(),
            }
            .into());
        }

        self.write_back(&new_body).await?;
        Ok(new_body)
    }

    /// Remove a document. Ok(true) if one was removed, Ok(false) if none
    /// existed; database failures stay errors.
    pub async fn delete(&self, id: &str, partition_key: &str) -> DashResult<bool> {
        let conn = self.conn.lock();
        let removed = conn
            .execute(
                "DELETE FROM documents WHERE id = ?1 AND partition_key = ?2",
                params![id, partition_key],
            )
            .map_err(StoreError::from)?;

        Ok(removed > 0)
    }

    pub async fn stats(&self) -> DashResult<StoreStats> {
        let conn = self.conn.lock();
        let (documents, partitions): (i64, i64) = conn
            .query_row(
                "SELECT COUNT(*), COUNT(DISTINCT partition_key) FROM documents",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map_err(StoreError::from)?;

        Ok(StoreStats {
            document_count: documents as usize,
            partition_count: partitions as usize,
        })
    }

    async fn load_all(&self) -> DashResult<Vec<KnowledgeDocument>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT id, partition_key, url, content, embedding, metadata FROM documents",
            )
            .map_err(StoreError::from)?;
        let rows = stmt.query_map([], Self::map_row).map_err(StoreError::from)?;

        let mut documents = Vec::new();
        for row in rows {
            match row {
                Ok(row) => documents.push(Self::row_to_document(row)?),
                Err(e) => warn!("Skipping unreadable document row: {}", e),
            }
        }

        Ok(documents)
    }

    async fn write_back(&self, doc: &KnowledgeDocument) -> DashResult<()> {
        let (embedding, metadata) = Self::encode_fields(doc)?;
        let now = Utc::now().to_rfc3339();

        let conn = self.conn.lock();
        conn.execute(
            "UPDATE documents SET url = ?3, content = ?4, embedding = ?5, metadata = ?6, updated_at = ?7
             WHERE id = ?1 AND partition_key = ?2",
            params![doc.id, doc.partition_key, doc.url, doc.content, embedding, metadata, now],
        )
        .map_err(StoreError::from)?;

        Ok(())
    }

    fn encode_fields(doc: &KnowledgeDocument) -> Result<(Option<String>, String), StoreError> {
        let embedding = doc
            .summary_embedding
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let metadata = serde_json::to_string(&doc.metadata)?;
        Ok((embedding, metadata))
    }

    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<DocumentRow> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
        ))
    }

    fn row_to_document(row: DocumentRow) -> Result<KnowledgeDocument, StoreError> {
        let (id, partition_key, url, content, embedding, metadata) = row;

        Ok(KnowledgeDocument {
            id,
            partition_key,
            url,
            content,
            summary_embedding: embedding
                .map(|text| serde_json::from_str(&text))
                .transpose()?,
            metadata: serde_json::from_str(&metadata)?,
        })
    }
}

/// Cosine similarity in [-1, 1]; mismatched dimensions or zero vectors
/// score 0
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::DashboardError;
    use serde_json::json;

    fn store() -> KnowledgeStore {
        KnowledgeStore::new(&StoreConfig::default()).unwrap()
    }

    fn doc(id: &str, partition_key: &str) -> KnowledgeDocument {
        KnowledgeDocument::new(id, partition_key)
            .with_url(format!("{}/{}", partition_key, id))
            .with_content("token risk report")
    }

    #[tokio::test]
    async fn create_then_get_roundtrip() {
        let store = store();
        let original = doc("d1", "https://example.com");

        store.create(&original).await.unwrap();
        let fetched = store.get("d1", "https://example.com").await.unwrap();
        assert_eq!(fetched, Some(original));
    }

    #[tokio::test]
    async fn create_conflicts_on_duplicate_key() {
        let store = store();
        store.create(&doc("d1", "pk")).await.unwrap();

        let err = store.create(&doc("d1", "pk")).await.unwrap_err();
        assert!(matches!(
            err,
            DashboardError::Store(StoreError::Conflict { .. })
        ));

        // Same id under another partition is a distinct document
        store.create(&doc("d1", "pk2")).await.unwrap();
    }

    #[tokio::test]
    async fn upsert_overwrites_without_conflict() {
        let store = store();
        store.create(&doc("d1", "pk")).await.unwrap();

        let replacement = doc("d1", "pk").with_content("updated");
        store.upsert(&replacement).await.unwrap();

        let fetched = store.get("d1", "pk").await.unwrap().unwrap();
        assert_eq!(fetched.content, "updated");
    }

    #[tokio::test]
    async fn get_absent_is_confirmed_none() {
        let store = store();
        assert_eq!(store.get("missing", "pk").await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_semantics() {
        let store = store();
        store.create(&doc("d1", "pk")).await.unwrap();

        assert!(store.delete("d1", "pk").await.unwrap());
        assert!(!store.delete("d1", "pk").await.unwrap());
        assert!(!store.delete("never-existed", "pk").await.unwrap());
    }

    #[tokio::test]
    async fn list_by_intrinsic_field() {
        let store = store();
        store
            .create(&doc("d1", "pk").with_url("https://example.com/a"))
            .await
            .unwrap();
        store
            .create(&doc("d2", "pk").with_url("https://example.com/b"))
            .await
            .unwrap();

        let matches = store
            .list_by_field("url", &json!("https://example.com/a"))
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, "d1");
    }

    #[tokio::test]
    async fn list_by_metadata_field() {
        let store = store();
        store
            .create(&doc("d1", "pk").with_metadata_field("source", json!("chain-scan")))
            .await
            .unwrap();
        store
            .create(&doc("d2", "pk").with_metadata_field("source", json!("manual")))
            .await
            .unwrap();

        let matches = store
            .list_by_field("source", &json!("chain-scan"))
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, "d1");
    }

    #[tokio::test]
    async fn embedding_search_filters_and_ranks_ascending() {
        let store = store();

        // Unit vectors with cosine similarity 0.9, 0.7, 0.95 against [1, 0]
        store
            .create(&doc("a", "pk").with_embedding(vec![0.9, 0.435_890]))
            .await
            .unwrap();
        store
            .create(&doc("b", "pk").with_embedding(vec![0.7, 0.714_143]))
            .await
            .unwrap();
        store
            .create(&doc("c", "pk").with_embedding(vec![0.95, 0.312_250]))
            .await
            .unwrap();
        // No embedding: never matches
        store.create(&doc("d", "pk")).await.unwrap();

        let results = store
            .search_by_embedding(&[1.0, 0.0], 0.65, 2)
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].document.id, "b");
        assert_eq!(results[1].document.id, "a");
        assert!((results[0].score - 0.7).abs() < 1e-3);
        assert!((results[1].score - 0.9).abs() < 1e-3);

        // Without truncation the highest-scoring document appears last
        let all = store
            .search_by_embedding(&[1.0, 0.0], 0.65, 10)
            .await
            .unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[2].document.id, "c");

        // Threshold filters independently of truncation
        let strict = store
            .search_by_embedding(&[1.0, 0.0], 0.8, 10)
            .await
            .unwrap();
        assert_eq!(strict.len(), 2);
        assert_eq!(strict[0].document.id, "a");
        assert_eq!(strict[1].document.id, "c");
    }

    #[tokio::test]
    async fn patch_updates_and_is_idempotent() {
        let store = store();
        store.create(&doc("d1", "pk")).await.unwrap();

        let ops = vec![PatchOperation::Set {
            path: "metadata.risk_score".to_string(),
            value: json!(0.8),
        }];

        let once = store.patch("d1", "pk", &ops).await.unwrap();
        let twice = store.patch("d1", "pk", &ops).await.unwrap();
        assert_eq!(once, twice);
        assert_eq!(once.metadata["risk_score"], json!(0.8));

        let fetched = store.get("d1", "pk").await.unwrap().unwrap();
        assert_eq!(fetched.metadata["risk_score"], json!(0.8));
    }

    #[tokio::test]
    async fn patch_missing_document_is_not_found() {
        let store = store();
        let ops = vec![PatchOperation::Set {
            path: "content".to_string(),
            value: json!("x"),
        }];

        let err = store.patch("missing", "pk", &ops).await.unwrap_err();
        assert!(matches!(
            err,
            DashboardError::Store(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn replace_preserves_identity() {
        let store = store();
        store.create(&doc("d1", "pk")).await.unwrap();

        // Body carries a different identity; the call's key wins
        let body = KnowledgeDocument::new("other-id", "other-pk").with_content("replaced");
        let replaced = store.replace("d1", "pk", body).await.unwrap();

        assert_eq!(replaced.id, "d1");
        assert_eq!(replaced.partition_key, "pk");
        assert_eq!(replaced.content, "replaced");

        let err = store
            .replace("missing", "pk", KnowledgeDocument::new("x", "y"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DashboardError::Store(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn stats_count_documents_and_partitions() {
        let store = store();
        store.create(&doc("d1", "pk1")).await.unwrap();
        store.create(&doc("d2", "pk1")).await.unwrap();
        store.create(&doc("d3", "pk2")).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.document_count, 3);
        assert_eq!(stats.partition_count, 2);
    }

    #[test]
    fn cosine_similarity_edge_cases() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
    }
}
