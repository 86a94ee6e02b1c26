use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use duckdb::{params, Connection};

use crate::application::interfaces::vector_store::{ScoredPoint, VectorPayload, VectorPoint};
use crate::application::interfaces::VectorStore;
use crate::domain::error::DomainError;

/// DuckDB VSS-backed vector store (spec §4.G). Lives in a separate
/// `vector/` directory per the persisted-state layout (§6) so semantic data
/// can be dropped independently of the relational store.
pub struct DuckDbVectorStore {
    conn: Arc<Mutex<Connection>>,
    dimension: usize,
}

impl DuckDbVectorStore {
    pub fn open(db_path: &Path, dimension: usize) -> Result<Self, DomainError> {
        let conn = Connection::open(db_path)
            .map_err(|e| DomainError::VectorStoreUnavailable(format!("open {}: {e}", db_path.display())))?;

        conn.execute_batch("INSTALL vss; LOAD vss; SET hnsw_enable_experimental_persistence = true;")
            .map_err(|e| DomainError::VectorStoreUnavailable(format!("load vss extension: {e}")))?;

        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS chunks (
                id UBIGINT PRIMARY KEY,
                repo_id TEXT NOT NULL,
                relative_path TEXT NOT NULL,
                content_hash TEXT NOT NULL,
                symbol TEXT,
                kind TEXT,
                line INTEGER NOT NULL,
                span_start INTEGER NOT NULL,
                span_end INTEGER NOT NULL,
                language TEXT NOT NULL,
                context_before TEXT,
                context_after TEXT,
                embedding FLOAT[{dimension}]
            );
            CREATE INDEX IF NOT EXISTS idx_chunks_repo_path ON chunks(repo_id, relative_path);"
        ))
        .map_err(|e| DomainError::VectorStoreUnavailable(format!("create chunks table: {e}")))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            dimension,
        })
    }
}

#[async_trait]
impl VectorStore for DuckDbVectorStore {
    async fn upsert(&self, points: Vec<VectorPoint>) -> Result<(), DomainError> {
        let conn = self.conn.clone();
        let dimension = self.dimension;

        tokio::task::spawn_blocking(move || -> Result<(), DomainError> {
            let mut conn = conn.lock().map_err(|_| DomainError::internal("vector store lock poisoned"))?;
            let tx = conn
                .transaction()
                .map_err(|e| DomainError::VectorStoreUnavailable(e.to_string()))?;

            for point in points {
                if point.vector.len() != dimension {
                    return Err(DomainError::IncompatibleArtifact(format!(
                        "embedding dimension {} does not match configured {dimension}",
                        point.vector.len()
                    )));
                }
                let embedding_literal = format!(
                    "[{}]",
                    point.vector.iter().map(|f| f.to_string()).collect::<Vec<_>>().join(",")
                );
                tx.execute(
                    &format!(
                        "INSERT INTO chunks (id, repo_id, relative_path, content_hash, symbol, kind, line, span_start, span_end, language, context_before, context_after, embedding) \
                         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, {embedding_literal}::FLOAT[{dimension}]) \
                         ON CONFLICT (id) DO UPDATE SET relative_path = excluded.relative_path, content_hash = excluded.content_hash"
                    ),
                    params![
                        point.id,
                        point.payload.repo_id,
                        point.payload.relative_path,
                        point.payload.content_hash,
                        point.payload.symbol,
                        point.payload.kind,
                        point.payload.line,
                        point.payload.span.0,
                        point.payload.span.1,
                        point.payload.language,
                        point.payload.context_before,
                        point.payload.context_after,
                    ],
                )
                .map_err(|e| DomainError::VectorStoreUnavailable(e.to_string()))?;
            }

            tx.commit().map_err(|e| DomainError::VectorStoreUnavailable(e.to_string()))?;
            Ok(())
        })
        .await
        .map_err(|e| DomainError::internal(format!("vector upsert task panicked: {e}")))?
    }

    async fn remove_by_path(&self, repo_id: &str, relative_path: &str) -> Result<(), DomainError> {
        let conn = self.conn.clone();
        let repo_id = repo_id.to_string();
        let relative_path = relative_path.to_string();

        tokio::task::spawn_blocking(move || -> Result<(), DomainError> {
            let conn = conn.lock().map_err(|_| DomainError::internal("vector store lock poisoned"))?;
            conn.execute(
                "DELETE FROM chunks WHERE repo_id = ? AND relative_path = ?",
                params![repo_id, relative_path],
            )
            .map_err(|e| DomainError::VectorStoreUnavailable(e.to_string()))?;
            Ok(())
        })
        .await
        .map_err(|e| DomainError::internal(format!("vector remove task panicked: {e}")))?
    }

    async fn move_path(
        &self,
        repo_id: &str,
        old_relative_path: &str,
        new_relative_path: &str,
    ) -> Result<(), DomainError> {
        let conn = self.conn.clone();
        let repo_id = repo_id.to_string();
        let old_relative_path = old_relative_path.to_string();
        let new_relative_path = new_relative_path.to_string();

        tokio::task::spawn_blocking(move || -> Result<(), DomainError> {
            let conn = conn.lock().map_err(|_| DomainError::internal("vector store lock poisoned"))?;
            conn.execute(
                "UPDATE chunks SET relative_path = ? WHERE repo_id = ? AND relative_path = ?",
                params![new_relative_path, repo_id, old_relative_path],
            )
            .map_err(|e| DomainError::VectorStoreUnavailable(e.to_string()))?;
            Ok(())
        })
        .await
        .map_err(|e| DomainError::internal(format!("vector move task panicked: {e}")))?
    }

    async fn search(&self, repo_id: &str, query_vector: Vec<f32>, k: usize) -> Result<Vec<ScoredPoint>, DomainError> {
        let conn = self.conn.clone();
        let repo_id = repo_id.to_string();
        let dimension = self.dimension;

        tokio::task::spawn_blocking(move || -> Result<Vec<ScoredPoint>, DomainError> {
            let conn = conn.lock().map_err(|_| DomainError::internal("vector store lock poisoned"))?;
            let embedding_literal = format!(
                "[{}]",
                query_vector.iter().map(|f| f.to_string()).collect::<Vec<_>>().join(",")
            );
            let sql = format!(
                "SELECT id, repo_id, relative_path, content_hash, symbol, kind, line, span_start, span_end, language, context_before, context_after, \
                 array_distance(embedding, {embedding_literal}::FLOAT[{dimension}]) AS distance \
                 FROM chunks WHERE repo_id = ? ORDER BY distance ASC LIMIT ?"
            );
            let mut stmt = conn.prepare(&sql).map_err(|e| DomainError::VectorStoreUnavailable(e.to_string()))?;
            let rows = stmt
                .query_map(params![repo_id, k as i64], |row| {
                    let distance: f64 = row.get(12)?;
                    Ok(ScoredPoint {
                        score: 1.0 / (1.0 + distance),
                        point: VectorPoint {
                            id: row.get(0)?,
                            vector: Vec::new(),
                            payload: VectorPayload {
                                repo_id: row.get(1)?,
                                relative_path: row.get(2)?,
                                content_hash: row.get(3)?,
                                symbol: row.get(4)?,
                                kind: row.get(5)?,
                                line: row.get::<_, i64>(6)? as u32,
                                span: (row.get::<_, i64>(7)? as u32, row.get::<_, i64>(8)? as u32),
                                language: row.get(9)?,
                                context_before: row.get(10)?,
                                context_after: row.get(11)?,
                            },
                        },
                    })
                })
                .map_err(|e| DomainError::VectorStoreUnavailable(e.to_string()))?;

            rows.collect::<Result<Vec<_>, _>>()
                .map_err(|e| DomainError::VectorStoreUnavailable(e.to_string()))
        })
        .await
        .map_err(|e| DomainError::internal(format!("vector search task panicked: {e}")))?
    }
}
