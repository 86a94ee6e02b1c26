use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use duckdb::{params, Connection};
use tracing::info;

use crate::application::interfaces::{RepoStats, Storage};
use crate::domain::error::DomainError;
use crate::domain::models::{
    File, Import, Language, Reference, ReferenceKind, Repository, SearchHit, Symbol, SymbolKind,
};

const SCHEMA_VERSION: i32 = 1;

/// How long a writer waits for the in-process store lock before giving up
/// and reporting `StoreBusy` (spec §7: the caller may retry with backoff).
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const BUSY_RETRY_INTERVAL: Duration = Duration::from_millis(20);
const FTS_TABLE: &str = "files";
const FTS_ID_COLUMN: &str = "id";
const FTS_CONTENT_COLUMN: &str = "content";

/// Blocks until the store lock is free or `BUSY_TIMEOUT` elapses, rather
/// than blocking indefinitely on a held lock. A timed-out wait is the one
/// condition that genuinely maps to `DomainError::StoreBusy`; everything
/// else a DuckDB call can fail with is a deterministic, non-retryable
/// error and maps to `Internal` (see `map_duckdb_err`).
fn lock_conn(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>, DomainError> {
    let deadline = Instant::now() + BUSY_TIMEOUT;
    loop {
        match conn.try_lock() {
            Ok(guard) => return Ok(guard),
            Err(TryLockError::Poisoned(_)) => return Err(DomainError::internal("store lock poisoned")),
            Err(TryLockError::WouldBlock) => {
                if Instant::now() >= deadline {
                    return Err(DomainError::StoreBusy(format!(
                        "store lock not acquired within {BUSY_TIMEOUT:?}"
                    )));
                }
                std::thread::sleep(BUSY_RETRY_INTERVAL);
            }
        }
    }
}

/// Classifies a `duckdb::Error` rather than collapsing every failure into
/// `StoreBusy` (spec §7: `StoreBusy` specifically means "retry with
/// backoff", which only makes sense for lock/transaction-conflict errors).
/// Everything else — malformed SQL, constraint violations, commit
/// failures — is deterministic and maps to `Internal` so callers fail fast
/// instead of retrying a query that can never succeed.
fn map_duckdb_err(e: duckdb::Error) -> DomainError {
    let msg = e.to_string();
    let lower = msg.to_lowercase();
    if lower.contains("lock") || lower.contains("busy") || lower.contains("conflict") {
        DomainError::StoreBusy(msg)
    } else {
        DomainError::Internal(msg)
    }
}

/// DuckDB-backed implementation of the structured store (spec §4.B). One
/// instance owns one `current.db` shared by every repository, distinguished
/// by the `repo_id` column on every table; the writer discipline of §5
/// (single writer, many readers) is enforced by serializing every write
/// through the same `Mutex<Connection>` rather than by DuckDB itself. A
/// caller that can't acquire the lock within the configured busy timeout
/// should treat that as `StoreBusy` and retry with backoff.
pub struct DuckDbStore {
    conn: Arc<Mutex<Connection>>,
    next_id: AtomicI64,
}

impl DuckDbStore {
    pub fn open(db_path: &Path) -> Result<Self, DomainError> {
        let conn = Connection::open(db_path)
            .map_err(|e| DomainError::corrupt(format!("failed to open {}: {e}", db_path.display())))?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            next_id: AtomicI64::new(1),
        };
        store.migrate()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, DomainError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| DomainError::corrupt(format!("failed to open in-memory db: {e}")))?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            next_id: AtomicI64::new(1),
        };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<(), DomainError> {
        let conn = lock_conn(&self.conn)?;
        conn.execute_batch("INSTALL fts; LOAD fts;")
            .map_err(|e| DomainError::corrupt(format!("failed to load fts extension: {e}")))?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (version INTEGER);

            CREATE TABLE IF NOT EXISTS repositories (
                id TEXT PRIMARY KEY,
                root_path_absolute TEXT NOT NULL,
                created_at BIGINT NOT NULL,
                last_indexed_at BIGINT
            );

            CREATE TABLE IF NOT EXISTS files (
                id BIGINT PRIMARY KEY,
                repo_id TEXT NOT NULL,
                relative_path TEXT NOT NULL,
                language TEXT NOT NULL,
                size_bytes BIGINT NOT NULL,
                content_hash TEXT NOT NULL,
                content TEXT NOT NULL DEFAULT '',
                mtime BIGINT NOT NULL,
                indexed_at BIGINT NOT NULL,
                is_deleted BOOLEAN NOT NULL DEFAULT false,
                deleted_at BIGINT
            );
            CREATE INDEX IF NOT EXISTS idx_files_repo_path ON files(repo_id, relative_path);
            CREATE INDEX IF NOT EXISTS idx_files_content_hash ON files(content_hash);

            CREATE TABLE IF NOT EXISTS symbols (
                id BIGINT PRIMARY KEY,
                file_id BIGINT NOT NULL,
                name TEXT NOT NULL,
                kind TEXT NOT NULL,
                line_start INTEGER NOT NULL,
                line_end INTEGER NOT NULL,
                col_start INTEGER NOT NULL,
                col_end INTEGER NOT NULL,
                signature TEXT,
                doc TEXT,
                metadata_json TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_symbols_name ON symbols(name);
            CREATE INDEX IF NOT EXISTS idx_symbols_kind ON symbols(kind);
            CREATE INDEX IF NOT EXISTS idx_symbols_file_id ON symbols(file_id);

            CREATE TABLE IF NOT EXISTS code_references (
                id BIGINT PRIMARY KEY,
                symbol_id BIGINT,
                resolved_name TEXT NOT NULL,
                file_id BIGINT NOT NULL,
                line INTEGER NOT NULL,
                col INTEGER NOT NULL,
                kind TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_refs_symbol_id ON code_references(symbol_id);

            CREATE TABLE IF NOT EXISTS imports (
                id BIGINT PRIMARY KEY,
                file_id BIGINT NOT NULL,
                imported_path TEXT NOT NULL,
                imported_name TEXT,
                alias TEXT,
                line INTEGER NOT NULL,
                is_relative BOOLEAN NOT NULL
            );

            CREATE TABLE IF NOT EXISTS file_moves (
                id BIGINT PRIMARY KEY,
                repo_id TEXT NOT NULL,
                file_id BIGINT NOT NULL,
                old_relative_path TEXT NOT NULL,
                new_relative_path TEXT NOT NULL,
                moved_at BIGINT NOT NULL
            );
            "#,
        )
        .map_err(|e| DomainError::corrupt(format!("migration failed: {e}")))?;

        let current_version: i32 = conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0))
            .unwrap_or(0);
        if current_version == 0 {
            conn.execute("INSERT INTO schema_version (version) VALUES (?)", params![SCHEMA_VERSION])
                .map_err(|e| DomainError::corrupt(format!("failed to stamp schema version: {e}")))?;
        } else if current_version > SCHEMA_VERSION {
            return Err(DomainError::SchemaIncompatible(format!(
                "db schema version {current_version} newer than supported {SCHEMA_VERSION}"
            )));
        }

        rebuild_fts_index(&conn)?;
        Ok(())
    }

    fn allocate_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

/// (Re)builds the BM25 full-text index over `files.content` (spec §4.B).
/// DuckDB's `fts` extension materializes a static index rather than
/// updating it incrementally, so every write that changes `content` rebuilds
/// it before the write transaction is considered complete — the cost is
/// paid by the writer, never by a concurrent reader.
fn rebuild_fts_index(conn: &Connection) -> Result<(), DomainError> {
    conn.execute_batch(&format!(
        "PRAGMA create_fts_index('{FTS_TABLE}', '{FTS_ID_COLUMN}', '{FTS_CONTENT_COLUMN}', overwrite=1)"
    ))
    .map_err(|e| DomainError::corrupt(format!("failed to rebuild fts index: {e}")))
}

#[async_trait]
impl Storage for DuckDbStore {
    async fn store_file(
        &self,
        repo_id: &str,
        relative_path: &str,
        content: &[u8],
        content_hash: &str,
        language: &str,
        size_bytes: u64,
        mtime: i64,
    ) -> Result<i64, DomainError> {
        let conn = self.conn.clone();
        let repo_id = repo_id.to_string();
        let relative_path = relative_path.to_string();
        let content_text = String::from_utf8_lossy(content).into_owned();
        let content_hash = content_hash.to_string();
        let language = language.to_string();
        let new_id = self.allocate_id();
        let now = now_secs();

        tokio::task::spawn_blocking(move || -> Result<i64, DomainError> {
            let conn = lock_conn(&conn)?;

            let existing_same_path: Option<i64> = conn
                .query_row(
                    "SELECT id FROM files WHERE repo_id = ? AND relative_path = ? AND is_deleted = false",
                    params![repo_id, relative_path],
                    |row| row.get(0),
                )
                .ok();

            let file_id = if let Some(file_id) = existing_same_path {
                conn.execute(
                    "UPDATE files SET content_hash = ?, content = ?, language = ?, size_bytes = ?, mtime = ?, indexed_at = ? WHERE id = ?",
                    params![content_hash, content_text, language, size_bytes as i64, mtime, now, file_id],
                )
                .map_err(map_duckdb_err)?;
                file_id
            } else {
                // No row at this path — check whether another non-deleted
                // file in the repo carries the same content hash; if so
                // this is a move and the existing row is renamed in place
                // (spec §4.B).
                let moved: Option<(i64, String)> = conn
                    .query_row(
                        "SELECT id, relative_path FROM files WHERE repo_id = ? AND content_hash = ? AND is_deleted = false LIMIT 1",
                        params![repo_id, content_hash],
                        |row| Ok((row.get(0)?, row.get(1)?)),
                    )
                    .ok();

                if let Some((file_id, old_relative_path)) = moved {
                    conn.execute(
                        "UPDATE files SET relative_path = ?, indexed_at = ? WHERE id = ?",
                        params![relative_path, now, file_id],
                    )
                    .map_err(map_duckdb_err)?;
                    conn.execute(
                        "INSERT INTO file_moves (id, repo_id, file_id, old_relative_path, new_relative_path, moved_at) VALUES (?, ?, ?, ?, ?, ?)",
                        params![new_id, repo_id, file_id, old_relative_path, relative_path, now],
                    )
                    .map_err(map_duckdb_err)?;
                    file_id
                } else {
                    conn.execute(
                        "INSERT INTO files (id, repo_id, relative_path, language, size_bytes, content_hash, content, mtime, indexed_at, is_deleted, deleted_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, false, NULL)",
                        params![new_id, repo_id, relative_path, language, size_bytes as i64, content_hash, content_text, mtime, now],
                    )
                    .map_err(map_duckdb_err)?;
                    new_id
                }
            };

            rebuild_fts_index(&conn)?;
            Ok(file_id)
        })
        .await
        .map_err(|e| DomainError::internal(format!("store_file task panicked: {e}")))?
    }

    async fn replace_derived(
        &self,
        file_id: i64,
        symbols: Vec<Symbol>,
        references: Vec<Reference>,
        imports: Vec<Import>,
    ) -> Result<(), DomainError> {
        let conn = self.conn.clone();
        let next_symbol_id = self.allocate_id();

        tokio::task::spawn_blocking(move || -> Result<(), DomainError> {
            let mut conn = lock_conn(&conn)?;
            let tx = conn
                .transaction()
                .map_err(|e| DomainError::storage(format!("begin transaction: {e}")))?;

            tx.execute("DELETE FROM symbols WHERE file_id = ?", params![file_id])
                .map_err(map_duckdb_err)?;
            tx.execute("DELETE FROM code_references WHERE file_id = ?", params![file_id])
                .map_err(map_duckdb_err)?;
            tx.execute("DELETE FROM imports WHERE file_id = ?", params![file_id])
                .map_err(map_duckdb_err)?;

            let mut id_counter = next_symbol_id;
            for symbol in &symbols {
                tx.execute(
                    "INSERT INTO symbols (id, file_id, name, kind, line_start, line_end, col_start, col_end, signature, doc, metadata_json) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                    params![
                        id_counter,
                        file_id,
                        symbol.name,
                        symbol_kind_to_str(symbol.kind),
                        symbol.line_start,
                        symbol.line_end,
                        symbol.col_start,
                        symbol.col_end,
                        symbol.signature,
                        symbol.doc,
                        symbol.metadata_json,
                    ],
                )
                .map_err(map_duckdb_err)?;
                id_counter += 1;
            }

            for reference in &references {
                tx.execute(
                    "INSERT INTO code_references (id, symbol_id, resolved_name, file_id, line, col, kind) VALUES (?, ?, ?, ?, ?, ?, ?)",
                    params![
                        id_counter,
                        reference.symbol_id,
                        reference.resolved_name,
                        file_id,
                        reference.line,
                        reference.col,
                        reference_kind_to_str(reference.kind),
                    ],
                )
                .map_err(map_duckdb_err)?;
                id_counter += 1;
            }

            for import in &imports {
                tx.execute(
                    "INSERT INTO imports (id, file_id, imported_path, imported_name, alias, line, is_relative) VALUES (?, ?, ?, ?, ?, ?, ?)",
                    params![
                        id_counter,
                        file_id,
                        import.imported_path,
                        import.imported_name,
                        import.alias,
                        import.line,
                        import.is_relative,
                    ],
                )
                .map_err(map_duckdb_err)?;
                id_counter += 1;
            }

            tx.commit().map_err(|e| DomainError::storage(format!("commit: {e}")))?;
            Ok(())
        })
        .await
        .map_err(|e| DomainError::internal(format!("replace_derived task panicked: {e}")))?
    }

    async fn remove_file(&self, repo_id: &str, relative_path: &str) -> Result<(), DomainError> {
        let conn = self.conn.clone();
        let repo_id = repo_id.to_string();
        let relative_path = relative_path.to_string();
        let now = now_secs();

        tokio::task::spawn_blocking(move || -> Result<(), DomainError> {
            let conn = lock_conn(&conn)?;
            let file_id: Option<i64> = conn
                .query_row(
                    "SELECT id FROM files WHERE repo_id = ? AND relative_path = ?",
                    params![repo_id, relative_path],
                    |row| row.get(0),
                )
                .ok();
            let Some(file_id) = file_id else {
                return Ok(());
            };
            conn.execute("DELETE FROM symbols WHERE file_id = ?", params![file_id])
                .map_err(map_duckdb_err)?;
            conn.execute("DELETE FROM code_references WHERE file_id = ?", params![file_id])
                .map_err(map_duckdb_err)?;
            conn.execute("DELETE FROM imports WHERE file_id = ?", params![file_id])
                .map_err(map_duckdb_err)?;
            conn.execute(
                "UPDATE files SET is_deleted = true, deleted_at = ? WHERE id = ?",
                params![now, file_id],
            )
            .map_err(map_duckdb_err)?;
            Ok(())
        })
        .await
        .map_err(|e| DomainError::internal(format!("remove_file task panicked: {e}")))?
    }

    async fn mark_deleted(&self, repo_id: &str, relative_path: &str) -> Result<(), DomainError> {
        self.remove_file(repo_id, relative_path).await
    }

    async fn get_file(&self, repo_id: &str, relative_path: &str) -> Result<Option<File>, DomainError> {
        let conn = self.conn.clone();
        let repo_id = repo_id.to_string();
        let relative_path = relative_path.to_string();

        tokio::task::spawn_blocking(move || -> Result<Option<File>, DomainError> {
            let conn = lock_conn(&conn)?;
            conn.query_row(
                "SELECT id, repo_id, relative_path, language, size_bytes, content_hash, mtime, indexed_at, is_deleted, deleted_at FROM files WHERE repo_id = ? AND relative_path = ?",
                params![repo_id, relative_path],
                row_to_file,
            )
            .map(Some)
            .or_else(|e| match e {
                duckdb::Error::QueryReturnedNoRows => Ok(None),
                other => Err(map_duckdb_err(other)),
            })
        })
        .await
        .map_err(|e| DomainError::internal(format!("get_file task panicked: {e}")))?
    }

    async fn get_file_by_content_hash(
        &self,
        repo_id: &str,
        content_hash: &str,
    ) -> Result<Option<File>, DomainError> {
        let conn = self.conn.clone();
        let repo_id = repo_id.to_string();
        let content_hash = content_hash.to_string();

        tokio::task::spawn_blocking(move || -> Result<Option<File>, DomainError> {
            let conn = lock_conn(&conn)?;
            conn.query_row(
                "SELECT id, repo_id, relative_path, language, size_bytes, content_hash, mtime, indexed_at, is_deleted, deleted_at FROM files WHERE repo_id = ? AND content_hash = ? AND is_deleted = false LIMIT 1",
                params![repo_id, content_hash],
                row_to_file,
            )
            .map(Some)
            .or_else(|e| match e {
                duckdb::Error::QueryReturnedNoRows => Ok(None),
                other => Err(map_duckdb_err(other)),
            })
        })
        .await
        .map_err(|e| DomainError::internal(format!("get_file_by_content_hash task panicked: {e}")))?
    }

    async fn lookup_symbol(
        &self,
        repo_id: &str,
        name: &str,
        kind: Option<SymbolKind>,
        fuzzy: bool,
        limit: usize,
    ) -> Result<Vec<Symbol>, DomainError> {
        let conn = self.conn.clone();
        let repo_id = repo_id.to_string();
        let name = name.to_string();

        tokio::task::spawn_blocking(move || -> Result<Vec<Symbol>, DomainError> {
            let conn = lock_conn(&conn)?;

            let kind_filter = kind.map(symbol_kind_to_str);
            let base = if fuzzy {
                // No native trigram index; rank by Jaro-Winkler similarity,
                // a built-in DuckDB string function, as a practical
                // approximation of the spec's trigram ranking.
                "SELECT s.id, s.file_id, s.name, s.kind, s.line_start, s.line_end, s.col_start, s.col_end, s.signature, s.doc, s.metadata_json \
                 FROM symbols s JOIN files f ON f.id = s.file_id \
                 WHERE f.repo_id = ? AND f.is_deleted = false AND (? IS NULL OR s.kind = ?) \
                 ORDER BY jaro_winkler_similarity(s.name, ?) DESC LIMIT ?"
            } else {
                "SELECT s.id, s.file_id, s.name, s.kind, s.line_start, s.line_end, s.col_start, s.col_end, s.signature, s.doc, s.metadata_json \
                 FROM symbols s JOIN files f ON f.id = s.file_id \
                 WHERE f.repo_id = ? AND f.is_deleted = false AND (? IS NULL OR s.kind = ?) \
                 AND (s.name = ? OR s.name ILIKE ? || '%') \
                 ORDER BY (s.name = ?) DESC LIMIT ?"
            };

            let mut stmt = conn.prepare(base).map_err(map_duckdb_err)?;
            let rows = if fuzzy {
                stmt.query_map(params![repo_id, kind_filter, kind_filter, name, limit as i64], row_to_symbol)
            } else {
                stmt.query_map(
                    params![repo_id, kind_filter, kind_filter, name, name, name, limit as i64],
                    row_to_symbol,
                )
            }
            .map_err(map_duckdb_err)?;

            rows.collect::<Result<Vec<_>, _>>()
                .map_err(map_duckdb_err)
        })
        .await
        .map_err(|e| DomainError::internal(format!("lookup_symbol task panicked: {e}")))?
    }

    async fn fts_search(
        &self,
        repo_id: &str,
        query: &str,
        limit: usize,
        language_filter: Option<&str>,
    ) -> Result<Vec<SearchHit>, DomainError> {
        let conn = self.conn.clone();
        let repo_id = repo_id.to_string();
        let query = query.to_string();
        let language_filter = language_filter.map(str::to_string);

        tokio::task::spawn_blocking(move || -> Result<Vec<SearchHit>, DomainError> {
            let conn = lock_conn(&conn)?;
            // `match_bm25` scores the whole document; it has no notion of a
            // matching line, so the first line containing the query term is
            // located in Rust below to give the hit a `line`/`snippet`.
            let mut stmt = conn
                .prepare(
                    "SELECT f.id, f.relative_path, f.content, fts_main_files.match_bm25(f.id, ?) AS score \
                     FROM files f \
                     WHERE f.repo_id = ? AND f.is_deleted = false \
                     AND (? IS NULL OR f.language = ?) \
                     AND fts_main_files.match_bm25(f.id, ?) IS NOT NULL \
                     ORDER BY score DESC LIMIT ?",
                )
                .map_err(map_duckdb_err)?;

            let rows = stmt
                .query_map(
                    params![query, repo_id, language_filter, language_filter, query, limit as i64],
                    |row| {
                        let file_id: i64 = row.get(0)?;
                        let relative_path: String = row.get(1)?;
                        let content: String = row.get(2)?;
                        let score: f64 = row.get(3)?;
                        Ok((file_id, relative_path, content, score))
                    },
                )
                .map_err(map_duckdb_err)?;

            let mut hits = Vec::new();
            for row in rows {
                let (file_id, relative_path, content, score) = row.map_err(map_duckdb_err)?;
                let (line, snippet) = locate_match(&content, &query);
                hits.push(SearchHit {
                    file_id,
                    repo_id: repo_id.clone(),
                    relative_path,
                    line,
                    snippet,
                    score,
                    retrievers: vec![],
                });
            }
            Ok(hits)
        })
        .await
        .map_err(|e| DomainError::internal(format!("fts_search task panicked: {e}")))?
    }

    async fn references_to(&self, symbol_id: i64) -> Result<Vec<Reference>, DomainError> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || -> Result<Vec<Reference>, DomainError> {
            let conn = lock_conn(&conn)?;
            let mut stmt = conn
                .prepare("SELECT id, symbol_id, resolved_name, file_id, line, col, kind FROM code_references WHERE symbol_id = ?")
                .map_err(map_duckdb_err)?;
            let rows = stmt
                .query_map(params![symbol_id], row_to_reference)
                .map_err(map_duckdb_err)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(map_duckdb_err)
        })
        .await
        .map_err(|e| DomainError::internal(format!("references_to task panicked: {e}")))?
    }

    async fn references_within(&self, file_id: i64, line_start: u32, line_end: u32) -> Result<Vec<Reference>, DomainError> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || -> Result<Vec<Reference>, DomainError> {
            let conn = lock_conn(&conn)?;
            let mut stmt = conn
                .prepare(
                    "SELECT id, symbol_id, resolved_name, file_id, line, col, kind FROM code_references \
                     WHERE file_id = ? AND line BETWEEN ? AND ? ORDER BY line",
                )
                .map_err(map_duckdb_err)?;
            let rows = stmt
                .query_map(params![file_id, line_start, line_end], row_to_reference)
                .map_err(map_duckdb_err)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(map_duckdb_err)
        })
        .await
        .map_err(|e| DomainError::internal(format!("references_within task panicked: {e}")))?
    }

    async fn get_file_by_id(&self, file_id: i64) -> Result<Option<File>, DomainError> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || -> Result<Option<File>, DomainError> {
            let conn = lock_conn(&conn)?;
            conn.query_row(
                "SELECT id, repo_id, relative_path, language, size_bytes, content_hash, mtime, indexed_at, is_deleted, deleted_at FROM files WHERE id = ?",
                params![file_id],
                row_to_file,
            )
            .map(Some)
            .or_else(|e| match e {
                duckdb::Error::QueryReturnedNoRows => Ok(None),
                other => Err(map_duckdb_err(other)),
            })
        })
        .await
        .map_err(|e| DomainError::internal(format!("get_file_by_id task panicked: {e}")))?
    }

    async fn list_symbols_for_file(&self, file_id: i64) -> Result<Vec<Symbol>, DomainError> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || -> Result<Vec<Symbol>, DomainError> {
            let conn = lock_conn(&conn)?;
            let mut stmt = conn
                .prepare("SELECT id, file_id, name, kind, line_start, line_end, col_start, col_end, signature, doc, metadata_json FROM symbols WHERE file_id = ? ORDER BY line_start")
                .map_err(map_duckdb_err)?;
            let rows = stmt
                .query_map(params![file_id], row_to_symbol)
                .map_err(map_duckdb_err)?;
            rows.collect::<Result<Vec<_>, _>>()
                .map_err(map_duckdb_err)
        })
        .await
        .map_err(|e| DomainError::internal(format!("list_symbols_for_file task panicked: {e}")))?
    }

    async fn compact(&self, older_than_secs: i64) -> Result<u64, DomainError> {
        let conn = self.conn.clone();
        let cutoff = now_secs() - older_than_secs;

        tokio::task::spawn_blocking(move || -> Result<u64, DomainError> {
            let conn = lock_conn(&conn)?;
            let removed = conn
                .execute(
                    "DELETE FROM files WHERE is_deleted = true AND deleted_at < ?",
                    params![cutoff],
                )
                .map_err(map_duckdb_err)?;
            info!(removed, "compaction removed soft-deleted rows older than threshold");
            Ok(removed as u64)
        })
        .await
        .map_err(|e| DomainError::internal(format!("compact task panicked: {e}")))?
    }

    async fn repo_stats(&self, repo_id: &str) -> Result<RepoStats, DomainError> {
        let conn = self.conn.clone();
        let repo_id = repo_id.to_string();

        tokio::task::spawn_blocking(move || -> Result<RepoStats, DomainError> {
            let conn = lock_conn(&conn)?;
            let file_count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM files WHERE repo_id = ? AND is_deleted = false",
                    params![repo_id],
                    |row| row.get(0),
                )
                .map_err(map_duckdb_err)?;
            let symbol_count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM symbols s JOIN files f ON f.id = s.file_id \
                     WHERE f.repo_id = ? AND f.is_deleted = false",
                    params![repo_id],
                    |row| row.get(0),
                )
                .map_err(map_duckdb_err)?;
            let last_indexed_at: Option<i64> = conn
                .query_row(
                    "SELECT last_indexed_at FROM repositories WHERE id = ?",
                    params![repo_id],
                    |row| row.get(0),
                )
                .ok();

            Ok(RepoStats {
                file_count: file_count as u64,
                symbol_count: symbol_count as u64,
                last_indexed_at,
            })
        })
        .await
        .map_err(|e| DomainError::internal(format!("repo_stats task panicked: {e}")))?
    }

    async fn touch_repo_indexed(&self, repo_id: &str, root_path_absolute: &str, indexed_at: i64) -> Result<(), DomainError> {
        let conn = self.conn.clone();
        let repo_id = repo_id.to_string();
        let root_path_absolute = root_path_absolute.to_string();

        tokio::task::spawn_blocking(move || -> Result<(), DomainError> {
            let conn = lock_conn(&conn)?;
            conn.execute(
                "INSERT INTO repositories (id, root_path_absolute, created_at, last_indexed_at) VALUES (?, ?, ?, ?) \
                 ON CONFLICT (id) DO UPDATE SET last_indexed_at = excluded.last_indexed_at",
                params![repo_id, root_path_absolute, indexed_at, indexed_at],
            )
            .map_err(map_duckdb_err)?;
            Ok(())
        })
        .await
        .map_err(|e| DomainError::internal(format!("touch_repo_indexed task panicked: {e}")))?
    }

    async fn list_repos(&self) -> Result<Vec<Repository>, DomainError> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || -> Result<Vec<Repository>, DomainError> {
            let conn = lock_conn(&conn)?;
            let mut stmt = conn
                .prepare("SELECT id, root_path_absolute, created_at, last_indexed_at FROM repositories ORDER BY id")
                .map_err(map_duckdb_err)?;
            let repos = stmt
                .query_map([], |row| {
                    Ok(Repository {
                        id: row.get(0)?,
                        root_path_absolute: std::path::PathBuf::from(row.get::<_, String>(1)?),
                        created_at: row.get(2)?,
                        last_indexed_at: row.get(3)?,
                    })
                })
                .map_err(map_duckdb_err)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(map_duckdb_err)?;
            Ok(repos)
        })
        .await
        .map_err(|e| DomainError::internal(format!("list_repos task panicked: {e}")))?
    }
}

/// Finds the first line in `content` containing `query` (case-insensitive)
/// and returns its 1-based line number and the line itself as a snippet.
/// Falls back to line 1 and the whole content's first line when the index
/// considers the document a match but the literal term isn't found verbatim
/// (stemming/synonym matches in the `fts` extension's tokenizer).
fn locate_match(content: &str, query: &str) -> (u32, String) {
    let needle = query.to_lowercase();
    for (idx, line) in content.lines().enumerate() {
        if line.to_lowercase().contains(&needle) {
            return ((idx + 1) as u32, line.trim().to_string());
        }
    }
    (1, content.lines().next().unwrap_or_default().trim().to_string())
}

fn now_secs() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn symbol_kind_to_str(kind: SymbolKind) -> &'static str {
    match kind {
        SymbolKind::Function => "function",
        SymbolKind::Method => "method",
        SymbolKind::Class => "class",
        SymbolKind::Struct => "struct",
        SymbolKind::Interface => "interface",
        SymbolKind::Trait => "trait",
        SymbolKind::Enum => "enum",
        SymbolKind::Variant => "variant",
        SymbolKind::Field => "field",
        SymbolKind::Variable => "variable",
        SymbolKind::Constant => "constant",
        SymbolKind::Module => "module",
        SymbolKind::Namespace => "namespace",
        SymbolKind::TypeAlias => "type_alias",
        SymbolKind::Macro => "macro",
        SymbolKind::Mixin => "mixin",
        SymbolKind::Extension => "extension",
        SymbolKind::Widget => "widget",
        SymbolKind::Section => "section",
        SymbolKind::Other => "other",
    }
}

fn symbol_kind_from_str(s: &str) -> SymbolKind {
    match s {
        "function" => SymbolKind::Function,
        "method" => SymbolKind::Method,
        "class" => SymbolKind::Class,
        "struct" => SymbolKind::Struct,
        "interface" => SymbolKind::Interface,
        "trait" => SymbolKind::Trait,
        "enum" => SymbolKind::Enum,
        "variant" => SymbolKind::Variant,
        "field" => SymbolKind::Field,
        "variable" => SymbolKind::Variable,
        "constant" => SymbolKind::Constant,
        "module" => SymbolKind::Module,
        "namespace" => SymbolKind::Namespace,
        "type_alias" => SymbolKind::TypeAlias,
        "macro" => SymbolKind::Macro,
        "mixin" => SymbolKind::Mixin,
        "extension" => SymbolKind::Extension,
        "widget" => SymbolKind::Widget,
        "section" => SymbolKind::Section,
        _ => SymbolKind::Other,
    }
}

fn reference_kind_to_str(kind: ReferenceKind) -> &'static str {
    match kind {
        ReferenceKind::Call => "call",
        ReferenceKind::Read => "read",
        ReferenceKind::Write => "write",
        ReferenceKind::Import => "import",
        ReferenceKind::Inherit => "inherit",
        ReferenceKind::Implement => "implement",
        ReferenceKind::Override => "override",
        ReferenceKind::Other => "other",
    }
}

fn reference_kind_from_str(s: &str) -> ReferenceKind {
    match s {
        "call" => ReferenceKind::Call,
        "read" => ReferenceKind::Read,
        "write" => ReferenceKind::Write,
        "import" => ReferenceKind::Import,
        "inherit" => ReferenceKind::Inherit,
        "implement" => ReferenceKind::Implement,
        "override" => ReferenceKind::Override,
        _ => ReferenceKind::Other,
    }
}

fn row_to_file(row: &duckdb::Row) -> duckdb::Result<File> {
    let language_id: String = row.get(3)?;
    Ok(File {
        id: row.get(0)?,
        repo_id: row.get(1)?,
        relative_path: row.get(2)?,
        language: Language::from_extension(&language_id).unwrap_or(Language::Unknown),
        size_bytes: row.get::<_, i64>(4)? as u64,
        content_hash: row.get(5)?,
        mtime: row.get(6)?,
        indexed_at: row.get(7)?,
        is_deleted: row.get(8)?,
        deleted_at: row.get(9)?,
    })
}

fn row_to_symbol(row: &duckdb::Row) -> duckdb::Result<Symbol> {
    let kind_str: String = row.get(3)?;
    Ok(Symbol {
        id: row.get(0)?,
        file_id: row.get(1)?,
        name: row.get(2)?,
        kind: symbol_kind_from_str(&kind_str),
        line_start: row.get::<_, i64>(4)? as u32,
        line_end: row.get::<_, i64>(5)? as u32,
        col_start: row.get::<_, i64>(6)? as u32,
        col_end: row.get::<_, i64>(7)? as u32,
        signature: row.get(8)?,
        doc: row.get(9)?,
        metadata_json: row.get(10)?,
    })
}

fn row_to_reference(row: &duckdb::Row) -> duckdb::Result<Reference> {
    let kind_str: String = row.get(6)?;
    Ok(Reference {
        id: row.get(0)?,
        symbol_id: row.get(1)?,
        resolved_name: row.get(2)?,
        file_id: row.get(3)?,
        line: row.get::<_, i64>(4)? as u32,
        col: row.get::<_, i64>(5)? as u32,
        kind: reference_kind_from_str(&kind_str),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn store_and_get_file_round_trip() {
        let store = DuckDbStore::open_in_memory().unwrap();
        let id = store
            .store_file("repo1", "src/a.py", b"def a():\n    pass\n", "hash1", "python", 42, 1000)
            .await
            .unwrap();
        let file = store.get_file("repo1", "src/a.py").await.unwrap().unwrap();
        assert_eq!(file.id, id);
        assert_eq!(file.content_hash, "hash1");
    }

    #[tokio::test]
    async fn rename_with_same_hash_is_a_move_not_a_new_row() {
        let store = DuckDbStore::open_in_memory().unwrap();
        let content: &[u8] = b"def a():\n    pass\n";
        let id = store
            .store_file("repo1", "src/a.py", content, "hashA", "python", 10, 1000)
            .await
            .unwrap();
        let moved_id = store
            .store_file("repo1", "src/b.py", content, "hashA", "python", 10, 1001)
            .await
            .unwrap();
        assert_eq!(id, moved_id);
        assert!(store.get_file("repo1", "src/a.py").await.unwrap().is_none());
        let renamed = store.get_file("repo1", "src/b.py").await.unwrap().unwrap();
        assert_eq!(renamed.id, id);
    }

    #[tokio::test]
    async fn soft_deleted_file_excluded_from_hash_lookup() {
        let store = DuckDbStore::open_in_memory().unwrap();
        store
            .store_file("repo1", "src/a.py", b"def a():\n    pass\n", "hashA", "python", 10, 1000)
            .await
            .unwrap();
        store.remove_file("repo1", "src/a.py").await.unwrap();
        assert!(store.get_file_by_content_hash("repo1", "hashA").await.unwrap().is_none());
        let file = store.get_file("repo1", "src/a.py").await.unwrap().unwrap();
        assert!(file.is_deleted);
    }

    #[tokio::test]
    async fn fts_search_finds_content_by_substring() {
        let store = DuckDbStore::open_in_memory().unwrap();
        store
            .store_file("repo1", "billing.py", b"def calculate_total():\n    return 42\n", "hashB", "python", 10, 1000)
            .await
            .unwrap();
        let hits = store.fts_search("repo1", "calculate_total", 10, None).await.unwrap();
        assert!(!hits.is_empty(), "expected the indexed content to be found via fts_search");
        assert_eq!(hits[0].relative_path, "billing.py");
    }
}
