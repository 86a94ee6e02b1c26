use async_trait::async_trait;

use crate::domain::error::DomainError;
use crate::domain::models::{File, Import, Reference, Repository, Symbol};

/// Aggregate counts backing `Dispatcher::get_status` (spec §6).
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct RepoStats {
    pub file_count: u64,
    pub symbol_count: u64,
    pub last_indexed_at: Option<i64>,
}

/// Port onto the structured store (spec §4.B). Implemented by
/// `connector::storage::DuckDbStore`. A single writer owns mutation; reads
/// may run concurrently — see `index_engine` for how writes are serialized.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn store_file(
        &self,
        repo_id: &str,
        relative_path: &str,
        content: &[u8],
        content_hash: &str,
        language: &str,
        size_bytes: u64,
        mtime: i64,
    ) -> Result<i64, DomainError>;

    async fn replace_derived(
        &self,
        file_id: i64,
        symbols: Vec<Symbol>,
        references: Vec<Reference>,
        imports: Vec<Import>,
    ) -> Result<(), DomainError>;

    async fn remove_file(&self, repo_id: &str, relative_path: &str) -> Result<(), DomainError>;

    async fn mark_deleted(&self, repo_id: &str, relative_path: &str) -> Result<(), DomainError>;

    async fn get_file(&self, repo_id: &str, relative_path: &str) -> Result<Option<File>, DomainError>;

    /// Resolves the file a symbol/search hit belongs to. Used by retrievers
    /// that only carry a `file_id` (e.g. the fuzzy retriever's symbol
    /// lookup) to populate `relative_path` before rank fusion.
    async fn get_file_by_id(&self, file_id: i64) -> Result<Option<File>, DomainError>;

    async fn get_file_by_content_hash(
        &self,
        repo_id: &str,
        content_hash: &str,
    ) -> Result<Option<File>, DomainError>;

    async fn lookup_symbol(
        &self,
        repo_id: &str,
        name: &str,
        kind: Option<crate::domain::models::SymbolKind>,
        fuzzy: bool,
        limit: usize,
    ) -> Result<Vec<Symbol>, DomainError>;

    async fn fts_search(
        &self,
        repo_id: &str,
        query: &str,
        limit: usize,
        language_filter: Option<&str>,
    ) -> Result<Vec<crate::domain::models::SearchHit>, DomainError>;

    async fn references_to(&self, symbol_id: i64) -> Result<Vec<Reference>, DomainError>;

    /// References made *from* a source range, used to resolve a symbol's
    /// callees: every call/read/write reference recorded in `file_id`
    /// whose line falls within `[line_start, line_end]`.
    async fn references_within(
        &self,
        file_id: i64,
        line_start: u32,
        line_end: u32,
    ) -> Result<Vec<Reference>, DomainError>;

    async fn list_symbols_for_file(&self, file_id: i64) -> Result<Vec<Symbol>, DomainError>;

    /// Hard-deletes soft-deleted rows older than `older_than_secs` (spec §6,
    /// the 30-day compaction window).
    async fn compact(&self, older_than_secs: i64) -> Result<u64, DomainError>;

    async fn repo_stats(&self, repo_id: &str) -> Result<RepoStats, DomainError>;

    /// Registers (or touches) the repository row and bumps its
    /// `last_indexed_at`, invalidating cached queries keyed against it.
    async fn touch_repo_indexed(&self, repo_id: &str, root_path_absolute: &str, indexed_at: i64) -> Result<(), DomainError>;

    /// Every repository ever indexed into this store, for `list` and for
    /// the multi-repo manager's startup registration.
    async fn list_repos(&self) -> Result<Vec<Repository>, DomainError>;
}
