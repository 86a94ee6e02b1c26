use std::path::Path;
use std::sync::Arc;

use crate::application::interfaces::{LanguageRegistry, PluginCacheStats, QueryExpander, Storage};
use crate::application::use_cases::index_engine::{IndexEngine, IndexSummary, ProgressCallback};
use crate::application::use_cases::query_planner::QueryPlanner;
use crate::domain::error::DomainError;
use crate::domain::models::{Reference, Repository, SearchMode, SearchResult, Symbol, SymbolKind};

#[derive(Debug, Clone, serde::Serialize)]
pub struct EngineStatus {
    pub files: u64,
    pub symbols: u64,
    pub last_indexed_at: Option<i64>,
    pub plugin_cache_stats: PluginCacheStats,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ReferencesResult {
    pub callers: Vec<Reference>,
    pub callees: Vec<Reference>,
    pub definition: Option<Symbol>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct Outline {
    pub relative_path: String,
    pub symbols: Vec<Symbol>,
}

/// The public core API (spec §4.I / §6): the single entry point the thin
/// MCP tool layer and CLI call into. Contains no business logic of its own
/// beyond routing to the index engine and query planner.
pub struct Dispatcher {
    storage: Arc<dyn Storage>,
    index_engine: Arc<IndexEngine>,
    query_planner: Arc<QueryPlanner>,
    query_expander: Option<Arc<dyn QueryExpander>>,
    registry: Arc<dyn LanguageRegistry>,
}

impl Dispatcher {
    pub fn new(
        storage: Arc<dyn Storage>,
        index_engine: Arc<IndexEngine>,
        query_planner: Arc<QueryPlanner>,
        query_expander: Option<Arc<dyn QueryExpander>>,
        registry: Arc<dyn LanguageRegistry>,
    ) -> Self {
        Self {
            storage,
            index_engine,
            query_planner,
            query_expander,
            registry,
        }
    }

    pub async fn index_file(&self, repo_id: &str, root: &Path, relative_path: &str) -> Result<(), DomainError> {
        self.index_engine.index_file(repo_id, root, relative_path).await
    }

    pub async fn index_directory(
        &self,
        repo_id: &str,
        root: &Path,
        relative_paths: Vec<String>,
        progress: Option<ProgressCallback>,
    ) -> Result<IndexSummary, DomainError> {
        let summary = self.index_engine.index_directory(repo_id, root, relative_paths, progress).await?;
        let indexed_at = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        self.storage
            .touch_repo_indexed(repo_id, &root.to_string_lossy(), indexed_at)
            .await?;
        self.query_planner.invalidate_repo(repo_id);
        Ok(summary)
    }

    pub async fn remove_file(&self, repo_id: &str, relative_path: &str) -> Result<(), DomainError> {
        self.index_engine.remove_file(repo_id, relative_path).await
    }

    /// The dispatcher reclassifies a delete-then-create within the grace
    /// window as a move (spec §4.H); by the time it reaches here the index
    /// engine already treats same-content-hash new paths as moves via
    /// `store_file`, so this simply re-indexes the new path.
    pub async fn move_file(
        &self,
        repo_id: &str,
        root: &Path,
        _old_relative: &str,
        new_relative: &str,
        _new_content_hash: &str,
    ) -> Result<(), DomainError> {
        self.index_engine.index_file(repo_id, root, new_relative).await
    }

    pub async fn lookup_symbol(
        &self,
        repo_id: &str,
        name: &str,
        kind: Option<SymbolKind>,
        fuzzy: bool,
        limit: usize,
    ) -> Result<Vec<Symbol>, DomainError> {
        self.storage.lookup_symbol(repo_id, name, kind, fuzzy, limit).await
    }

    pub async fn search(
        &self,
        repo_id: &str,
        query: &str,
        mode: SearchMode,
        limit: usize,
    ) -> Result<SearchResult, DomainError> {
        let expanded_query = match &self.query_expander {
            Some(expander) => expander.expand(query).await.unwrap_or_else(|_| query.to_string()),
            None => query.to_string(),
        };
        let stats = self.storage.repo_stats(repo_id).await?;
        self.query_planner
            .search(repo_id, stats.last_indexed_at.unwrap_or(0), &expanded_query, mode, limit)
            .await
    }

    /// Aggregates callers and callees for a symbol, falling back to
    /// suffix-resolution when an exact name lookup misses (teacher's
    /// symbol-context pattern).
    pub async fn find_references(
        &self,
        repo_id: &str,
        symbol_identifier: &str,
        include_definitions: bool,
    ) -> Result<ReferencesResult, DomainError> {
        let mut matches = self
            .storage
            .lookup_symbol(repo_id, symbol_identifier, None, false, 1)
            .await?;
        if matches.is_empty() {
            matches = self
                .storage
                .lookup_symbol(repo_id, symbol_identifier, None, true, 1)
                .await?;
        }

        let definition = matches.into_iter().next();
        let callers = match &definition {
            Some(symbol) => self.storage.references_to(symbol.id).await?,
            None => Vec::new(),
        };
        let callees = match &definition {
            Some(symbol) => {
                self.storage
                    .references_within(symbol.file_id, symbol.line_start, symbol.line_end)
                    .await?
            }
            None => Vec::new(),
        };

        Ok(ReferencesResult {
            callers,
            callees,
            definition: if include_definitions { definition } else { None },
        })
    }

    pub async fn get_outline(&self, repo_id: &str, relative_path: &str) -> Result<Outline, DomainError> {
        let file = self
            .storage
            .get_file(repo_id, relative_path)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("{repo_id}:{relative_path}")))?;
        let symbols = self.storage.list_symbols_for_file(file.id).await?;
        Ok(Outline {
            relative_path: relative_path.to_string(),
            symbols,
        })
    }

    pub fn invalidate_query_cache(&self, repo_id: &str) {
        self.query_planner.invalidate_repo(repo_id);
    }

    pub async fn list_repos(&self) -> Result<Vec<Repository>, DomainError> {
        self.storage.list_repos().await
    }

    pub async fn get_status(&self, repo_id: &str) -> Result<EngineStatus, DomainError> {
        let stats = self.storage.repo_stats(repo_id).await?;
        Ok(EngineStatus {
            files: stats.file_count,
            symbols: stats.symbol_count,
            last_indexed_at: stats.last_indexed_at,
            plugin_cache_stats: self.registry.cache_stats(),
        })
    }
}
