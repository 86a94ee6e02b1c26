use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};

use futures_util::future::join_all;
use tracing::info;

use crate::application::use_cases::dispatcher::Dispatcher;
use crate::domain::error::DomainError;
use crate::domain::models::{Repository, SearchHit, SearchMode, SearchResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginStrategy {
    Auto,
    All,
    Minimal,
}

impl PluginStrategy {
    pub fn from_env_str(s: &str) -> Self {
        match s {
            "all" => Self::All,
            "minimal" => Self::Minimal,
            _ => Self::Auto,
        }
    }
}

struct RepoEntry {
    repository: Repository,
    authorized: bool,
    languages_detected: HashSet<String>,
    last_access: i64,
}

/// Manages multiple open repositories: authorization before cross-repo
/// queries, language-stat aggregation for plugin pre-loading, and
/// cross-repo search fusion (spec §4.J).
pub struct MultiRepoManager {
    dispatcher: Arc<Dispatcher>,
    strategy: PluginStrategy,
    reference_repos: HashSet<String>,
    multi_repo_enabled: bool,
    repos: Mutex<HashMap<String, RepoEntry>>,
}

impl MultiRepoManager {
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        strategy: PluginStrategy,
        multi_repo_enabled: bool,
        reference_repos: HashSet<String>,
    ) -> Self {
        Self {
            dispatcher,
            strategy,
            reference_repos,
            multi_repo_enabled,
            repos: Mutex::new(HashMap::new()),
        }
    }

    pub fn register(&self, repository: Repository, now: i64) {
        let authorized = self.reference_repos.is_empty() || self.reference_repos.contains(&repository.id);
        let mut repos = self.repos.lock().unwrap();
        info!(repo_id = %repository.id, authorized, "repository registered");
        repos.insert(
            repository.id.clone(),
            RepoEntry {
                repository,
                authorized,
                languages_detected: HashSet::new(),
                last_access: now,
            },
        );
    }

    /// A non-primary repo must be on the `MCP_REFERENCE_REPOS` allow-list
    /// (spec §9 open-question decision). Denies by default otherwise.
    pub fn authorize(&self, repo_id: &str) -> Result<(), DomainError> {
        let repos = self.repos.lock().unwrap();
        match repos.get(repo_id) {
            Some(entry) if entry.authorized => Ok(()),
            Some(_) => Err(DomainError::unauthorized(format!("repo {repo_id} not in reference list"))),
            None => Err(DomainError::not_found(format!("repo {repo_id} not registered"))),
        }
    }

    /// Registers a repo just indexed through this process, so subsequent
    /// `search_scope` calls can authorize it without a separate `register`
    /// call. Keeps the repo's first-seen `created_at` on re-index.
    pub fn register_indexed(&self, repo_id: &str, root_path_absolute: &Path) {
        let now = now_secs();
        let mut repos = self.repos.lock().unwrap();
        if let Some(entry) = repos.get_mut(repo_id) {
            entry.last_access = now;
            return;
        }
        drop(repos);
        self.register(
            Repository {
                id: repo_id.to_string(),
                root_path_absolute: root_path_absolute.to_path_buf(),
                created_at: now,
                last_indexed_at: Some(now),
            },
            now,
        );
    }

    pub fn observe_languages(&self, repo_id: &str, languages: impl IntoIterator<Item = String>) {
        let mut repos = self.repos.lock().unwrap();
        if let Some(entry) = repos.get_mut(repo_id) {
            entry.languages_detected.extend(languages);
        }
    }

    /// Which languages should be pre-loaded into the plugin cache, per the
    /// configured strategy.
    pub fn preload_languages(&self, primary_repo_id: &str, all_known_languages: &[&'static str]) -> Vec<String> {
        match self.strategy {
            PluginStrategy::All => all_known_languages.iter().map(|s| s.to_string()).collect(),
            PluginStrategy::Minimal => Vec::new(),
            PluginStrategy::Auto => {
                let repos = self.repos.lock().unwrap();
                repos
                    .get(primary_repo_id)
                    .map(|entry| entry.languages_detected.iter().cloned().collect())
                    .unwrap_or_default()
            }
        }
    }

    /// Fans a query out across repo scope and fuses results with the same
    /// rank-fusion rule, annotating each hit's origin repo.
    pub async fn search_scope(
        &self,
        repo_ids: &[String],
        query: &str,
        mode: SearchMode,
        limit: usize,
    ) -> Result<SearchResult, DomainError> {
        if repo_ids.len() > 1 && !self.multi_repo_enabled {
            return Err(DomainError::unauthorized("multi-repo search is disabled"));
        }
        for repo_id in repo_ids {
            self.authorize(repo_id)?;
        }

        // Each repo's search runs independently (own DuckDB read, own
        // retriever deadlines), so fan them out instead of paying their
        // latencies serially (spec §4.J).
        let searches = repo_ids
            .iter()
            .map(|repo_id| self.dispatcher.search(repo_id, query, mode, limit));
        let results = join_all(searches).await;

        let mut all_hits: Vec<SearchHit> = Vec::new();
        let mut degraded = false;
        for result in results {
            let result = result?;
            degraded |= result.degraded;
            all_hits.extend(result.hits);
        }

        all_hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        all_hits.truncate(limit);

        Ok(SearchResult { hits: all_hits, degraded })
    }
}

fn now_secs() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
