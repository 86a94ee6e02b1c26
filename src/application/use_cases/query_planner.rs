use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::time::timeout;

use crate::application::interfaces::{Retriever, Storage};
use crate::application::use_cases::rrf::{rrf_fuse, RetrieverRun, RrfWeights, DEFAULT_K};
use crate::application::use_cases::semantic_indexer::SemanticIndexer;
use crate::domain::error::DomainError;
use crate::domain::models::{Retriever as RetrieverKind, SearchHit, SearchMode, SearchResult};

const QUERY_CACHE_CAPACITY: usize = 10_000;
const QUERY_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

pub struct Deadlines {
    pub lexical: Duration,
    pub fuzzy: Duration,
    pub vector: Duration,
}

impl Default for Deadlines {
    fn default() -> Self {
        Self {
            lexical: Duration::from_millis(150),
            fuzzy: Duration::from_millis(150),
            vector: Duration::from_millis(250),
        }
    }
}

struct LexicalRetriever {
    storage: Arc<dyn Storage>,
}

#[async_trait]
impl Retriever for LexicalRetriever {
    fn name(&self) -> &'static str {
        "lexical"
    }

    async fn retrieve(
        &self,
        repo_id: &str,
        query: &str,
        limit: usize,
        _deadline: Duration,
    ) -> Result<Vec<SearchHit>, DomainError> {
        self.storage.fts_search(repo_id, query, limit, None).await
    }
}

struct FuzzyRetriever {
    storage: Arc<dyn Storage>,
}

#[async_trait]
impl Retriever for FuzzyRetriever {
    fn name(&self) -> &'static str {
        "fuzzy"
    }

    async fn retrieve(
        &self,
        repo_id: &str,
        query: &str,
        limit: usize,
        _deadline: Duration,
    ) -> Result<Vec<SearchHit>, DomainError> {
        let symbols = self.storage.lookup_symbol(repo_id, query, None, true, limit).await?;
        let mut hits = Vec::with_capacity(symbols.len());
        for s in symbols {
            // `lookup_symbol` only carries `file_id`; the RRF fusion key is
            // `(repo_id, relative_path, line)`, so the path must be resolved
            // here rather than left blank.
            let relative_path = match self.storage.get_file_by_id(s.file_id).await? {
                Some(file) => file.relative_path,
                None => continue,
            };
            hits.push(SearchHit {
                file_id: s.file_id,
                repo_id: repo_id.to_string(),
                relative_path,
                line: s.line_start,
                snippet: s.name,
                score: 0.0,
                retrievers: vec![],
            });
        }
        Ok(hits)
    }
}

struct VectorRetriever {
    semantic: Arc<SemanticIndexer>,
}

#[async_trait]
impl Retriever for VectorRetriever {
    fn name(&self) -> &'static str {
        "vector"
    }

    async fn retrieve(
        &self,
        repo_id: &str,
        query: &str,
        limit: usize,
        _deadline: Duration,
    ) -> Result<Vec<SearchHit>, DomainError> {
        let points = self.semantic.search(repo_id, query, limit).await?;
        Ok(points
            .into_iter()
            .map(|p| SearchHit {
                file_id: 0,
                repo_id: repo_id.to_string(),
                relative_path: p.point.payload.relative_path,
                line: p.point.payload.line,
                snippet: String::new(),
                score: p.score,
                retrievers: vec![],
            })
            .collect())
    }
}

#[derive(Clone)]
struct CacheEntry {
    result: SearchResult,
    inserted_at: Instant,
    repo_last_indexed_at: i64,
}

/// Runs the three built-in retrievers in parallel under individual
/// deadlines, fuses with RRF, and caches results keyed by repo state (spec
/// §4.I). Missing a deadline degrades a query, never fails it.
pub struct QueryPlanner {
    storage: Arc<dyn Storage>,
    semantic: Option<Arc<SemanticIndexer>>,
    weights: RrfWeights,
    k: f64,
    deadlines: Deadlines,
    cache: Mutex<HashMap<(String, String, &'static str), CacheEntry>>,
}

impl QueryPlanner {
    pub fn new(storage: Arc<dyn Storage>, semantic: Option<Arc<SemanticIndexer>>) -> Self {
        Self {
            storage,
            semantic,
            weights: RrfWeights::default(),
            k: DEFAULT_K,
            deadlines: Deadlines::default(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub async fn search(
        &self,
        repo_id: &str,
        repo_last_indexed_at: i64,
        query: &str,
        mode: SearchMode,
        limit: usize,
    ) -> Result<SearchResult, DomainError> {
        let mode_key = match mode {
            SearchMode::Lexical => "lexical",
            SearchMode::Semantic => "semantic",
            SearchMode::Hybrid => "hybrid",
        };
        let normalized_query = query.trim().to_lowercase();
        let cache_key = (repo_id.to_string(), normalized_query.clone(), mode_key);

        if let Some(entry) = self.cache.lock().unwrap().get(&cache_key) {
            if entry.repo_last_indexed_at == repo_last_indexed_at && entry.inserted_at.elapsed() < QUERY_CACHE_TTL {
                return Ok(entry.result.clone());
            }
        }

        let wide_limit = limit.saturating_mul(3).max(limit);
        let mut runs = Vec::new();
        let mut degraded = false;

        if matches!(mode, SearchMode::Lexical | SearchMode::Hybrid) {
            let lexical = LexicalRetriever { storage: self.storage.clone() };
            match self.run_with_deadline(&lexical, repo_id, &normalized_query, wide_limit, self.deadlines.lexical).await {
                Some(hits) => runs.push(RetrieverRun { retriever: RetrieverKind::Lexical, hits: normalize(hits) }),
                None => degraded = true,
            }

            let fuzzy = FuzzyRetriever { storage: self.storage.clone() };
            match self.run_with_deadline(&fuzzy, repo_id, &normalized_query, wide_limit, self.deadlines.fuzzy).await {
                Some(hits) => runs.push(RetrieverRun { retriever: RetrieverKind::Fuzzy, hits: normalize(hits) }),
                None => degraded = true,
            }
        }

        if matches!(mode, SearchMode::Semantic | SearchMode::Hybrid) {
            if let Some(semantic) = &self.semantic {
                let vector = VectorRetriever { semantic: semantic.clone() };
                match self.run_with_deadline(&vector, repo_id, &normalized_query, wide_limit, self.deadlines.vector).await {
                    Some(hits) => runs.push(RetrieverRun { retriever: RetrieverKind::Vector, hits: normalize(hits) }),
                    None => degraded = true,
                }
            } else {
                // Vector store disabled: hybrid transparently falls back to
                // lexical/fuzzy and is never an error (property 9).
                degraded = true;
            }
        }

        if runs.is_empty() {
            return Err(DomainError::internal("all retrievers failed or were unavailable"));
        }

        let hits = rrf_fuse(runs, self.weights, self.k, limit);
        let result = SearchResult { hits, degraded };

        self.cache.lock().unwrap().insert(
            cache_key,
            CacheEntry {
                result: result.clone(),
                inserted_at: Instant::now(),
                repo_last_indexed_at,
            },
        );
        self.evict_cache_if_over_capacity();

        Ok(result)
    }

    async fn run_with_deadline(
        &self,
        retriever: &dyn Retriever,
        repo_id: &str,
        query: &str,
        limit: usize,
        deadline: Duration,
    ) -> Option<Vec<SearchHit>> {
        match timeout(deadline, retriever.retrieve(repo_id, query, limit, deadline)).await {
            Ok(Ok(hits)) => Some(hits),
            Ok(Err(e)) => {
                tracing::warn!(retriever = retriever.name(), error = %e, "retriever failed");
                None
            }
            Err(_) => {
                tracing::warn!(retriever = retriever.name(), "retriever missed deadline");
                None
            }
        }
    }

    fn evict_cache_if_over_capacity(&self) {
        let mut cache = self.cache.lock().unwrap();
        if cache.len() <= QUERY_CACHE_CAPACITY {
            return;
        }
        if let Some(oldest_key) = cache
            .iter()
            .min_by_key(|(_, v)| v.inserted_at)
            .map(|(k, _)| (k.0.clone(), k.1.clone(), k.2))
        {
            cache.remove(&oldest_key);
        }
    }

    /// Invalidates every cached entry for a repo after a `last_indexed_at`
    /// bump (spec §4.I caching).
    pub fn invalidate_repo(&self, repo_id: &str) {
        self.cache.lock().unwrap().retain(|key, _| key.0 != repo_id);
    }
}

fn normalize(mut hits: Vec<SearchHit>) -> Vec<SearchHit> {
    if hits.is_empty() {
        return hits;
    }
    let max = hits.iter().map(|h| h.score).fold(f64::MIN, f64::max);
    let min = hits.iter().map(|h| h.score).fold(f64::MAX, f64::min);
    let range = max - min;
    if range.abs() > f64::EPSILON {
        for hit in hits.iter_mut() {
            hit.score = (hit.score - min) / range;
        }
    } else {
        for hit in hits.iter_mut() {
            hit.score = 1.0;
        }
    }
    hits
}
