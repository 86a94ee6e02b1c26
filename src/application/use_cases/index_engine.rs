use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::application::interfaces::{LanguageRegistry, Storage};
use crate::application::use_cases::semantic_indexer::SemanticIndexer;
use crate::connector::path_resolver;
use crate::domain::error::DomainError;

#[derive(Debug, Clone, serde::Serialize)]
pub struct FileFailure {
    pub path: String,
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct IndexSummary {
    pub succeeded: u64,
    pub failed: Vec<FileFailure>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ProgressEvent {
    pub processed: usize,
    pub total: usize,
    pub current_path: String,
    pub errors_so_far: usize,
}

pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// A file classified against current storage state (spec §4.F).
#[derive(Debug, Clone, PartialEq, Eq)]
enum Classification {
    New,
    Changed,
    Unchanged,
    Moved { from_relative_path: String },
}

/// Coordinates parse → extract → persist for a batch of files. Reads
/// (hashing, parsing) run on a bounded worker pool; writes are serialized
/// through `Storage`, which owns its own single-writer discipline.
pub struct IndexEngine {
    storage: Arc<dyn Storage>,
    registry: Arc<dyn LanguageRegistry>,
    semantic: Option<Arc<SemanticIndexer>>,
    max_parallel: usize,
    parse_timeout_secs: u64,
}

impl IndexEngine {
    pub fn new(
        storage: Arc<dyn Storage>,
        registry: Arc<dyn LanguageRegistry>,
        semantic: Option<Arc<SemanticIndexer>>,
    ) -> Self {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self {
            storage,
            registry,
            semantic,
            max_parallel: cores.min(8),
            parse_timeout_secs: 30,
        }
    }

    pub async fn index_directory(
        &self,
        repo_id: &str,
        root: &Path,
        relative_paths: Vec<String>,
        progress: Option<ProgressCallback>,
    ) -> Result<IndexSummary, DomainError> {
        let total = relative_paths.len();
        let semaphore = Arc::new(Semaphore::new(self.max_parallel));
        let succeeded = Arc::new(AtomicUsize::new(0));
        let failed: Arc<tokio::sync::Mutex<Vec<FileFailure>>> = Arc::new(tokio::sync::Mutex::new(Vec::new()));
        let processed = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::with_capacity(total);
        for relative_path in relative_paths {
            let permit = semaphore.clone().acquire_owned().await.map_err(|e| {
                DomainError::internal(format!("semaphore closed: {e}"))
            })?;
            let storage = self.storage.clone();
            let registry = self.registry.clone();
            let semantic = self.semantic.clone();
            let repo_id = repo_id.to_string();
            let root = root.to_path_buf();
            let succeeded = succeeded.clone();
            let failed = failed.clone();
            let processed = processed.clone();
            let progress = progress.clone();
            let timeout_secs = self.parse_timeout_secs;

            handles.push(tokio::spawn(async move {
                let _permit = permit;
                let outcome = tokio::time::timeout(
                    std::time::Duration::from_secs(timeout_secs),
                    index_one_file(&storage, &registry, semantic.as_deref(), &repo_id, &root, &relative_path),
                )
                .await;

                match outcome {
                    Ok(Ok(())) => {
                        succeeded.fetch_add(1, Ordering::Relaxed);
                    }
                    Ok(Err(e)) => {
                        warn!(path = %relative_path, error = %e, "file index failed");
                        failed.lock().await.push(FileFailure {
                            path: relative_path.clone(),
                            kind: e.kind().to_string(),
                            message: e.to_string(),
                        });
                    }
                    Err(_) => {
                        warn!(path = %relative_path, "parse timed out");
                        failed.lock().await.push(FileFailure {
                            path: relative_path.clone(),
                            kind: "parse_timeout".into(),
                            message: "parse exceeded timeout".into(),
                        });
                    }
                }

                let done = processed.fetch_add(1, Ordering::Relaxed) + 1;
                if let Some(progress) = &progress {
                    progress(ProgressEvent {
                        processed: done,
                        total,
                        current_path: relative_path,
                        errors_so_far: failed.lock().await.len(),
                    });
                }
            }));
        }

        for handle in handles {
            let _ = handle.await;
        }

        let summary = IndexSummary {
            succeeded: succeeded.load(Ordering::Relaxed) as u64,
            failed: Arc::try_unwrap(failed).map(|m| m.into_inner()).unwrap_or_default(),
        };
        info!(total, succeeded = summary.succeeded, failed = summary.failed.len(), "index_directory complete");
        Ok(summary)
    }

    pub async fn index_file(&self, repo_id: &str, root: &Path, relative_path: &str) -> Result<(), DomainError> {
        index_one_file(&self.storage, &self.registry, self.semantic.as_deref(), repo_id, root, relative_path).await
    }

    pub async fn remove_file(&self, repo_id: &str, relative_path: &str) -> Result<(), DomainError> {
        self.storage.remove_file(repo_id, relative_path).await?;
        if let Some(semantic) = &self.semantic {
            semantic.remove_file(repo_id, relative_path).await?;
        }
        Ok(())
    }
}

async fn classify(
    storage: &Arc<dyn Storage>,
    repo_id: &str,
    relative_path: &str,
    content_hash: &str,
) -> Result<Classification, DomainError> {
    if let Some(existing) = storage.get_file(repo_id, relative_path).await? {
        if existing.content_hash == content_hash {
            return Ok(Classification::Unchanged);
        }
        return Ok(Classification::Changed);
    }
    if let Some(moved_from) = storage.get_file_by_content_hash(repo_id, content_hash).await? {
        return Ok(Classification::Moved {
            from_relative_path: moved_from.relative_path,
        });
    }
    Ok(Classification::New)
}

async fn index_one_file(
    storage: &Arc<dyn Storage>,
    registry: &Arc<dyn LanguageRegistry>,
    semantic: Option<&SemanticIndexer>,
    repo_id: &str,
    root: &Path,
    relative_path: &str,
) -> Result<(), DomainError> {
    let absolute = path_resolver::resolve(root, relative_path)?;
    let bytes = tokio::fs::read(&absolute).await?;
    let content_hash = path_resolver::hash_bytes(&bytes);

    let classification = classify(storage, repo_id, relative_path, &content_hash).await?;
    if classification == Classification::Unchanged {
        return Ok(());
    }

    let metadata = tokio::fs::metadata(&absolute).await?;
    let mtime = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);

    let language = registry.detect(relative_path, bytes.get(..64));

    // `store_file` itself recognizes a matching content_hash under a
    // different path as a move and renames in place — the engine does not
    // need to special-case Classification::Moved for the write itself, only
    // to skip re-parsing below.
    let file_id = storage
        .store_file(repo_id, relative_path, &bytes, &content_hash, language.id(), bytes.len() as u64, mtime)
        .await?;

    if let Classification::Moved { .. } = classification {
        if let Some(semantic) = semantic {
            semantic
                .move_file(repo_id, &classification_from_path(&classification), relative_path, &content_hash)
                .await?;
        }
        return Ok(());
    }

    let plugin = registry.plugin_for(language).await?;
    let shard = plugin.index(relative_path, &bytes)?;

    storage
        .replace_derived(file_id, shard.symbols, shard.references, shard.imports)
        .await?;

    if let Some(semantic) = semantic {
        semantic.index_file(repo_id, relative_path, &content_hash, &bytes).await?;
    }

    Ok(())
}

fn classification_from_path(classification: &Classification) -> String {
    match classification {
        Classification::Moved { from_relative_path } => from_relative_path.clone(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_event_shape() {
        let event = ProgressEvent {
            processed: 1,
            total: 10,
            current_path: "a.py".into(),
            errors_so_far: 0,
        };
        assert_eq!(event.processed, 1);
    }
}
