use async_trait::async_trait;

use crate::domain::error::DomainError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Created { relative_path: String },
    Modified { relative_path: String },
    Moved { old: String, new: String },
    Deleted { relative_path: String },
}

/// Port onto the file watcher (spec §4.H). The dispatcher registers a
/// callback; the watcher owns debouncing and ignore-list filtering.
#[async_trait]
pub trait Watcher: Send + Sync {
    async fn watch(&self, repo_root: &std::path::Path) -> Result<(), DomainError>;

    async fn unwatch(&self, repo_root: &std::path::Path) -> Result<(), DomainError>;
}

pub type WatchCallback = Box<dyn Fn(WatchEvent) + Send + Sync>;
