use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcherTrait};
use tokio::sync::mpsc;
use tracing::warn;

use crate::application::interfaces::watcher::{WatchCallback, WatchEvent};
use crate::application::interfaces::Watcher;
use crate::domain::error::DomainError;

const DEBOUNCE_WINDOW: Duration = Duration::from_millis(200);
const MOVE_GRACE_WINDOW: Duration = Duration::from_millis(500);

fn default_ignore_patterns() -> Vec<&'static str> {
    vec![".git/", "node_modules/", "target/", "build/"]
}

#[derive(Clone)]
struct PendingDelete {
    relative_path: String,
    seen_at: Instant,
}

/// File watcher backed by `notify` (spec §4.H). Debounces per-path events
/// within a 200 ms window (repeated modifications coalesce into one) and
/// reclassifies a delete followed within 500 ms by a create at a different
/// path as a move.
pub struct NotifyWatcher {
    ignore_patterns: Vec<String>,
    callback: Arc<Mutex<Option<WatchCallback>>>,
    pending_deletes: Arc<Mutex<HashMap<String, PendingDelete>>>,
    last_emitted: Arc<Mutex<HashMap<String, Instant>>>,
    watchers: Mutex<HashMap<PathBuf, RecommendedWatcher>>,
}

impl NotifyWatcher {
    pub fn new() -> Self {
        Self {
            ignore_patterns: default_ignore_patterns().into_iter().map(str::to_string).collect(),
            callback: Arc::new(Mutex::new(None)),
            pending_deletes: Arc::new(Mutex::new(HashMap::new())),
            last_emitted: Arc::new(Mutex::new(HashMap::new())),
            watchers: Mutex::new(HashMap::new()),
        }
    }

    pub fn set_callback(&self, callback: WatchCallback) {
        *self.callback.lock().unwrap() = Some(callback);
    }
}

impl Default for NotifyWatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Watcher for NotifyWatcher {
    async fn watch(&self, repo_root: &Path) -> Result<(), DomainError> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Event>();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            if let Ok(event) = res {
                let _ = tx.send(event);
            }
        })
        .map_err(|e| DomainError::internal(format!("failed to create watcher: {e}")))?;

        watcher
            .watch(repo_root, RecursiveMode::Recursive)
            .map_err(|e| DomainError::internal(format!("failed to watch {}: {e}", repo_root.display())))?;

        self.watchers.lock().unwrap().insert(repo_root.to_path_buf(), watcher);

        let ignore_patterns = self.ignore_patterns.clone();
        let callback = self.callback.clone();
        let pending_deletes = self.pending_deletes.clone();
        let last_emitted = self.last_emitted.clone();
        let repo_root = repo_root.to_path_buf();

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                handle_event(event, &repo_root, &ignore_patterns, &callback, &pending_deletes, &last_emitted).await;
            }
        });

        Ok(())
    }

    async fn unwatch(&self, repo_root: &Path) -> Result<(), DomainError> {
        self.watchers.lock().unwrap().remove(repo_root);
        Ok(())
    }
}

async fn handle_event(
    event: Event,
    repo_root: &Path,
    ignore_patterns: &[String],
    callback: &Arc<Mutex<Option<WatchCallback>>>,
    pending_deletes: &Arc<Mutex<HashMap<String, PendingDelete>>>,
    last_emitted: &Arc<Mutex<HashMap<String, Instant>>>,
) {
    // The OS itself reports a rename atomically on platforms that support
    // it; trust that over the delete+create grace-window heuristic below
    // rather than racing it.
    if let EventKind::Modify(ModifyKind::Name(RenameMode::Both)) = event.kind {
        if event.paths.len() == 2 {
            let (Some(old_relative), Some(new_relative)) = (
                relative_path_of(&event.paths[0], repo_root, ignore_patterns),
                relative_path_of(&event.paths[1], repo_root, ignore_patterns),
            ) else {
                return;
            };
            emit(callback, WatchEvent::Moved { old: old_relative, new: new_relative });
            return;
        }
    }

    for path in &event.paths {
        let Some(relative_path) = relative_path_of(path, repo_root, ignore_patterns) else {
            continue;
        };

        let emitted = match event.kind {
            EventKind::Create(_) => {
                let mut pending = pending_deletes.lock().unwrap();
                if let Some(deleted) = pending.remove(&relative_path) {
                    if deleted.seen_at.elapsed() < MOVE_GRACE_WINDOW {
                        Some(WatchEvent::Moved { old: deleted.relative_path, new: relative_path.clone() })
                    } else {
                        Some(WatchEvent::Created { relative_path: relative_path.clone() })
                    }
                } else {
                    Some(WatchEvent::Created { relative_path: relative_path.clone() })
                }
            }
            EventKind::Modify(_) => {
                let mut last = last_emitted.lock().unwrap();
                let now = Instant::now();
                let within_debounce = last
                    .get(&relative_path)
                    .is_some_and(|prev| now.duration_since(*prev) < DEBOUNCE_WINDOW);
                if within_debounce {
                    None
                } else {
                    last.insert(relative_path.clone(), now);
                    Some(WatchEvent::Modified { relative_path: relative_path.clone() })
                }
            }
            EventKind::Remove(_) => {
                // Don't emit Deleted yet — a paired Create within the grace
                // window reclassifies this as a Moved. Check back after the
                // window instead of firing immediately.
                let pending = PendingDelete { relative_path: relative_path.clone(), seen_at: Instant::now() };
                pending_deletes.lock().unwrap().insert(relative_path.clone(), pending.clone());
                schedule_delete_confirmation(relative_path.clone(), pending.seen_at, pending_deletes.clone(), callback.clone());
                None
            }
            _ => None,
        };

        if let Some(watch_event) = emitted {
            emit(callback, watch_event);
        }
    }
}

fn relative_path_of(path: &std::path::Path, repo_root: &Path, ignore_patterns: &[String]) -> Option<String> {
    if ignore_patterns.iter().any(|p| path.to_string_lossy().contains(p.as_str())) {
        return None;
    }
    let relative = path.strip_prefix(repo_root).ok()?;
    Some(relative.to_string_lossy().replace('\\', "/"))
}

fn emit(callback: &Arc<Mutex<Option<WatchCallback>>>, watch_event: WatchEvent) {
    match callback.lock().unwrap().as_ref() {
        Some(cb) => cb(watch_event),
        None => warn!("watch event dropped, no callback registered"),
    }
}

/// Waits out the move grace window, then emits `Deleted` only if no paired
/// Create claimed this path in the meantime (it would have removed the
/// entry from `pending_deletes`, matched here by `seen_at` so a delete of
/// the same path that happened after this one isn't mistaken for it).
fn schedule_delete_confirmation(
    relative_path: String,
    seen_at: Instant,
    pending_deletes: Arc<Mutex<HashMap<String, PendingDelete>>>,
    callback: Arc<Mutex<Option<WatchCallback>>>,
) {
    tokio::spawn(async move {
        tokio::time::sleep(MOVE_GRACE_WINDOW).await;
        let still_pending = {
            let mut pending = pending_deletes.lock().unwrap();
            match pending.get(&relative_path) {
                Some(entry) if entry.seen_at == seen_at => {
                    pending.remove(&relative_path);
                    true
                }
                _ => false,
            }
        };
        if still_pending {
            emit(&callback, WatchEvent::Deleted { relative_path });
        }
    });
}
