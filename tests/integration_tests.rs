//! Black-box scenarios against a temp on-disk repo and an in-memory store,
//! exercising the seed properties of the indexing/search core end to end.

use std::sync::Arc;

use codeindex::application::interfaces::{LanguageRegistry, Storage};
use codeindex::application::use_cases::{Dispatcher, IndexEngine, QueryPlanner};
use codeindex::connector::language_registry::DuckDbLanguageRegistry;
use codeindex::connector::storage::DuckDbStore;
use codeindex::domain::models::{SearchMode, SymbolKind};

const MAX_MEMORY_BYTES: u64 = 256 * 1024 * 1024;

fn build_dispatcher() -> Dispatcher {
    let storage: Arc<dyn Storage> = Arc::new(DuckDbStore::open_in_memory().unwrap());
    let registry = Arc::new(DuckDbLanguageRegistry::new(MAX_MEMORY_BYTES));
    let index_engine = Arc::new(IndexEngine::new(storage.clone(), registry.clone(), None));
    let query_planner = Arc::new(QueryPlanner::new(storage.clone(), None));
    Dispatcher::new(storage, index_engine, query_planner, None, registry)
}

async fn write_file(dir: &std::path::Path, relative_path: &str, content: &str) {
    let path = dir.join(relative_path);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.unwrap();
    }
    tokio::fs::write(path, content).await.unwrap();
}

/// S1: indexing a single file makes its symbols visible to both
/// `lookup_symbol` and `get_outline`.
#[tokio::test]
async fn s1_single_file_index_and_lookup() {
    let dispatcher = build_dispatcher();
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "a.py", "def greet():\n    pass\n").await;

    let summary = dispatcher
        .index_directory("repo1", dir.path(), vec!["a.py".to_string()], None)
        .await
        .unwrap();
    assert_eq!(summary.succeeded, 1);
    assert!(summary.failed.is_empty());

    let symbols = dispatcher.lookup_symbol("repo1", "greet", None, false, 10).await.unwrap();
    assert_eq!(symbols.len(), 1);
    assert_eq!(symbols[0].kind, SymbolKind::Function);

    let outline = dispatcher.get_outline("repo1", "a.py").await.unwrap();
    assert_eq!(outline.symbols.len(), 1);
    assert_eq!(outline.symbols[0].name, "greet");
}

/// S2: renaming a file without changing its content is a move, not a
/// delete-then-create — the old path disappears and the new one appears in
/// the same index run, with the symbol carried over.
#[tokio::test]
async fn s2_rename_without_content_change_is_a_move() {
    let dispatcher = build_dispatcher();
    let dir = tempfile::tempdir().unwrap();
    let content = "def greet():\n    pass\n";
    write_file(dir.path(), "a.py", content).await;
    dispatcher
        .index_directory("repo1", dir.path(), vec!["a.py".to_string()], None)
        .await
        .unwrap();

    tokio::fs::rename(dir.path().join("a.py"), dir.path().join("b.py")).await.unwrap();
    dispatcher
        .index_directory("repo1", dir.path(), vec!["b.py".to_string()], None)
        .await
        .unwrap();

    let outline = dispatcher.get_outline("repo1", "a.py").await;
    assert!(outline.is_err(), "old path should no longer resolve");

    let outline = dispatcher.get_outline("repo1", "b.py").await.unwrap();
    assert_eq!(outline.symbols.len(), 1);
    assert_eq!(outline.symbols[0].name, "greet");
}

/// S3: editing a file's content and re-indexing replaces its derived
/// symbols rather than accumulating stale ones.
#[tokio::test]
async fn s3_edit_and_reindex_replaces_symbols() {
    let dispatcher = build_dispatcher();
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "a.py", "def old_name():\n    pass\n").await;
    dispatcher
        .index_directory("repo1", dir.path(), vec!["a.py".to_string()], None)
        .await
        .unwrap();

    write_file(dir.path(), "a.py", "def new_name():\n    pass\n").await;
    dispatcher
        .index_directory("repo1", dir.path(), vec!["a.py".to_string()], None)
        .await
        .unwrap();

    let outline = dispatcher.get_outline("repo1", "a.py").await.unwrap();
    assert_eq!(outline.symbols.len(), 1);
    assert_eq!(outline.symbols[0].name, "new_name");

    let stale = dispatcher.lookup_symbol("repo1", "old_name", None, false, 10).await.unwrap();
    assert!(stale.is_empty());
}

/// S4: removing a file excludes it (and its derived rows) from every
/// subsequent read path, without hard-deleting the audit trail.
#[tokio::test]
async fn s4_delete_excludes_from_reads() {
    let dispatcher = build_dispatcher();
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "a.py", "def greet():\n    pass\n").await;
    dispatcher
        .index_directory("repo1", dir.path(), vec!["a.py".to_string()], None)
        .await
        .unwrap();

    dispatcher.remove_file("repo1", "a.py").await.unwrap();

    assert!(dispatcher.get_outline("repo1", "a.py").await.is_err());
    let symbols = dispatcher.lookup_symbol("repo1", "greet", None, false, 10).await.unwrap();
    assert!(symbols.is_empty());

    let status = dispatcher.get_status("repo1").await.unwrap();
    assert_eq!(status.files, 0);
}

/// S5: hybrid search with the vector store unavailable degrades to
/// lexical/fuzzy instead of failing.
#[tokio::test]
async fn s5_hybrid_search_degrades_without_vector_store() {
    let dispatcher = build_dispatcher();
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "billing.py", "def calculate_total():\n    pass\n").await;
    dispatcher
        .index_directory("repo1", dir.path(), vec!["billing.py".to_string()], None)
        .await
        .unwrap();

    let result = dispatcher
        .search("repo1", "calculate", SearchMode::Hybrid, 10)
        .await
        .unwrap();

    assert!(result.degraded, "hybrid search without a vector store must report degraded=true");
    assert!(!result.hits.is_empty(), "lexical/fuzzy retrievers should still produce hits");
}

/// S6: the plugin cache evicts under a tight memory ceiling rather than
/// growing unbounded, and never reports more residents than its ceiling
/// allows for two 8 MiB specialized plugins.
#[tokio::test]
async fn s6_plugin_cache_evicts_under_memory_ceiling() {
    use codeindex::domain::models::Language;

    let registry = DuckDbLanguageRegistry::new(9 * 1024 * 1024);
    registry.plugin_for(Language::Rust).await.unwrap();
    registry.plugin_for(Language::Python).await.unwrap();

    let stats = registry.cache_stats();
    assert_eq!(stats.resident_languages.len(), 1, "second load should evict the first under a 9 MiB ceiling");
    assert!(stats.total_est_bytes <= stats.max_memory_bytes);
}
