pub mod embedder;
pub mod language_registry;
pub mod plugin;
pub mod query_expander;
pub mod retriever;
pub mod storage;
pub mod vector_store;
pub mod watcher;

pub use embedder::Embedder;
pub use language_registry::{LanguageRegistry, PluginCacheStats};
pub use plugin::Plugin;
pub use query_expander::QueryExpander;
pub use retriever::Retriever;
pub use storage::{RepoStats, Storage};
pub use vector_store::VectorStore;
pub use watcher::{WatchEvent, Watcher};
