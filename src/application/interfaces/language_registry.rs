use std::sync::Arc;

use async_trait::async_trait;

use crate::application::interfaces::plugin::Plugin;
use crate::domain::error::DomainError;
use crate::domain::models::Language;

/// Snapshot of the memory-aware plugin cache, surfaced by `get_status`
/// (spec §6).
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct PluginCacheStats {
    pub resident_languages: Vec<String>,
    pub total_est_bytes: u64,
    pub max_memory_bytes: u64,
}

/// Port onto the language registry & plugin factory (spec §4.C). Returns a
/// cached plugin instance, constructing one on cache miss. Construction is
/// async because a miss is bounded by a load timeout (default 5s) and runs
/// on a blocking thread rather than the calling task.
#[async_trait]
pub trait LanguageRegistry: Send + Sync {
    fn detect(&self, relative_path: &str, first_bytes: Option<&[u8]>) -> Language;

    async fn plugin_for(&self, language: Language) -> Result<Arc<dyn Plugin>, DomainError>;

    fn cache_stats(&self) -> PluginCacheStats;
}
