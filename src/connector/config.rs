use std::collections::HashSet;
use std::path::PathBuf;

use crate::application::use_cases::multi_repo_manager::PluginStrategy;

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_home() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
        .unwrap_or(default)
}

/// Process configuration, read from the environment once at startup
/// (spec §6). Every field has the spec-mandated default.
#[derive(Debug, Clone)]
pub struct Config {
    pub index_root: PathBuf,
    pub plugin_strategy: PluginStrategy,
    pub max_memory_mb: usize,
    pub min_free_mb: usize,
    pub plugin_load_timeout_seconds: u64,
    pub enable_multi_repo: bool,
    pub reference_repos: HashSet<String>,
    pub semantic_enabled: bool,
    pub embedding_model: String,
    pub embedding_dim: usize,
}

impl Config {
    pub fn from_env() -> Self {
        let reference_repos = std::env::var("MCP_REFERENCE_REPOS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        Self {
            index_root: expand_tilde(&env_or("MCP_INDEX_ROOT", "~/.mcp/indexes")),
            plugin_strategy: PluginStrategy::from_env_str(&env_or("MCP_PLUGIN_STRATEGY", "auto")),
            max_memory_mb: env_usize("MCP_MAX_MEMORY_MB", 1024),
            min_free_mb: env_usize("MCP_MIN_FREE_MB", 256),
            plugin_load_timeout_seconds: env_usize("MCP_PLUGIN_LOAD_TIMEOUT_SECONDS", 5) as u64,
            enable_multi_repo: env_bool("MCP_ENABLE_MULTI_REPO", false),
            reference_repos,
            semantic_enabled: env_bool("MCP_SEMANTIC_ENABLED", false),
            embedding_model: env_or("MCP_EMBEDDING_MODEL", "text-embedding-3-small"),
            embedding_dim: env_usize("MCP_EMBEDDING_DIM", 384),
        }
    }

    /// All repositories share one `DuckDbStore`, distinguished by the
    /// `repo_id` column on every table (spec §3) — this is what lets
    /// `MultiRepoManager` fan a single query across repositories through one
    /// connection instead of juggling a store per repo.
    pub fn store_dir(&self) -> PathBuf {
        self.index_root.clone()
    }

    pub fn max_memory_bytes(&self) -> u64 {
        self.max_memory_mb as u64 * 1024 * 1024
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tilde_expands_against_home() {
        std::env::set_var("HOME", "/home/tester");
        assert_eq!(expand_tilde("~/.mcp/indexes"), PathBuf::from("/home/tester/.mcp/indexes"));
    }
}
