use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::application::interfaces::plugin::Plugin;
use crate::application::interfaces::language_registry::{
    LanguageRegistry as LanguageRegistryPort, PluginCacheStats,
};
use crate::connector::plugins::{DocumentPlugin, GenericPlugin, PlaintextPlugin, PythonPlugin, RustPlugin};
use crate::connector::treesitter::{QueryPurpose, TreeSitterWrapper};
use crate::domain::error::DomainError;
use crate::domain::models::{Language, PluginCacheEntry};

const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(5);
/// Rough per-plugin memory estimate (parser + compiled queries) used by the
/// eviction scorer; specialized plugins carry more query state than the
/// generic fallback.
const EST_BYTES_SPECIALIZED: u64 = 8 * 1024 * 1024;
const EST_BYTES_GENERIC: u64 = 4 * 1024 * 1024;

const WEIGHT_PRIORITY: f64 = 0.5;
const WEIGHT_RECENCY: f64 = 0.3;
const WEIGHT_HIT_RATE: f64 = 0.2;

struct CachedPlugin {
    plugin: Arc<dyn Plugin>,
    entry: PluginCacheEntry,
}

/// Language registry & memory-aware plugin cache (spec §4.C). `plugin_for`
/// returns a cached instance, constructing (and possibly evicting another
/// entry) on miss.
pub struct DuckDbLanguageRegistry {
    max_memory_bytes: u64,
    load_timeout: Duration,
    cache: Mutex<HashMap<Language, CachedPlugin>>,
}

impl DuckDbLanguageRegistry {
    pub fn new(max_memory_bytes: u64) -> Self {
        Self {
            max_memory_bytes,
            load_timeout: DEFAULT_LOAD_TIMEOUT,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Builds a plugin instance for `language`. Takes no `self` state so it
    /// can run on a blocking thread under `plugin_for`'s load timeout
    /// without smuggling a non-`'static` borrow across the `spawn_blocking`
    /// boundary.
    fn construct_plugin(language: Language) -> Result<(Arc<dyn Plugin>, u64), DomainError> {
        match language {
            Language::Rust => {
                let ts_language: tree_sitter::Language = tree_sitter_rust::LANGUAGE.into();
                let mut queries = HashMap::new();
                queries.insert(
                    QueryPurpose::Definitions,
                    "[(function_item name: (identifier) @definition.function) \
                      (struct_item name: (type_identifier) @definition.struct) \
                      (enum_item name: (type_identifier) @definition.enum) \
                      (trait_item name: (type_identifier) @definition.trait) \
                      (mod_item name: (identifier) @definition.module) \
                      (macro_definition name: (identifier) @definition.macro) \
                      (type_item name: (type_identifier) @definition.type_alias)]",
                );
                queries.insert(QueryPurpose::Imports, "(use_declaration argument: (_) @import)");
                queries.insert(QueryPurpose::References, "(call_expression function: (identifier) @reference)");
                let wrapper = Arc::new(TreeSitterWrapper::new(ts_language, queries)?);
                Ok((Arc::new(RustPlugin::new(wrapper)), EST_BYTES_SPECIALIZED))
            }
            Language::Python => {
                let ts_language: tree_sitter::Language = tree_sitter_python::LANGUAGE.into();
                let mut queries = HashMap::new();
                queries.insert(
                    QueryPurpose::Definitions,
                    "[(function_definition name: (identifier) @definition.function) \
                      (class_definition name: (identifier) @definition.class)]",
                );
                queries.insert(QueryPurpose::Imports, "(import_from_statement module_name: (_) @import)");
                queries.insert(QueryPurpose::References, "(call function: (identifier) @reference)");
                let wrapper = Arc::new(TreeSitterWrapper::new(ts_language, queries)?);
                Ok((Arc::new(PythonPlugin::new(wrapper)), EST_BYTES_SPECIALIZED))
            }
            Language::Markdown => Ok((Arc::new(DocumentPlugin), EST_BYTES_GENERIC)),
            lang if lang.has_grammar() => {
                let (ts_language, extensions): (tree_sitter::Language, &'static [&'static str]) = match lang {
                    Language::Go => (tree_sitter_go::LANGUAGE.into(), &["go"]),
                    Language::Java => (tree_sitter_java::LANGUAGE.into(), &["java"]),
                    Language::JavaScript => (tree_sitter_javascript::LANGUAGE.into(), &["js", "jsx", "mjs", "cjs"]),
                    Language::TypeScript => (tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(), &["ts", "mts", "cts"]),
                    Language::Tsx => (tree_sitter_typescript::LANGUAGE_TSX.into(), &["tsx"]),
                    Language::C => (tree_sitter_c::LANGUAGE.into(), &["c", "h"]),
                    Language::Cpp => (tree_sitter_cpp::LANGUAGE.into(), &["cc", "cpp", "cxx", "hpp", "hh"]),
                    Language::Hcl => (tree_sitter_hcl::LANGUAGE.into(), &["tf", "tfvars", "hcl"]),
                    Language::Php => (tree_sitter_php::LANGUAGE_PHP.into(), &["php"]),
                    Language::Ruby => (tree_sitter_ruby::LANGUAGE.into(), &["rb"]),
                    Language::Bash => (tree_sitter_bash::LANGUAGE.into(), &["sh", "bash", "zsh"]),
                    _ => return Ok((Arc::new(PlaintextPlugin), EST_BYTES_GENERIC)),
                };
                let queries = HashMap::from([(QueryPurpose::Definitions, "(identifier) @name")]);
                let wrapper = Arc::new(TreeSitterWrapper::new(ts_language, queries)?);
                Ok((Arc::new(GenericPlugin::new(lang.id(), extensions, wrapper)), EST_BYTES_GENERIC))
            }
            _ => Ok((Arc::new(PlaintextPlugin), EST_BYTES_GENERIC)),
        }
    }

    fn evict_one(&self, cache: &mut HashMap<Language, CachedPlugin>, needed_bytes: u64) {
        let now = now_secs();
        let resident: u64 = cache.values().map(|c| c.entry.est_bytes).sum();
        if resident + needed_bytes <= self.max_memory_bytes {
            return;
        }

        let Some(victim) = cache
            .iter()
            .min_by(|(_, a), (_, b)| eviction_score(&a.entry, now).partial_cmp(&eviction_score(&b.entry, now)).unwrap())
            .map(|(lang, _)| *lang)
        else {
            return;
        };
        warn!(language = %victim, "evicting plugin to stay under memory ceiling");
        cache.remove(&victim);
    }
}

#[async_trait]
impl LanguageRegistryPort for DuckDbLanguageRegistry {
    fn detect(&self, relative_path: &str, first_bytes: Option<&[u8]>) -> Language {
        let filename = relative_path.rsplit('/').next().unwrap_or(relative_path);
        if let Some(lang) = Language::from_filename(filename) {
            return lang;
        }
        if let Some(ext) = filename.rsplit('.').next().filter(|e| *e != filename) {
            if let Some(lang) = Language::from_extension(ext) {
                return lang;
            }
        }
        if let Some(bytes) = first_bytes {
            let first_line = String::from_utf8_lossy(bytes);
            let first_line = first_line.lines().next().unwrap_or_default();
            if let Some(lang) = Language::from_shebang(first_line) {
                return lang;
            }
        }
        Language::Unknown
    }

    async fn plugin_for(&self, language: Language) -> Result<Arc<dyn Plugin>, DomainError> {
        {
            let mut cache = self.cache.lock().map_err(|_| DomainError::internal("plugin cache lock poisoned"))?;
            if let Some(cached) = cache.get_mut(&language) {
                cached.entry.touch(now_secs());
                return Ok(cached.plugin.clone());
            }
        }

        // Construction (grammar registration, query compilation) runs on a
        // blocking thread so a hang doesn't stall the async runtime, and is
        // bounded by `load_timeout` (spec §4.C, property 7).
        let load_timeout = self.load_timeout;
        let (plugin, est_bytes) = match tokio::time::timeout(
            load_timeout,
            tokio::task::spawn_blocking(move || Self::construct_plugin(language)),
        )
        .await
        {
            Ok(join_result) => join_result
                .map_err(|e| DomainError::internal(format!("plugin construction task panicked: {e}")))??,
            Err(_) => {
                return Err(DomainError::PluginLoadFailed(format!(
                    "{language} construction exceeded {load_timeout:?} load timeout"
                )));
            }
        };

        let mut cache = self.cache.lock().map_err(|_| DomainError::internal("plugin cache lock poisoned"))?;
        self.evict_one(&mut cache, est_bytes);
        info!(language = %language, est_bytes, "constructed plugin");
        cache.insert(
            language,
            CachedPlugin {
                plugin: plugin.clone(),
                entry: PluginCacheEntry::new(language, est_bytes, default_priority(language), now_secs()),
            },
        );
        Ok(plugin)
    }

    fn cache_stats(&self) -> PluginCacheStats {
        let cache = self.cache.lock().unwrap();
        PluginCacheStats {
            resident_languages: cache.keys().map(|l| l.id().to_string()).collect(),
            total_est_bytes: cache.values().map(|c| c.entry.est_bytes).sum(),
            max_memory_bytes: self.max_memory_bytes,
        }
    }
}

fn default_priority(language: Language) -> f64 {
    match language {
        Language::Rust | Language::Python | Language::JavaScript | Language::TypeScript => 1.0,
        _ => 0.5,
    }
}

fn eviction_score(entry: &PluginCacheEntry, now: i64) -> f64 {
    let recency = 1.0 / (1.0 + (now - entry.last_used_at).max(0) as f64);
    let hit_rate = entry.hit_count as f64 / (entry.hit_count as f64 + 1.0);
    WEIGHT_PRIORITY * entry.priority + WEIGHT_RECENCY * recency + WEIGHT_HIT_RATE * hit_rate
}

fn now_secs() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_dockerfile_by_filename() {
        let registry = DuckDbLanguageRegistry::new(64 * 1024 * 1024);
        assert_eq!(registry.detect("Dockerfile", None), Language::Dockerfile);
    }

    #[test]
    fn detects_rust_by_extension() {
        let registry = DuckDbLanguageRegistry::new(64 * 1024 * 1024);
        assert_eq!(registry.detect("src/main.rs", None), Language::Rust);
    }
}
