use crate::domain::error::DomainError;
use crate::domain::models::{Import, Reference, Symbol};

/// Output of a plugin for one file (spec glossary: IndexShard).
#[derive(Debug, Clone, Default)]
pub struct IndexShard {
    pub symbols: Vec<Symbol>,
    pub references: Vec<Reference>,
    pub imports: Vec<Import>,
    pub parse_errors: u32,
}

/// A language analyzer. Stateless per call — all per-repo state lives in
/// Storage — so a single instance must be safe to invoke concurrently for
/// different files (spec §4.E).
pub trait Plugin: Send + Sync {
    fn language_id(&self) -> &'static str;

    fn supports(&self, path: &str) -> bool;

    fn index(&self, path: &str, content: &[u8]) -> Result<IndexShard, DomainError>;

    fn get_definition(&self, name: &str, context: Option<&str>) -> Option<Symbol>;

    fn find_references_in(&self, file_content: &[u8], name: &str) -> Vec<Reference>;
}
