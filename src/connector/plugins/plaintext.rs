use crate::application::interfaces::plugin::IndexShard;
use crate::application::interfaces::Plugin;
use crate::domain::error::DomainError;
use crate::domain::models::Reference;

/// Minimal fallback for unrecognized text: contributes content to full-text
/// search only, no symbols (spec §4.C: unknown text is routed here rather
/// than failing registration).
pub struct PlaintextPlugin;

impl Plugin for PlaintextPlugin {
    fn language_id(&self) -> &'static str {
        "plaintext"
    }

    fn supports(&self, _path: &str) -> bool {
        true
    }

    fn index(&self, _path: &str, _content: &[u8]) -> Result<IndexShard, DomainError> {
        Ok(IndexShard::default())
    }

    // `index` extracts zero symbols for unrecognized text, so there is
    // never a definition to resolve here.
    fn get_definition(&self, _name: &str, _context: Option<&str>) -> Option<crate::domain::models::Symbol> {
        None
    }

    fn find_references_in(&self, _file_content: &[u8], _name: &str) -> Vec<Reference> {
        Vec::new()
    }
}
