use std::sync::Arc;

use crate::application::interfaces::plugin::IndexShard;
use crate::application::interfaces::Plugin;
use crate::connector::treesitter::{QueryPurpose, TreeSitterWrapper};
use crate::domain::error::DomainError;
use crate::domain::models::{Reference, ReferenceKind, Symbol, SymbolKind};

/// Tree-sitter-backed fallback for any language with a grammar but no
/// specialized extractor (spec §4.E, `Generic` variant). Driven entirely by
/// the queries it's constructed with, so one implementation covers every
/// such language — only the query source text differs per language.
pub struct GenericPlugin {
    language_id: &'static str,
    extensions: &'static [&'static str],
    wrapper: Arc<TreeSitterWrapper>,
}

impl GenericPlugin {
    pub fn new(language_id: &'static str, extensions: &'static [&'static str], wrapper: Arc<TreeSitterWrapper>) -> Self {
        Self {
            language_id,
            extensions,
            wrapper,
        }
    }
}

impl Plugin for GenericPlugin {
    fn language_id(&self) -> &'static str {
        self.language_id
    }

    fn supports(&self, path: &str) -> bool {
        self.extensions.iter().any(|ext| path.ends_with(ext))
    }

    fn index(&self, _path: &str, content: &[u8]) -> Result<IndexShard, DomainError> {
        let tree = self.wrapper.parse(content, None)?;
        let mut parse_errors = 0;
        if tree.root_node().has_error() {
            parse_errors += 1;
        }

        let definitions = self.wrapper.captures(QueryPurpose::Definitions, &tree, content);
        let symbols: Vec<Symbol> = definitions
            .into_iter()
            .filter(|c| c.name == "name")
            .map(|c| Symbol {
                id: 0,
                file_id: 0,
                name: c.text,
                kind: SymbolKind::Function,
                line_start: c.start_row as u32 + 1,
                line_end: c.start_row as u32 + 1,
                col_start: c.start_col as u32,
                col_end: c.start_col as u32,
                signature: None,
                doc: None,
                metadata_json: None,
            })
            .collect();

        let reference_captures = self.wrapper.captures(QueryPurpose::References, &tree, content);
        let references: Vec<Reference> = reference_captures
            .into_iter()
            .map(|c| Reference {
                id: 0,
                symbol_id: None,
                resolved_name: c.text,
                file_id: 0,
                line: c.start_row as u32 + 1,
                col: c.start_col as u32,
                kind: ReferenceKind::Call,
            })
            .collect();

        Ok(IndexShard {
            symbols,
            references,
            imports: Vec::new(),
            parse_errors,
        })
    }

    fn get_definition(&self, name: &str, context: Option<&str>) -> Option<Symbol> {
        let content = context?.as_bytes();
        let tree = self.wrapper.parse(content, None).ok()?;
        self.wrapper
            .captures(QueryPurpose::Definitions, &tree, content)
            .into_iter()
            .filter(|c| c.name == "name")
            .find(|c| c.text == name)
            .map(|c| Symbol {
                id: 0,
                file_id: 0,
                name: c.text,
                kind: SymbolKind::Function,
                line_start: c.start_row as u32 + 1,
                line_end: c.start_row as u32 + 1,
                col_start: c.start_col as u32,
                col_end: c.start_col as u32,
                signature: None,
                doc: None,
                metadata_json: None,
            })
    }

    fn find_references_in(&self, file_content: &[u8], name: &str) -> Vec<Reference> {
        let Ok(tree) = self.wrapper.parse(file_content, None) else {
            return Vec::new();
        };
        self.wrapper
            .captures(QueryPurpose::References, &tree, file_content)
            .into_iter()
            .filter(|c| c.text == name)
            .map(|c| Reference {
                id: 0,
                symbol_id: None,
                resolved_name: c.text,
                file_id: 0,
                line: c.start_row as u32 + 1,
                col: c.start_col as u32,
                kind: ReferenceKind::Call,
            })
            .collect()
    }
}
