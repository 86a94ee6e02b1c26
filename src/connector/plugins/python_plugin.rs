use std::sync::Arc;

use crate::application::interfaces::plugin::IndexShard;
use crate::application::interfaces::Plugin;
use crate::connector::treesitter::{QueryPurpose, TreeSitterWrapper};
use crate::domain::error::DomainError;
use crate::domain::models::{Import, Reference, ReferenceKind, Symbol, SymbolKind};

/// Specialized Python extractor (spec §4.E, `specialized` variant;
/// scenario S1/S3 exercise this plugin directly).
pub struct PythonPlugin {
    wrapper: Arc<TreeSitterWrapper>,
}

impl PythonPlugin {
    pub fn new(wrapper: Arc<TreeSitterWrapper>) -> Self {
        Self { wrapper }
    }
}

impl Plugin for PythonPlugin {
    fn language_id(&self) -> &'static str {
        "python"
    }

    fn supports(&self, path: &str) -> bool {
        path.ends_with(".py") || path.ends_with(".pyi")
    }

    fn index(&self, _path: &str, content: &[u8]) -> Result<IndexShard, DomainError> {
        let tree = self.wrapper.parse(content, None)?;
        let parse_errors = if tree.root_node().has_error() { 1 } else { 0 };

        let symbols: Vec<Symbol> = self
            .wrapper
            .captures(QueryPurpose::Definitions, &tree, content)
            .into_iter()
            .filter_map(|capture| {
                let kind = match capture.name.as_str() {
                    "definition.function" => SymbolKind::Function,
                    "definition.method" => SymbolKind::Method,
                    "definition.class" => SymbolKind::Class,
                    _ => return None,
                };
                Some(Symbol {
                    id: 0,
                    file_id: 0,
                    name: capture.text,
                    kind,
                    line_start: capture.start_row as u32 + 1,
                    line_end: capture.start_row as u32 + 1,
                    col_start: capture.start_col as u32,
                    col_end: capture.start_col as u32,
                    signature: None,
                    doc: None,
                    metadata_json: None,
                })
            })
            .collect();

        let imports: Vec<Import> = self
            .wrapper
            .captures(QueryPurpose::Imports, &tree, content)
            .into_iter()
            .map(|c| Import {
                id: 0,
                file_id: 0,
                imported_path: c.text.clone(),
                imported_name: None,
                alias: None,
                line: c.start_row as u32 + 1,
                is_relative: c.text.starts_with('.'),
            })
            .collect();

        let references: Vec<Reference> = self
            .wrapper
            .captures(QueryPurpose::References, &tree, content)
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
            imports,
            parse_errors,
        })
    }

    fn get_definition(&self, name: &str, context: Option<&str>) -> Option<Symbol> {
        let content = context?.as_bytes();
        let tree = self.wrapper.parse(content, None).ok()?;
        self.wrapper
            .captures(QueryPurpose::Definitions, &tree, content)
            .into_iter()
            .find(|c| c.text == name)
            .and_then(|capture| {
                let kind = match capture.name.as_str() {
                    "definition.function" => SymbolKind::Function,
                    "definition.method" => SymbolKind::Method,
                    "definition.class" => SymbolKind::Class,
                    _ => return None,
                };
                Some(Symbol {
                    id: 0,
                    file_id: 0,
                    name: capture.text,
                    kind,
                    line_start: capture.start_row as u32 + 1,
                    line_end: capture.start_row as u32 + 1,
                    col_start: capture.start_col as u32,
                    col_end: capture.start_col as u32,
                    signature: None,
                    doc: None,
                    metadata_json: None,
                })
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

#[cfg(test)]
mod tests {
    use super::*;

    fn wrapper() -> Arc<TreeSitterWrapper> {
        let language = tree_sitter_python::LANGUAGE.into();
        let mut queries = std::collections::HashMap::new();
        queries.insert(
            QueryPurpose::Definitions,
            "(function_definition name: (identifier) @definition.function)",
        );
        Arc::new(TreeSitterWrapper::new(language, queries).unwrap())
    }

    #[test]
    fn extracts_top_level_function() {
        let plugin = PythonPlugin::new(wrapper());
        let shard = plugin
            .index("src/a.py", b"def calculate_sum(a, b):\n    return a + b\n")
            .unwrap();
        assert_eq!(shard.symbols.len(), 1);
        assert_eq!(shard.symbols[0].name, "calculate_sum");
        assert_eq!(shard.symbols[0].kind, SymbolKind::Function);
        assert_eq!(shard.symbols[0].line_start, 1);
    }
}
