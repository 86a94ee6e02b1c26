use std::sync::Arc;

use crate::application::interfaces::plugin::IndexShard;
use crate::application::interfaces::Plugin;
use crate::connector::treesitter::{QueryPurpose, TreeSitterWrapper};
use crate::domain::error::DomainError;
use crate::domain::models::{Import, Reference, ReferenceKind, Symbol, SymbolKind};

/// Specialized Rust extractor: distinguishes functions, structs, enums,
/// traits and impls instead of collapsing everything into `function` the
/// way the generic plugin does (spec §4.E, `specialized` variant).
pub struct RustPlugin {
    wrapper: Arc<TreeSitterWrapper>,
}

impl RustPlugin {
    pub fn new(wrapper: Arc<TreeSitterWrapper>) -> Self {
        Self { wrapper }
    }
}

impl Plugin for RustPlugin {
    fn language_id(&self) -> &'static str {
        "rust"
    }

    fn supports(&self, path: &str) -> bool {
        path.ends_with(".rs")
    }

    fn index(&self, _path: &str, content: &[u8]) -> Result<IndexShard, DomainError> {
        let tree = self.wrapper.parse(content, None)?;
        let parse_errors = if tree.root_node().has_error() { 1 } else { 0 };

        let mut symbols = Vec::new();
        for capture in self.wrapper.captures(QueryPurpose::Definitions, &tree, content) {
            let kind = match capture.name.as_str() {
                "definition.function" => SymbolKind::Function,
                "definition.struct" => SymbolKind::Struct,
                "definition.enum" => SymbolKind::Enum,
                "definition.trait" => SymbolKind::Trait,
                "definition.module" => SymbolKind::Module,
                "definition.macro" => SymbolKind::Macro,
                "definition.type_alias" => SymbolKind::TypeAlias,
                _ => continue,
            };
            symbols.push(Symbol {
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
            });
        }

        let mut imports = Vec::new();
        let mut import_references = Vec::new();
        for capture in self.wrapper.captures(QueryPurpose::Imports, &tree, content) {
            imports.push(Import {
                id: 0,
                file_id: 0,
                imported_path: capture.text.clone(),
                imported_name: None,
                alias: None,
                line: capture.start_row as u32 + 1,
                is_relative: capture.text.starts_with("self::") || capture.text.starts_with("super::"),
            });
            import_references.push(Reference {
                id: 0,
                symbol_id: None,
                resolved_name: capture.text,
                file_id: 0,
                line: capture.start_row as u32 + 1,
                col: capture.start_col as u32,
                kind: ReferenceKind::Import,
            });
        }

        let call_references: Vec<Reference> = self
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

        let mut references = import_references;
        references.extend(call_references);

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
                    "definition.struct" => SymbolKind::Struct,
                    "definition.enum" => SymbolKind::Enum,
                    "definition.trait" => SymbolKind::Trait,
                    "definition.module" => SymbolKind::Module,
                    "definition.macro" => SymbolKind::Macro,
                    "definition.type_alias" => SymbolKind::TypeAlias,
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
