use crate::application::interfaces::plugin::IndexShard;
use crate::application::interfaces::Plugin;
use crate::domain::error::DomainError;
use crate::domain::models::{Reference, Symbol, SymbolKind};

/// Markdown/structured-text plugin. Produces `section` symbols with heading
/// hierarchy instead of code symbols (spec §4.E, `Document` variant); feeds
/// the semantic indexer's adaptive chunker with section boundaries.
pub struct DocumentPlugin;

impl Plugin for DocumentPlugin {
    fn language_id(&self) -> &'static str {
        "markdown"
    }

    fn supports(&self, path: &str) -> bool {
        path.ends_with(".md") || path.ends_with(".markdown")
    }

    fn index(&self, _path: &str, content: &[u8]) -> Result<IndexShard, DomainError> {
        let text = String::from_utf8_lossy(content);
        let mut symbols = Vec::new();

        for (line_idx, line) in text.lines().enumerate() {
            let trimmed = line.trim_start();
            let level = trimmed.chars().take_while(|c| *c == '#').count();
            if level == 0 || level > 6 {
                continue;
            }
            let title = trimmed[level..].trim();
            if title.is_empty() {
                continue;
            }
            symbols.push(Symbol {
                id: 0,
                file_id: 0,
                name: title.to_string(),
                kind: SymbolKind::Section,
                line_start: line_idx as u32 + 1,
                line_end: line_idx as u32 + 1,
                col_start: 0,
                col_end: line.len() as u32,
                signature: Some(format!("h{level}")),
                doc: None,
                metadata_json: None,
            });
        }

        Ok(IndexShard {
            symbols,
            references: Vec::new(),
            imports: Vec::new(),
            parse_errors: 0,
        })
    }

    fn get_definition(&self, name: &str, context: Option<&str>) -> Option<Symbol> {
        let text = context?;
        for (line_idx, line) in text.lines().enumerate() {
            let trimmed = line.trim_start();
            let level = trimmed.chars().take_while(|c| *c == '#').count();
            if level == 0 || level > 6 {
                continue;
            }
            let title = trimmed[level..].trim();
            if title == name {
                return Some(Symbol {
                    id: 0,
                    file_id: 0,
                    name: title.to_string(),
                    kind: SymbolKind::Section,
                    line_start: line_idx as u32 + 1,
                    line_end: line_idx as u32 + 1,
                    col_start: 0,
                    col_end: line.len() as u32,
                    signature: Some(format!("h{level}")),
                    doc: None,
                    metadata_json: None,
                });
            }
        }
        None
    }

    fn find_references_in(&self, _file_content: &[u8], _name: &str) -> Vec<Reference> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_heading_sections() {
        let plugin = DocumentPlugin;
        let shard = plugin.index("README.md", b"# Title\n\nsome text\n\n## Subsection\n").unwrap();
        assert_eq!(shard.symbols.len(), 2);
        assert_eq!(shard.symbols[0].name, "Title");
        assert_eq!(shard.symbols[1].name, "Subsection");
    }
}
