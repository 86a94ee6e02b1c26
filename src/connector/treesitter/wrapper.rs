use std::collections::HashMap;
use std::sync::Mutex;

use streaming_iterator::StreamingIterator;
use tracing::warn;
use tree_sitter::{Language as TsLanguage, Parser, Query, QueryCursor, Tree};

use crate::domain::error::DomainError;

/// Maximum node depth walked when extracting captures; deeper nodes are
/// skipped with a log event rather than failing the whole parse (spec
/// §4.D).
const MAX_QUERY_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryPurpose {
    Definitions,
    References,
    Imports,
}

#[derive(Debug, Clone)]
pub struct Capture {
    pub name: String,
    pub start_byte: usize,
    pub end_byte: usize,
    pub start_row: usize,
    pub start_col: usize,
    pub text: String,
}

/// Owns a parser handle for one language plus a cache of compiled queries
/// keyed by purpose (spec §4.D). Re-index passes a previous tree for
/// incremental parsing when available.
pub struct TreeSitterWrapper {
    parser: Mutex<Parser>,
    language: TsLanguage,
    queries: HashMap<QueryPurpose, Query>,
}

impl TreeSitterWrapper {
    pub fn new(language: TsLanguage, query_sources: HashMap<QueryPurpose, &str>) -> Result<Self, DomainError> {
        let mut parser = Parser::new();
        parser
            .set_language(&language)
            .map_err(|e| DomainError::PluginLoadFailed(format!("set_language: {e}")))?;

        let mut queries = HashMap::new();
        for (purpose, source) in query_sources {
            let query = Query::new(&language, source)
                .map_err(|e| DomainError::PluginLoadFailed(format!("compile query {purpose:?}: {e}")))?;
            queries.insert(purpose, query);
        }

        Ok(Self {
            parser: Mutex::new(parser),
            language,
            queries,
        })
    }

    pub fn parse(&self, content: &[u8], previous_tree: Option<&Tree>) -> Result<Tree, DomainError> {
        let mut parser = self.parser.lock().map_err(|_| DomainError::internal("parser lock poisoned"))?;
        parser
            .parse(content, previous_tree)
            .ok_or_else(|| DomainError::parse("tree-sitter returned no tree"))
    }

    /// Runs the compiled query for `purpose` over `tree`, skipping any
    /// capture whose node exceeds the configured depth.
    pub fn captures(&self, purpose: QueryPurpose, tree: &Tree, content: &[u8]) -> Vec<Capture> {
        let Some(query) = self.queries.get(&purpose) else {
            return Vec::new();
        };

        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(query, tree.root_node(), content);
        let mut captures = Vec::new();

        while let Some(m) = matches.next() {
            for capture in m.captures {
                if node_depth(capture.node) > MAX_QUERY_DEPTH {
                    warn!(purpose = ?purpose, "skipping capture exceeding max query depth");
                    continue;
                }
                let name = query.capture_names()[capture.index as usize].to_string();
                let text = capture
                    .node
                    .utf8_text(content)
                    .unwrap_or_default()
                    .to_string();
                let start = capture.node.start_position();
                captures.push(Capture {
                    name,
                    start_byte: capture.node.start_byte(),
                    end_byte: capture.node.end_byte(),
                    start_row: start.row,
                    start_col: start.column,
                    text,
                });
            }
        }
        captures
    }

    pub fn language(&self) -> &TsLanguage {
        &self.language
    }
}

fn node_depth(node: tree_sitter::Node) -> usize {
    let mut depth = 0;
    let mut current = node;
    while let Some(parent) = current.parent() {
        depth += 1;
        current = parent;
    }
    depth
}
