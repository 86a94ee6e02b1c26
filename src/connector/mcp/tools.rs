use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::domain::models::{SearchMode, Symbol, SymbolKind};

fn default_limit() -> usize {
    10
}

fn default_mode() -> String {
    "hybrid".to_string()
}

/// Input parameters for the `search_code` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchToolInput {
    /// Id of a previously-indexed repository. For cross-repo search use
    /// the `search_scope` tool instead.
    pub repo_id: String,

    /// Natural language or lexical query.
    pub query: String,

    /// lexical | semantic | hybrid (default: hybrid).
    #[serde(default = "default_mode")]
    pub mode: String,

    /// Maximum number of results to return (default: 10, server cap: 100).
    #[serde(default = "default_limit")]
    pub limit: usize,
}

pub fn parse_mode(mode: &str) -> SearchMode {
    match mode {
        "lexical" => SearchMode::Lexical,
        "semantic" => SearchMode::Semantic,
        _ => SearchMode::Hybrid,
    }
}

/// A single search hit returned by `search_code`.
#[derive(Debug, Serialize, JsonSchema)]
pub struct SearchHitOutput {
    pub repo_id: String,
    pub relative_path: String,
    pub line: u32,
    pub snippet: String,
    pub score: f64,
}

/// Input parameters for the `lookup_symbol` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct LookupSymbolInput {
    pub repo_id: String,
    pub name: String,
    #[serde(default)]
    pub fuzzy: bool,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct SymbolOutput {
    pub name: String,
    pub kind: String,
    pub line_start: u32,
    pub line_end: u32,
    pub signature: Option<String>,
}

impl From<&Symbol> for SymbolOutput {
    fn from(s: &Symbol) -> Self {
        Self {
            name: s.name.clone(),
            kind: symbol_kind_label(s.kind).to_string(),
            line_start: s.line_start,
            line_end: s.line_end,
            signature: s.signature.clone(),
        }
    }
}

fn symbol_kind_label(kind: SymbolKind) -> &'static str {
    match kind {
        SymbolKind::Function => "function",
        SymbolKind::Method => "method",
        SymbolKind::Class => "class",
        SymbolKind::Struct => "struct",
        SymbolKind::Interface => "interface",
        SymbolKind::Trait => "trait",
        SymbolKind::Enum => "enum",
        SymbolKind::Variant => "variant",
        SymbolKind::Field => "field",
        SymbolKind::Variable => "variable",
        SymbolKind::Constant => "constant",
        SymbolKind::Module => "module",
        SymbolKind::Namespace => "namespace",
        SymbolKind::TypeAlias => "type_alias",
        SymbolKind::Macro => "macro",
        SymbolKind::Mixin => "mixin",
        SymbolKind::Extension => "extension",
        SymbolKind::Widget => "widget",
        SymbolKind::Section => "section",
        SymbolKind::Other => "other",
    }
}

/// Input parameters for the `index_directory` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct IndexDirectoryInput {
    pub repo_id: String,
    /// Absolute path to the repository root on disk.
    pub root: String,
    /// Repo-relative POSIX paths to index. Empty means "walk the whole tree".
    #[serde(default)]
    pub relative_paths: Vec<String>,
}

/// Input parameters for the `find_references` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct FindReferencesInput {
    pub repo_id: String,
    pub symbol_identifier: String,
    #[serde(default)]
    pub include_definitions: bool,
}

/// Input parameters for the `get_outline` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetOutlineInput {
    pub repo_id: String,
    pub relative_path: String,
}

/// Input parameters for the `get_status` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetStatusInput {
    pub repo_id: String,
}

/// Input parameters for the `search_scope` tool: a hybrid search fanned out
/// across several registered repositories and fused into one ranked list.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ScopeSearchInput {
    pub repo_ids: Vec<String>,
    pub query: String,
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_modes() {
        assert_eq!(parse_mode("lexical"), SearchMode::Lexical);
        assert_eq!(parse_mode("semantic"), SearchMode::Semantic);
        assert_eq!(parse_mode("hybrid"), SearchMode::Hybrid);
        assert_eq!(parse_mode("bogus"), SearchMode::Hybrid);
    }
}
