use super::symbol::SymbolKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    Lexical,
    Semantic,
    Hybrid,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SearchQuery {
    pub text: String,
    pub mode: SearchMode,
    pub limit: usize,
    pub language_filter: Option<String>,
    pub kind_filter: Option<SymbolKind>,
}

/// Which retriever(s) contributed a hit, kept for the `degraded`/provenance
/// fields the dispatcher attaches to merged results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Retriever {
    Lexical,
    Fuzzy,
    Vector,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SearchHit {
    pub file_id: i64,
    pub repo_id: String,
    pub relative_path: String,
    pub line: u32,
    pub snippet: String,
    pub score: f64,
    pub retrievers: Vec<Retriever>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SearchResult {
    pub hits: Vec<SearchHit>,
    pub degraded: bool,
}
