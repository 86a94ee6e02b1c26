/// A use of a symbol at a specific source location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Call,
    Read,
    Write,
    Import,
    Inherit,
    Implement,
    Override,
    Other,
}

/// Unresolved references carry `symbol_id = None` and a `resolved_name`;
/// re-resolution against the symbol table happens on demand at query time.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Reference {
    pub id: i64,
    pub symbol_id: Option<i64>,
    pub resolved_name: String,
    pub file_id: i64,
    pub line: u32,
    pub col: u32,
    pub kind: ReferenceKind,
}

impl Reference {
    pub fn is_resolved(&self) -> bool {
        self.symbol_id.is_some()
    }
}
