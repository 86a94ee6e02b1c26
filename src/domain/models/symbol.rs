/// Closed set of symbol kinds (spec §3). A tagged enum rather than an open
/// string so lookups and filters stay cheap and exhaustive matches catch
/// missing cases at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    Method,
    Class,
    Struct,
    Interface,
    Trait,
    Enum,
    Variant,
    Field,
    Variable,
    Constant,
    Module,
    Namespace,
    TypeAlias,
    Macro,
    Mixin,
    Extension,
    Widget,
    Section,
    Other,
}

/// A named construct with a source range. `line_start`/`line_end` are
/// 1-based and refer to the file version with matching `content_hash`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Symbol {
    pub id: i64,
    pub file_id: i64,
    pub name: String,
    pub kind: SymbolKind,
    pub line_start: u32,
    pub line_end: u32,
    pub col_start: u32,
    pub col_end: u32,
    pub signature: Option<String>,
    pub doc: Option<String>,
    pub metadata_json: Option<String>,
}

impl Symbol {
    pub fn is_valid_range(&self) -> bool {
        self.line_start >= 1 && self.line_start <= self.line_end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(line_start: u32, line_end: u32) -> Symbol {
        Symbol {
            id: 1,
            file_id: 1,
            name: "f".into(),
            kind: SymbolKind::Function,
            line_start,
            line_end,
            col_start: 0,
            col_end: 1,
            signature: None,
            doc: None,
            metadata_json: None,
        }
    }

    #[test]
    fn range_invariant() {
        assert!(sample(1, 3).is_valid_range());
        assert!(!sample(0, 3).is_valid_range());
        assert!(!sample(5, 3).is_valid_range());
    }
}
