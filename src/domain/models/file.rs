use super::language::Language;

/// A file row. `relative_path` is the primary human key within a repo and is
/// always POSIX-style. `content_hash` is set whenever `is_deleted = false`;
/// soft-deleted rows retain theirs for audit.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct File {
    pub id: i64,
    pub repo_id: String,
    pub relative_path: String,
    pub language: Language,
    pub size_bytes: u64,
    pub content_hash: String,
    pub mtime: i64,
    pub indexed_at: i64,
    pub is_deleted: bool,
    pub deleted_at: Option<i64>,
}

impl File {
    /// Path portability invariant (spec property 1): no `..`, no leading
    /// `/`, POSIX separators only.
    pub fn is_portable_path(relative_path: &str) -> bool {
        !relative_path.starts_with('/')
            && !relative_path.split('/').any(|seg| seg == "..")
            && !relative_path.contains('\\')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_portable_paths() {
        assert!(File::is_portable_path("src/a.py"));
        assert!(!File::is_portable_path("/src/a.py"));
        assert!(!File::is_portable_path("../a.py"));
        assert!(!File::is_portable_path("src\\a.py"));
    }
}
