#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Import {
    pub id: i64,
    pub file_id: i64,
    pub imported_path: String,
    pub imported_name: Option<String>,
    pub alias: Option<String>,
    pub line: u32,
    pub is_relative: bool,
}
