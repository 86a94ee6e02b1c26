/// A semantic chunk fed to the embedder. Vector store points are keyed by a
/// deterministic 64-bit hash of `(relative_path, name, line, content_hash[..8])`
/// so re-embedding an unchanged chunk is a no-op (spec §4.G, property 6).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Chunk {
    pub chunk_id: u64,
    pub file_id: i64,
    pub content_hash: String,
    pub byte_start: u32,
    pub byte_end: u32,
    pub token_count: u32,
    pub embedding_version: u32,
    pub context_before: Option<String>,
    pub context_after: Option<String>,
}

impl Chunk {
    /// FNV-1a over the identity tuple. Stable across processes, unlike
    /// `std::hash::Hash`'s randomized `DefaultHasher`.
    pub fn derive_id(relative_path: &str, name: &str, line: u32, content_hash: &str) -> u64 {
        let prefix8 = &content_hash[..content_hash.len().min(8)];
        let key = format!("{relative_path}\0{name}\0{line}\0{prefix8}");
        let mut hash: u64 = 0xcbf29ce484222325;
        for byte in key.as_bytes() {
            hash ^= *byte as u64;
            hash = hash.wrapping_mul(0x100000001b3);
        }
        hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_is_deterministic() {
        let a = Chunk::derive_id("src/a.py", "calculate_sum", 1, "abcdef0123456789");
        let b = Chunk::derive_id("src/a.py", "calculate_sum", 1, "abcdef0123456789");
        assert_eq!(a, b);
    }

    #[test]
    fn id_changes_with_content_hash() {
        let a = Chunk::derive_id("src/a.py", "f", 1, "aaaaaaaa");
        let b = Chunk::derive_id("src/a.py", "f", 1, "bbbbbbbb");
        assert_ne!(a, b);
    }
}
