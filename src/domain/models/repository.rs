use std::path::PathBuf;

use sha2::{Digest, Sha256};

/// A registered repository. `id` is a stable 12-hex digest derived from the
/// git remote URL, or, failing that, from the canonical root path — so the
/// same repo re-registered after a restart maps to the same id.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Repository {
    pub id: String,
    pub root_path_absolute: PathBuf,
    pub created_at: i64,
    pub last_indexed_at: Option<i64>,
}

impl Repository {
    pub fn new(root_path_absolute: PathBuf, remote_url: Option<&str>, created_at: i64) -> Self {
        let id = Self::derive_id(&root_path_absolute, remote_url);
        Self {
            id,
            root_path_absolute,
            created_at,
            last_indexed_at: None,
        }
    }

    /// 12 hex chars of SHA-256 over the remote URL when present, else over
    /// the canonical absolute path. Never guessed at random: re-registering
    /// the same repo must always yield the same id.
    pub fn derive_id(root_path_absolute: &std::path::Path, remote_url: Option<&str>) -> String {
        let mut hasher = Sha256::new();
        match remote_url {
            Some(url) if !url.is_empty() => hasher.update(url.as_bytes()),
            _ => hasher.update(root_path_absolute.to_string_lossy().as_bytes()),
        }
        let digest = hasher.finalize();
        digest.iter().take(6).map(|b| format!("{b:02x}")).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_is_deterministic_for_same_remote() {
        let a = Repository::derive_id(std::path::Path::new("/a"), Some("git@h:r.git"));
        let b = Repository::derive_id(std::path::Path::new("/b"), Some("git@h:r.git"));
        assert_eq!(a, b);
        assert_eq!(a.len(), 12);
    }

    #[test]
    fn falls_back_to_path_without_remote() {
        let a = Repository::derive_id(std::path::Path::new("/repo/one"), None);
        let b = Repository::derive_id(std::path::Path::new("/repo/two"), None);
        assert_ne!(a, b);
    }
}
