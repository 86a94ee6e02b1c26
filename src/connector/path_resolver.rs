use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;

use crate::domain::error::DomainError;

const HASH_BLOCK_SIZE: usize = 4096;

/// Resolves `relative_path` (POSIX-style) against `repo_root`, failing with
/// `OutOfRepo` if the result would escape the root (spec §4.A).
pub fn resolve(repo_root: &Path, relative_path: &str) -> Result<PathBuf, DomainError> {
    if relative_path.starts_with('/') || relative_path.split('/').any(|seg| seg == "..") {
        return Err(DomainError::OutOfRepo(relative_path.to_string()));
    }
    Ok(repo_root.join(relative_path))
}

/// Canonicalizes `absolute_path` and strips `repo_root`, converting to a
/// POSIX-style relative path regardless of host separator.
pub fn normalize(repo_root: &Path, absolute_path: &Path) -> Result<String, DomainError> {
    let canonical_root = repo_root
        .canonicalize()
        .map_err(|e| DomainError::InvalidPath(format!("{}: {e}", repo_root.display())))?;
    let canonical_path = absolute_path
        .canonicalize()
        .map_err(|e| DomainError::InvalidPath(format!("{}: {e}", absolute_path.display())))?;

    let relative = canonical_path
        .strip_prefix(&canonical_root)
        .map_err(|_| DomainError::OutOfRepo(absolute_path.display().to_string()))?;

    let posix = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/");
    Ok(posix)
}

/// Streaming SHA-256 in 4 KiB blocks — never loads the whole file into
/// memory (spec §4.A guarantee).
pub async fn hash_file(path: &Path) -> Result<String, DomainError> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; HASH_BLOCK_SIZE];
    loop {
        let read = file.read(&mut buf).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

pub fn hash_bytes(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

/// Walks a repository root respecting `.gitignore`, returning repo-relative
/// POSIX paths for every regular file (spec §4.F `index_directory` input).
pub fn walk_repo_files(repo_root: &Path) -> Vec<String> {
    ignore::WalkBuilder::new(repo_root)
        .build()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_some_and(|t| t.is_file()))
        .filter_map(|entry| normalize(repo_root, entry.path()).ok())
        .collect()
}

/// Walks upward from `start`, picking the nearest directory containing
/// `.git`; falls back to `start` itself.
pub fn detect_repo_root(start: &Path) -> PathBuf {
    let mut current = start;
    loop {
        if current.join(".git").exists() {
            return current.to_path_buf();
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return start.to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_rejects_escaping_paths() {
        let root = Path::new("/repo");
        assert!(resolve(root, "../etc/passwd").is_err());
        assert!(resolve(root, "/etc/passwd").is_err());
        assert!(resolve(root, "src/a.py").is_ok());
    }

    #[test]
    fn hash_bytes_is_deterministic() {
        assert_eq!(hash_bytes(b"hello"), hash_bytes(b"hello"));
        assert_ne!(hash_bytes(b"hello"), hash_bytes(b"world"));
    }

    #[tokio::test]
    async fn hash_file_matches_hash_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        tokio::fs::write(&path, b"content").await.unwrap();
        let from_file = hash_file(&path).await.unwrap();
        assert_eq!(from_file, hash_bytes(b"content"));
    }

    #[test]
    fn detect_repo_root_falls_back_without_git() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(detect_repo_root(dir.path()), dir.path());
    }
}
