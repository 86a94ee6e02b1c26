use thiserror::Error;

/// The closed error taxonomy for the engine. Every fallible core operation
/// returns one of these kinds instead of panicking or stringly-typing.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("path escapes repository root: {0}")]
    OutOfRepo(String),

    #[error("store busy: {0}")]
    StoreBusy(String),

    #[error("store corrupt: {0}")]
    StoreCorrupt(String),

    #[error("incompatible schema: {0}")]
    SchemaIncompatible(String),

    #[error("plugin load failed: {0}")]
    PluginLoadFailed(String),

    #[error("parse timed out: {0}")]
    ParseTimeout(String),

    #[error("parse error: {0}")]
    ParseError(String),

    #[error("embedder unavailable: {0}")]
    EmbedderUnavailable(String),

    #[error("vector store unavailable: {0}")]
    VectorStoreUnavailable(String),

    #[error("incompatible artifact: {0}")]
    IncompatibleArtifact(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("cancelled: {0}")]
    Cancelled(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::StoreBusy(msg.into())
    }

    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::StoreCorrupt(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid_path(msg: impl Into<String>) -> Self {
        Self::InvalidPath(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Fatal kinds abort startup; every other kind degrades a single file
    /// or a single query instead of taking the engine down.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::StoreCorrupt(_) | Self::SchemaIncompatible(_))
    }

    /// Stable label used in per-file/per-query failure summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::OutOfRepo(_) => "out_of_repo",
            Self::StoreBusy(_) => "store_busy",
            Self::StoreCorrupt(_) => "store_corrupt",
            Self::SchemaIncompatible(_) => "schema_incompatible",
            Self::PluginLoadFailed(_) => "plugin_load_failed",
            Self::ParseTimeout(_) => "parse_timeout",
            Self::ParseError(_) => "parse_error",
            Self::EmbedderUnavailable(_) => "embedder_unavailable",
            Self::VectorStoreUnavailable(_) => "vector_store_unavailable",
            Self::IncompatibleArtifact(_) => "incompatible_artifact",
            Self::Unauthorized(_) => "unauthorized",
            Self::Cancelled(_) => "cancelled",
            Self::InvalidPath(_) => "invalid_path",
            Self::NotFound(_) => "not_found",
            Self::IoError(_) => "io_error",
            Self::Internal(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_kinds_abort_startup() {
        assert!(DomainError::corrupt("bad header").is_fatal());
        assert!(DomainError::SchemaIncompatible("v3 > v2".into()).is_fatal());
        assert!(!DomainError::not_found("x").is_fatal());
    }

    #[test]
    fn kind_labels_are_stable() {
        assert_eq!(DomainError::not_found("x").kind(), "not_found");
        assert_eq!(DomainError::storage("busy").kind(), "store_busy");
    }
}
