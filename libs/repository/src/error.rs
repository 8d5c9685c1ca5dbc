//! Error types for the repository layer.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RepoError>;

/// Errors from the durable index. Per §4.3, callers on the post-trade hook
/// path (snapshot, hint, event log) treat every variant here as
/// non-critical: log and continue, never fail the trade.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("pool not found: {0}")]
    PoolNotFound(String),

    #[error("anchor pool not found: {0}")]
    AnchorPoolNotFound(String),

    #[error("journal write failed: {0}")]
    JournalWrite(String),

    #[error("fallback file I/O failed: {0}")]
    FileIo(#[from] std::io::Error),

    #[error("fallback file JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RepoError {
    /// Whether this error should be treated as `IndexStale` per §7: logged
    /// as a warning, never surfaced to the client.
    pub fn is_non_critical(&self) -> bool {
        !matches!(self, RepoError::PoolNotFound(_) | RepoError::AnchorPoolNotFound(_))
    }
}
