//! Error types for the ledger adapter.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors surfaced by the ledger adapter. Every failure that can reach a
/// caller above the adapter boundary is represented here; nothing above
/// this layer parses raw ledger-client errors directly.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// An address string failed to parse into an account.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// A read (balance, account info) exceeded its deadline.
    #[error("ledger read timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// `publish` exceeded its deadline. Unlike read timeouts, the caller
    /// cannot assume the transaction did not land — it must not be retried
    /// blindly.
    #[error("publish timed out after {timeout_ms}ms for account {account}")]
    PublishTimeout { account: String, timeout_ms: u64 },

    /// The ledger rejected a published transaction.
    #[error("ledger rejected transaction for {account}: {reason}")]
    Rejected { account: String, reason: String },

    /// The calling account lacks a required permission (e.g. `SEND_ON_BEHALF`).
    #[error("account {account} lacks permission {permission} on {subject}")]
    PermissionDenied {
        account: String,
        subject: String,
        permission: String,
    },

    /// Token metadata was present but did not decode as expected.
    #[error("malformed metadata on {account}: {reason}")]
    MalformedMetadata { account: String, reason: String },

    /// Storage-account or token creation failed.
    #[error("failed to create {kind} account: {reason}")]
    CreationFailed { kind: String, reason: String },

    /// Mint/burn exceeded a token's supply cap or attempted to burn more
    /// than is held.
    #[error("supply operation failed for {token}: {reason}")]
    SupplyError { token: String, reason: String },

    /// Catch-all for errors from the underlying ledger client library that
    /// don't merit their own variant.
    #[error("ledger client error: {0}")]
    Client(String),
}

impl LedgerError {
    /// Whether a caller may retry the operation that produced this error
    /// without risking a double-effect (never true for anything following
    /// a `publish` call whose outcome is unknown).
    pub fn is_retryable_read(&self) -> bool {
        matches!(self, LedgerError::Timeout { .. } | LedgerError::Client(_))
    }

    /// Whether this error indicates the caller's request was malformed
    /// (maps to `InvalidInput` at the HTTP boundary) rather than a ledger
    /// or infrastructure fault.
    pub fn is_client_fault(&self) -> bool {
        matches!(
            self,
            LedgerError::InvalidAddress(_) | LedgerError::PermissionDenied { .. }
        )
    }
}
