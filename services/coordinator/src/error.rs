//! Coordinator error types (§7). Each variant maps to an HTTP status via
//! [`CoordinatorError::status_code`], mirroring the classification-method
//! pattern used by [`amm::MathError`], [`ledger::LedgerError`] and
//! [`repository::RepoError`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("insufficient liquidity for this trade size")]
    InsufficientLiquidity,

    #[error("insufficient LP shares: requested {requested}, held {held}")]
    InsufficientShares { requested: String, held: String },

    #[error("slippage exceeded: minimum {minimum} requested, {actual} available")]
    SlippageExceeded { minimum: String, actual: String },

    #[error("pool not found: {0}")]
    PoolNotFound(String),

    #[error("a pool for this pair already exists: {0}")]
    PoolAlreadyExists(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("pool index is stale and background discovery has not yet completed")]
    IndexStale,

    #[error("anchor pool math error: {0}")]
    Math(#[from] amm::MathError),

    #[error("ledger error: {0}")]
    Ledger(#[from] ledger::LedgerError),

    #[error("repository error: {0}")]
    Repo(#[from] repository::RepoError),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("http error: {0}")]
    Http(#[from] warp::Error),

    #[error("rate limit exceeded")]
    RateLimited,
}

pub type Result<T> = std::result::Result<T, CoordinatorError>;

impl CoordinatorError {
    /// Maps this error to the HTTP status code the C8 surface replies with.
    pub fn status_code(&self) -> warp::http::StatusCode {
        use warp::http::StatusCode;
        match self {
            CoordinatorError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            CoordinatorError::InsufficientLiquidity => StatusCode::UNPROCESSABLE_ENTITY,
            CoordinatorError::InsufficientShares { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            CoordinatorError::SlippageExceeded { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            CoordinatorError::PoolNotFound(_) => StatusCode::NOT_FOUND,
            CoordinatorError::PoolAlreadyExists(_) => StatusCode::CONFLICT,
            CoordinatorError::Unauthorized(_) => StatusCode::FORBIDDEN,
            CoordinatorError::IndexStale => StatusCode::SERVICE_UNAVAILABLE,
            CoordinatorError::Math(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CoordinatorError::Ledger(e) if e.is_client_fault() => StatusCode::BAD_REQUEST,
            CoordinatorError::Ledger(_) => StatusCode::BAD_GATEWAY,
            CoordinatorError::Repo(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CoordinatorError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CoordinatorError::Http(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CoordinatorError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    /// True when the ledger leg of this error left no on-chain side effect,
    /// so the caller can safely retry with a fresh quote.
    pub fn is_safe_to_retry(&self) -> bool {
        match self {
            CoordinatorError::Ledger(e) => e.is_retryable_read(),
            CoordinatorError::IndexStale => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_not_found_maps_to_404() {
        let err = CoordinatorError::PoolNotFound("pool1".into());
        assert_eq!(err.status_code(), warp::http::StatusCode::NOT_FOUND);
    }

    #[test]
    fn slippage_exceeded_maps_to_422() {
        let err = CoordinatorError::SlippageExceeded {
            minimum: "100".into(),
            actual: "90".into(),
        };
        assert_eq!(err.status_code(), warp::http::StatusCode::UNPROCESSABLE_ENTITY);
    }
}
