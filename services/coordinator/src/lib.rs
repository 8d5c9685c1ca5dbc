//! Off-chain AMM coordinator: pool registry, two-phase swap/liquidity
//! protocol, anchor pools, and the HTTP surface serving them.

pub mod anchor;
pub mod apy;
pub mod config;
pub mod error;
pub mod history;
pub mod http;
pub mod pool;
pub mod pool_manager;
pub mod rate_limit;
pub mod state;

pub use config::CoordinatorConfig;
pub use error::{CoordinatorError, Result};
pub use state::AppState;
