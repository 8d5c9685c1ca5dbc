//! # Ledger Adapter
//!
//! Narrow wrapper around the external ledger client the AMM coordinator
//! runs against (§4.2). The ledger's account model: accounts are
//! public-key-addressed; "storage accounts" can be created and delegated
//! write permissions; an operator account holding `SEND_ON_BEHALF` on a
//! storage account may transfer any asset out of it in a transaction it
//! signs itself. This crate is the *only* place that touches the ledger
//! client; everything above it works in terms of [`LedgerAdapter`].

pub mod adapter;
pub mod error;
pub mod fake;
pub mod types;

pub use adapter::{Instruction, LedgerAdapter, TransactionBuilder};
pub use error::{LedgerError, Result};
pub use fake::FakeLedgerAdapter;
pub use types::{
    Account, AccountInfo, Balance, LpTokenMetadata, Permission, PublishResult, TokenId,
    U256Wrapper,
};
