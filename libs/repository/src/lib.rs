//! # Repository
//!
//! The durable index (§4.3): pools, LP-position hints, per-pool reserve
//! snapshots, swap events, anchor pools, anchor snapshots/swaps. A
//! non-critical failure policy applies throughout: a repository error
//! during a post-trade hook (snapshot, hint, event log) is logged but
//! never fails the trade, because the ledger is the source of truth.

pub mod error;
pub mod file_fallback;
pub mod memory;
pub mod model;
pub mod repository;

pub use error::{RepoError, Result};
pub use file_fallback::FileFallbackStore;
pub use memory::InMemoryRepository;
pub use model::{AnchorPoolRow, AnchorStatus, LpPositionHint, PoolRow, SnapshotRow, SwapEventRow, VolumeStats};
pub use repository::Repository;
