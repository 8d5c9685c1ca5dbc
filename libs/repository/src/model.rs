//! Row types for the durable index (§3, §6.4).

use primitive_types::U256;
use serde::{Deserialize, Serialize};

/// A persisted `pools` row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolRow {
    pub pool_address: String,
    pub token_a: String,
    pub token_b: String,
    pub lp_token_address: Option<String>,
    pub creator: String,
}

/// A persisted `lp_position_hints` row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LpPositionHint {
    pub pool_address: String,
    pub user: String,
    pub shares: U256,
}

/// A persisted `pool_snapshots` row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotRow {
    pub pool_address: String,
    /// Unix seconds.
    pub snapshot_time: i64,
    pub reserve_a: U256,
    pub reserve_b: U256,
}

/// A persisted `swap_events` row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapEventRow {
    pub pool_address: String,
    pub token_in: String,
    pub token_out: String,
    pub amount_in: U256,
    pub amount_out: U256,
    pub fee_collected: U256,
    pub user: String,
    pub tx_hash: String,
    /// Unix seconds.
    pub ts: i64,
}

/// A persisted `anchor_pools` row — the superset of `PoolRow`'s identity
/// fields plus fee/status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnchorPoolRow {
    pub pool_address: String,
    pub token_a: String,
    pub token_b: String,
    pub lp_token_address: Option<String>,
    pub creator: String,
    pub fee_bps: u32,
    pub status: AnchorStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorStatus {
    Active,
    Paused,
    Closed,
}

/// Derived 24h volume stats for a pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct VolumeStats {
    pub swap_count: u64,
    pub volume_in: U256,
    pub fees: U256,
}
