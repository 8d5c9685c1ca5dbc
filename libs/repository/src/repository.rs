//! The durable-index trait (§4.3). Behavior is stated independent of the
//! backing store; [`crate::memory::InMemoryRepository`] is the only
//! implementation this crate ships, backed by an append-only journal file
//! in the style of this workspace's other durable caches.

use crate::error::Result;
use crate::model::{AnchorPoolRow, AnchorStatus, LpPositionHint, PoolRow, SnapshotRow, SwapEventRow, VolumeStats};
use async_trait::async_trait;
use primitive_types::U256;

#[async_trait]
pub trait Repository: Send + Sync {
    async fn save_pool(&self, row: PoolRow) -> Result<()>;
    async fn load_pools(&self) -> Result<Vec<PoolRow>>;
    async fn get_pool_by_pair(&self, token_a: &str, token_b: &str) -> Result<Option<PoolRow>>;

    async fn save_lp_position_hint(&self, pool_address: &str, user: &str, shares: U256) -> Result<()>;

    /// Insert; on `(pool_address, second-resolution time)` collision, no-op.
    async fn save_snapshot(&self, pool_address: &str, reserve_a: U256, reserve_b: U256) -> Result<()>;

    /// Latest row at or before `hours_ago`.
    async fn get_snapshot_at(&self, pool_address: &str, hours_ago: f64) -> Result<Option<SnapshotRow>>;

    async fn record_swap(&self, event: SwapEventRow) -> Result<()>;

    async fn volume_24h(&self, pool_address: &str) -> Result<VolumeStats>;

    // Mirror set for anchor pools.
    async fn save_anchor_pool(&self, row: AnchorPoolRow) -> Result<()>;
    async fn load_anchor_pools(&self) -> Result<Vec<AnchorPoolRow>>;
    async fn get_anchor_pool(&self, pool_address: &str) -> Result<Option<AnchorPoolRow>>;
    async fn update_anchor_fee(&self, pool_address: &str, fee_bps: u32) -> Result<()>;
    async fn update_anchor_status(&self, pool_address: &str, status: AnchorStatus) -> Result<()>;
    async fn save_anchor_snapshot(&self, pool_address: &str, reserve_a: U256, reserve_b: U256) -> Result<()>;
    async fn record_anchor_swap(&self, event: SwapEventRow) -> Result<()>;
    async fn anchor_volume_24h(&self, pool_address: &str) -> Result<VolumeStats>;

    async fn save_lp_position_hint_row(&self, hint: LpPositionHint) -> Result<()> {
        self.save_lp_position_hint(&hint.pool_address, &hint.user, hint.shares)
            .await
    }
}
