//! `AnchorPool` & `AnchorRegistry` (C6): a pool variant with a creator-set,
//! per-pool `fee_bps` and a status state machine (§4.6). Swap semantics
//! reuse [`crate::pool::Pool`] with `protocol_fee_bps = 0` — the entire fee
//! accrues to LPs.

use crate::config::CoordinatorConfig;
use crate::error::{CoordinatorError, Result};
use crate::pool::{FeeConfig, Pool};
use dashmap::DashMap;
use ledger::{Account, LedgerAdapter};
use repository::{AnchorPoolRow, AnchorStatus, Repository};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

const MIN_FEE_BPS: u32 = 1;
const MAX_FEE_BPS: u32 = 1_000;

/// One anchor pool: the underlying constant-product [`Pool`] plus the
/// creator-gated fee/status fields §4.6 adds on top.
pub struct AnchorPool {
    pub pool: Pool,
    fee_bps: AtomicU32,
    status: parking_lot::RwLock<AnchorStatus>,
}

impl AnchorPool {
    pub fn status(&self) -> AnchorStatus {
        *self.status.read()
    }

    pub fn fee_bps(&self) -> u32 {
        self.fee_bps.load(Ordering::Acquire)
    }

    pub fn is_active(&self) -> bool {
        self.status() == AnchorStatus::Active
    }
}

pub struct AnchorRegistry {
    pools: DashMap<String, Arc<AnchorPool>>,
    adapter: Arc<dyn LedgerAdapter>,
    repository: Arc<dyn Repository>,
    config: CoordinatorConfig,
}

impl AnchorRegistry {
    pub fn new(adapter: Arc<dyn LedgerAdapter>, repository: Arc<dyn Repository>, config: CoordinatorConfig) -> Self {
        Self {
            pools: DashMap::new(),
            adapter,
            repository,
            config,
        }
    }

    pub async fn initialize(&self) -> Result<()> {
        let rows = self.repository.load_anchor_pools().await?;
        for row in rows {
            let anchor = self.build_anchor(&row);
            if let Err(e) = anchor.pool.initialize().await {
                warn!(pool = %row.pool_address, error = %e, "anchor pool initialization failed");
            }
            self.pools.insert(row.pool_address.clone(), anchor);
        }
        Ok(())
    }

    fn build_anchor(&self, row: &AnchorPoolRow) -> Arc<AnchorPool> {
        let pool = Pool::new(
            Account(row.pool_address.clone()),
            Account(row.token_a.clone()),
            Account(row.token_b.clone()),
            Account(row.creator.clone()),
            row.lp_token_address.clone().map(Account),
            FeeConfig::anchor(row.fee_bps),
            Account(self.config.treasury_address.clone()),
            Duration::from_millis(self.config.settlement_delay_ms),
            self.config.default_slippage_percent,
            Arc::clone(&self.adapter),
            Arc::clone(&self.repository),
            true,
        );
        Arc::new(AnchorPool {
            pool,
            fee_bps: AtomicU32::new(row.fee_bps),
            status: parking_lot::RwLock::new(row.status),
        })
    }

    /// Creates an anchor pool (mirrors [`crate::pool_manager::PoolManager::create_pool`]
    /// but persists to the anchor tables and carries a creator-set fee).
    #[instrument(skip(self), fields(token_a = %token_a, token_b = %token_b, fee_bps))]
    pub async fn create_pool(
        &self,
        token_a: &Account,
        token_b: &Account,
        creator: &Account,
        fee_bps: u32,
    ) -> Result<Arc<AnchorPool>> {
        if !(MIN_FEE_BPS..=MAX_FEE_BPS).contains(&fee_bps) {
            return Err(CoordinatorError::InvalidInput(format!(
                "fee_bps {fee_bps} out of range [{MIN_FEE_BPS}, {MAX_FEE_BPS}]"
            )));
        }

        let pool_address = self
            .adapter
            .create_storage_account("anchor_pool", "Anchor pool", true, creator)
            .await?;
        let lp_token_address = self
            .adapter
            .create_lp_token(&pool_address, token_a, token_b)
            .await?;

        let row = AnchorPoolRow {
            pool_address: pool_address.address().to_string(),
            token_a: token_a.address().to_string(),
            token_b: token_b.address().to_string(),
            lp_token_address: Some(lp_token_address.address().to_string()),
            creator: creator.address().to_string(),
            fee_bps,
            status: AnchorStatus::Active,
        };
        let anchor = self.build_anchor(&row);
        if let Err(e) = anchor.pool.initialize().await {
            warn!(pool = %pool_address, error = %e, "anchor pool initial reserve fetch failed");
        }
        self.pools.insert(row.pool_address.clone(), Arc::clone(&anchor));

        if let Err(e) = self.repository.save_anchor_pool(row).await {
            warn!(pool = %pool_address, error = %e, "anchor pool persisted to ledger but repository write failed");
        }

        info!(pool = %pool_address, fee_bps, "anchor pool created");
        Ok(anchor)
    }

    pub fn get_pool(&self, pool_address: &str) -> Option<Arc<AnchorPool>> {
        self.pools.get(pool_address).map(|p| Arc::clone(&p))
    }

    pub fn all_pools(&self) -> Vec<Arc<AnchorPool>> {
        self.pools.iter().map(|entry| Arc::clone(entry.value())).collect()
    }

    pub fn pools_by_creator(&self, creator: &str) -> Vec<Arc<AnchorPool>> {
        self.pools
            .iter()
            .filter(|entry| entry.value().pool.creator.address() == creator)
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Selects the best *active* anchor route for a pair, i.e. the lowest
    /// `fee_bps` among active anchor pools covering it (§4.6 — two or more
    /// anchor pools may cover the same pair).
    pub fn best_active_route(&self, token_a: &str, token_b: &str) -> Option<Arc<AnchorPool>> {
        self.pools
            .iter()
            .filter(|entry| {
                let anchor = entry.value();
                anchor.is_active()
                    && ((anchor.pool.token_a.address() == token_a && anchor.pool.token_b.address() == token_b)
                        || (anchor.pool.token_a.address() == token_b && anchor.pool.token_b.address() == token_a))
            })
            .map(|entry| Arc::clone(entry.value()))
            .min_by_key(|anchor| anchor.fee_bps())
    }

    /// Only the creator may update fee or status (§4.6).
    fn authorize(&self, anchor: &AnchorPool, caller: &Account) -> Result<()> {
        if &anchor.pool.creator != caller {
            return Err(CoordinatorError::Unauthorized(format!(
                "{caller} is not the creator of pool {}",
                anchor.pool.pool_address
            )));
        }
        Ok(())
    }

    pub async fn update_fee(&self, caller: &Account, pool_address: &str, new_fee_bps: u32) -> Result<()> {
        let anchor = self
            .get_pool(pool_address)
            .ok_or_else(|| CoordinatorError::PoolNotFound(pool_address.to_string()))?;
        self.authorize(&anchor, caller)?;
        if !(MIN_FEE_BPS..=MAX_FEE_BPS).contains(&new_fee_bps) {
            return Err(CoordinatorError::InvalidInput(format!(
                "fee_bps {new_fee_bps} out of range [{MIN_FEE_BPS}, {MAX_FEE_BPS}]"
            )));
        }
        anchor.fee_bps.store(new_fee_bps, Ordering::Release);
        anchor.pool.set_fee_bps(new_fee_bps);
        self.repository.update_anchor_fee(pool_address, new_fee_bps).await?;
        Ok(())
    }

    /// `closed` is terminal; `paused` is reversible to `active` (§4.6).
    pub async fn update_status(&self, caller: &Account, pool_address: &str, new_status: AnchorStatus) -> Result<()> {
        let anchor = self
            .get_pool(pool_address)
            .ok_or_else(|| CoordinatorError::PoolNotFound(pool_address.to_string()))?;
        self.authorize(&anchor, caller)?;
        if anchor.status() == AnchorStatus::Closed {
            return Err(CoordinatorError::InvalidInput(
                "pool is closed; closed is a terminal state".to_string(),
            ));
        }
        *anchor.status.write() = new_status;
        self.repository.update_anchor_status(pool_address, new_status).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger::FakeLedgerAdapter;
    use repository::InMemoryRepository;

    fn registry() -> AnchorRegistry {
        let adapter = Arc::new(FakeLedgerAdapter::new());
        let repository = Arc::new(InMemoryRepository::in_memory_only());
        AnchorRegistry::new(adapter, repository, CoordinatorConfig::default())
    }

    #[tokio::test]
    async fn create_pool_rejects_out_of_range_fee() {
        let registry = registry();
        let err = registry
            .create_pool(&Account("A".into()), &Account("B".into()), &Account("creator".into()), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, CoordinatorError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn only_creator_can_update_fee() {
        let registry = registry();
        let creator = Account("creator".into());
        let anchor = registry
            .create_pool(&Account("A".into()), &Account("B".into()), &creator, 100)
            .await
            .unwrap();

        let err = registry
            .update_fee(&Account("impostor".into()), anchor.pool.pool_address.address(), 200)
            .await
            .unwrap_err();
        assert!(matches!(err, CoordinatorError::Unauthorized(_)));

        registry
            .update_fee(&creator, anchor.pool.pool_address.address(), 200)
            .await
            .unwrap();
        assert_eq!(anchor.fee_bps(), 200);
    }

    #[tokio::test]
    async fn closed_status_is_terminal() {
        let registry = registry();
        let creator = Account("creator".into());
        let anchor = registry
            .create_pool(&Account("A".into()), &Account("B".into()), &creator, 100)
            .await
            .unwrap();

        registry
            .update_status(&creator, anchor.pool.pool_address.address(), AnchorStatus::Closed)
            .await
            .unwrap();
        let err = registry
            .update_status(&creator, anchor.pool.pool_address.address(), AnchorStatus::Active)
            .await
            .unwrap_err();
        assert!(matches!(err, CoordinatorError::InvalidInput(_)));
    }
}
