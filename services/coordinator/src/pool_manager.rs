//! `PoolManager` (C5): registry keyed by unordered pair (§6.1); create-pool
//! pipeline; ledger-first position discovery (§4.5 `user_positions`);
//! bounded background pool discovery.

use crate::config::CoordinatorConfig;
use crate::error::{CoordinatorError, Result};
use crate::pool::{FeeConfig, Pool};
use amm::{V2Math, U256};
use dashmap::DashMap;
use ledger::{Account, LedgerAdapter, LpTokenMetadata};
use repository::{PoolRow, Repository};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{info, instrument, warn};

/// A derived LP position, returned by [`PoolManager::user_positions`].
#[derive(Debug, Clone)]
pub struct Position {
    pub pool_address: String,
    pub token_a: String,
    pub token_b: String,
    pub shares: U256,
    pub amount_a: U256,
    pub amount_b: U256,
    /// Basis points of the pool's total LP supply, i.e. `10_000 * shares /
    /// total_shares` (§4.5).
    pub share_bps: u64,
}

/// `pair_key(a, b)` per §6.1: lexicographic on address strings.
pub fn pair_key(a: &str, b: &str) -> String {
    if a <= b {
        format!("{a}|{b}")
    } else {
        format!("{b}|{a}")
    }
}

pub struct PoolManager {
    pools: DashMap<String, Arc<Pool>>,
    by_address: DashMap<String, Arc<Pool>>,
    adapter: Arc<dyn LedgerAdapter>,
    repository: Arc<dyn Repository>,
    config: CoordinatorConfig,
    discovery_gate: Semaphore,
}

impl PoolManager {
    pub fn new(adapter: Arc<dyn LedgerAdapter>, repository: Arc<dyn Repository>, config: CoordinatorConfig) -> Self {
        let discovery_concurrency = config.discovery_concurrency;
        Self {
            pools: DashMap::new(),
            by_address: DashMap::new(),
            adapter,
            repository,
            config,
            discovery_gate: Semaphore::new(discovery_concurrency),
        }
    }

    /// Loads persisted pools (repository first, file fallback) and
    /// schedules a background discovery pass after the configured startup
    /// delay (§4.5). Pools whose `lp_token_address` is absent are skipped —
    /// a legacy pool is hidden and non-operable (§3, §9).
    pub async fn initialize(self: &Arc<Self>) -> Result<()> {
        let rows = match self.repository.load_pools().await {
            Ok(rows) if !rows.is_empty() => rows,
            Ok(_) | Err(_) => {
                let fallback =
                    repository::FileFallbackStore::new(format!("{}/pools.json", self.config.data_dir));
                fallback.load()
            }
        };

        for row in rows {
            let Some(lp_token_address) = row.lp_token_address.clone() else {
                warn!(pool = %row.pool_address, "skipping legacy pool with no LP token (hidden, non-operable)");
                continue;
            };
            let pool = self.build_pool(&row, Some(lp_token_address));
            if let Err(e) = pool.initialize().await {
                warn!(pool = %row.pool_address, error = %e, "pool initialization failed; retaining in registry uninitialized");
            }
            self.register(pool);
        }

        let manager = Arc::clone(self);
        let delay = Duration::from_secs(self.config.discovery_startup_delay_secs);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = manager.discover_pools_on_chain().await {
                warn!(error = %e, "background pool discovery pass failed");
            }
        });

        Ok(())
    }

    fn build_pool(&self, row: &PoolRow, lp_token_address: Option<Account>) -> Arc<Pool> {
        Arc::new(Pool::new(
            Account(row.pool_address.clone()),
            Account(row.token_a.clone()),
            Account(row.token_b.clone()),
            Account(row.creator.clone()),
            lp_token_address,
            FeeConfig::standard(self.config.standard_fee_bps, self.config.protocol_fee_bps),
            Account(self.config.treasury_address.clone()),
            Duration::from_millis(self.config.settlement_delay_ms),
            self.config.default_slippage_percent,
            Arc::clone(&self.adapter),
            Arc::clone(&self.repository),
            false,
        ))
    }

    fn register(&self, pool: Arc<Pool>) {
        let key = pair_key(pool.token_a.address(), pool.token_b.address());
        self.by_address.insert(pool.pool_address.address().to_string(), Arc::clone(&pool));
        self.pools.insert(key, pool);
    }

    /// `create_pool` pipeline (§4.5): creates the storage account and LP
    /// token on the ledger, then registers and persists the pool. Failures
    /// at the ledger steps abort; failures persisting to the repository or
    /// file fallback are logged but the pool is still considered created,
    /// because the ledger accounts already exist.
    #[instrument(skip(self), fields(token_a = %token_a, token_b = %token_b))]
    pub async fn create_pool(self: &Arc<Self>, token_a: &Account, token_b: &Account, creator: &Account) -> Result<Arc<Pool>> {
        if self.has_pool(token_a.address(), token_b.address()) {
            return Err(CoordinatorError::PoolAlreadyExists(pair_key(
                token_a.address(),
                token_b.address(),
            )));
        }

        let pool_address = self
            .adapter
            .create_storage_account("pool", "AMM pool", true, creator)
            .await?;
        let lp_token_address = self
            .adapter
            .create_lp_token(&pool_address, token_a, token_b)
            .await?;

        let pool = Arc::new(Pool::new(
            pool_address.clone(),
            token_a.clone(),
            token_b.clone(),
            creator.clone(),
            Some(lp_token_address.clone()),
            FeeConfig::standard(self.config.standard_fee_bps, self.config.protocol_fee_bps),
            Account(self.config.treasury_address.clone()),
            Duration::from_millis(self.config.settlement_delay_ms),
            self.config.default_slippage_percent,
            Arc::clone(&self.adapter),
            Arc::clone(&self.repository),
            false,
        ));
        if let Err(e) = pool.initialize().await {
            warn!(pool = %pool_address, error = %e, "new pool's initial reserve fetch failed");
        }
        self.register(Arc::clone(&pool));

        let row = PoolRow {
            pool_address: pool_address.address().to_string(),
            token_a: token_a.address().to_string(),
            token_b: token_b.address().to_string(),
            lp_token_address: Some(lp_token_address.address().to_string()),
            creator: creator.address().to_string(),
        };
        if let Err(e) = self.repository.save_pool(row.clone()).await {
            warn!(pool = %pool_address, error = %e, "pool persisted to ledger but repository write failed");
        }
        let fallback = repository::FileFallbackStore::new(format!("{}/pools.json", self.config.data_dir));
        if let Err(e) = fallback.persist(&row) {
            warn!(pool = %pool_address, error = %e, "pool fallback file write failed");
        }

        info!(pool = %pool_address, lp_token = %lp_token_address, "pool created");
        Ok(pool)
    }

    pub fn get_pool(&self, token_a: &str, token_b: &str) -> Option<Arc<Pool>> {
        self.pools.get(&pair_key(token_a, token_b)).map(|p| Arc::clone(&p))
    }

    pub fn get_pool_by_address(&self, address: &str) -> Option<Arc<Pool>> {
        self.by_address.get(address).map(|p| Arc::clone(&p))
    }

    pub fn all_pools(&self) -> Vec<Arc<Pool>> {
        self.pools.iter().map(|entry| Arc::clone(entry.value())).collect()
    }

    pub fn has_pool(&self, token_a: &str, token_b: &str) -> bool {
        self.pools.contains_key(&pair_key(token_a, token_b))
    }

    /// `swap_route` per §4.5: direct pair only, no multi-hop (non-goal).
    pub fn swap_route(&self, token_in: &str, token_out: &str) -> Option<Arc<Pool>> {
        self.get_pool(token_in, token_out)
    }

    /// `user_positions` per §4.5: blockchain-first discovery. Reads the
    /// user's balances from the ledger, decodes any LP-token metadata,
    /// and derives amounts from the pool's current reserves — the
    /// repository plays no role, eliminating a class of DB/ledger
    /// divergence bugs (§9).
    pub async fn user_positions(self: &Arc<Self>, user: &Account) -> Result<Vec<Position>> {
        let balances = self.adapter.balances_of(user).await?;
        let mut positions = Vec::new();

        for balance in balances {
            let info = match self.adapter.account_info(&balance.token).await {
                Ok(info) => info,
                Err(_) => continue,
            };
            let Some(metadata) = info.metadata else { continue };
            let Some(lp_meta) = LpTokenMetadata::try_decode(&metadata) else { continue };

            let pool = match self.get_pool_by_address(&lp_meta.pool) {
                Some(pool) => pool,
                None => continue,
            };
            let shares: U256 = balance.amount.into();
            if shares.is_zero() {
                continue;
            }
            let Some(lp_token) = pool.lp_token_address() else { continue };
            let total_shares = match self.adapter.account_info(&lp_token).await {
                Ok(lp_info) => lp_info.supply.unwrap_or_default(),
                Err(_) => continue,
            };
            if total_shares.is_zero() {
                continue;
            }
            let (reserve_a, reserve_b) = pool.reserves();
            let Ok((amount_a, amount_b)) = V2Math::burn_to_amounts(shares, total_shares, reserve_a, reserve_b) else {
                continue;
            };
            let share_bps = (shares.saturating_mul(U256::from(10_000u64)) / total_shares)
                .try_into()
                .unwrap_or(u64::MAX);

            // Dust filter (§4.5): both amounts below 1e-6 human units *and*
            // share_bps below 1e-4% (0.01 bps). A precise human-unit
            // comparison needs the pool's decimals; amounts are compared
            // directly against a tiny atomic threshold as an approximation
            // when decimals are the default (9).
            let (decimals_a, decimals_b) = pool.decimals();
            let dust_threshold_a = U256::from(10u64).pow(U256::from(decimals_a.saturating_sub(6)));
            let dust_threshold_b = U256::from(10u64).pow(U256::from(decimals_b.saturating_sub(6)));
            if amount_a < dust_threshold_a && amount_b < dust_threshold_b && share_bps < 1 {
                continue;
            }

            positions.push(Position {
                pool_address: lp_meta.pool,
                token_a: lp_meta.token_a,
                token_b: lp_meta.token_b,
                shares,
                amount_a,
                amount_b,
                share_bps,
            });
        }

        Ok(positions)
    }

    /// `discover_pools_on_chain` per §4.5: bounded-concurrency scan of the
    /// configured candidate addresses (§9 Q3 — empty by default, retained
    /// as a configuration hook).
    pub async fn discover_pools_on_chain(self: &Arc<Self>) -> Result<()> {
        let candidates = self.config.discovery_candidates.clone();
        let mut handles = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let manager = Arc::clone(self);
            handles.push(tokio::spawn(async move {
                let _permit = manager.discovery_gate.acquire().await;
                if let Err(e) = manager.discover_one_candidate(&candidate).await {
                    warn!(candidate = %candidate, error = %e, "candidate pool discovery failed");
                }
            }));
        }
        for handle in handles {
            let _ = handle.await;
        }
        Ok(())
    }

    async fn discover_one_candidate(self: &Arc<Self>, address: &str) -> Result<()> {
        let account = self.adapter.account_from_address(address)?;
        let balances = self.adapter.balances_of(&account).await?;
        if balances.len() < 2 {
            return Ok(());
        }
        let token_a = balances[0].token.clone();
        let token_b = balances[1].token.clone();
        if self.has_pool(token_a.address(), token_b.address()) {
            return Ok(());
        }

        let row = PoolRow {
            pool_address: account.address().to_string(),
            token_a: token_a.address().to_string(),
            token_b: token_b.address().to_string(),
            lp_token_address: None,
            creator: account.address().to_string(),
        };
        if let Err(e) = self.repository.save_pool(row).await {
            warn!(pool = %account, error = %e, "discovered pool persist failed");
        }
        info!(pool = %account, "discovered pool on chain (no LP token; hidden until minted)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger::FakeLedgerAdapter;
    use repository::InMemoryRepository;

    fn manager() -> Arc<PoolManager> {
        let adapter = Arc::new(FakeLedgerAdapter::new());
        let repository = Arc::new(InMemoryRepository::in_memory_only());
        let mut config = CoordinatorConfig::default();
        config.data_dir = std::env::temp_dir().join("coordinator-test").to_string_lossy().to_string();
        Arc::new(PoolManager::new(adapter, repository, config))
    }

    #[test]
    fn pair_key_is_order_independent() {
        assert_eq!(pair_key("A", "B"), pair_key("B", "A"));
    }

    #[tokio::test]
    async fn create_pool_registers_and_rejects_duplicates() {
        let manager = manager();
        let token_a = Account("tokenA".into());
        let token_b = Account("tokenB".into());
        let creator = Account("creator".into());

        let pool = manager.create_pool(&token_a, &token_b, &creator).await.unwrap();
        assert!(manager.has_pool("tokenA", "tokenB"));
        assert_eq!(manager.get_pool_by_address(pool.pool_address.address()).is_some(), true);

        let err = manager.create_pool(&token_a, &token_b, &creator).await.unwrap_err();
        assert!(matches!(err, CoordinatorError::PoolAlreadyExists(_)));
    }

    #[tokio::test]
    async fn swap_route_is_direct_pair_only() {
        let manager = manager();
        let token_a = Account("tokenA".into());
        let token_b = Account("tokenB".into());
        let token_c = Account("tokenC".into());
        let creator = Account("creator".into());
        manager.create_pool(&token_a, &token_b, &creator).await.unwrap();

        assert!(manager.swap_route("tokenA", "tokenB").is_some());
        assert!(manager.swap_route("tokenA", "tokenC").is_none());
    }
}
