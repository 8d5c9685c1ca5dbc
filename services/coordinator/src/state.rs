//! Shared application state (§12): the single `Arc<AppState>` wired through
//! every HTTP handler.

use crate::anchor::AnchorRegistry;
use crate::apy::PriceMap;
use crate::config::CoordinatorConfig;
use crate::error::Result;
use crate::history::TransactionHistory;
use crate::pool_manager::PoolManager;
use crate::rate_limit::RateLimiter;
use ledger::LedgerAdapter;
use parking_lot::RwLock;
use repository::Repository;
use std::sync::Arc;

pub struct AppState {
    pub pool_manager: Arc<PoolManager>,
    pub anchor_registry: Arc<AnchorRegistry>,
    pub adapter: Arc<dyn LedgerAdapter>,
    pub repository: Arc<dyn Repository>,
    pub config: CoordinatorConfig,
    pub prices: RwLock<PriceMap>,
    pub history: TransactionHistory,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    pub fn new(adapter: Arc<dyn LedgerAdapter>, repository: Arc<dyn Repository>, config: CoordinatorConfig) -> Arc<Self> {
        let pool_manager = Arc::new(PoolManager::new(Arc::clone(&adapter), Arc::clone(&repository), config.clone()));
        let anchor_registry = AnchorRegistry::new(Arc::clone(&adapter), Arc::clone(&repository), config.clone());
        let rate_limiter = RateLimiter::new(config.rate_limit_per_minute);
        Arc::new(Self {
            pool_manager,
            anchor_registry: Arc::new(anchor_registry),
            adapter,
            repository,
            config,
            prices: RwLock::new(PriceMap::new()),
            history: TransactionHistory::default(),
            rate_limiter,
        })
    }

    /// Loads persisted pools/anchor pools and kicks off background
    /// discovery. Must run once before the HTTP server starts serving.
    pub async fn initialize(&self) -> Result<()> {
        self.pool_manager.initialize().await?;
        self.anchor_registry.initialize().await?;
        Ok(())
    }
}
