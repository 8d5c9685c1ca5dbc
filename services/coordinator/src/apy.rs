//! APY/Volume Calculator (C7): `calc(pool) -> {tvl, volume_24h, apy}` (§4.7).
//!
//! All three figures are expressed in a caller-chosen reference unit (e.g.
//! USD) via an injected price map. Any figure that can't be derived —
//! because a token's price is unknown, or because TVL is zero — reports
//! [`Figure::Unknown`] rather than a misleading zero.

use crate::pool::Pool;
use primitive_types::U256;
use std::collections::HashMap;

/// Price of one human-scaled unit of a token, keyed by account address, in
/// the caller's reference unit.
pub type PriceMap = HashMap<String, f64>;

const VOLUME_FEE_RATE: f64 = 0.003;
const DAYS_PER_YEAR: f64 = 365.0;

/// A figure that may be unavailable because of missing price data or a
/// degenerate pool state, rather than genuinely zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Figure {
    Value(f64),
    Unknown,
}

impl Figure {
    pub fn value(self) -> Option<f64> {
        match self {
            Figure::Value(v) => Some(v),
            Figure::Unknown => None,
        }
    }
}

impl serde::Serialize for Figure {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Figure::Value(v) => serializer.serialize_f64(*v),
            Figure::Unknown => serializer.serialize_str("unknown"),
        }
    }
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolStats {
    pub tvl: Figure,
    pub volume_24h: Figure,
    pub apy_percent: Figure,
}

fn human_units(atomic: U256, decimals: u8) -> f64 {
    let divisor = 10f64.powi(decimals as i32);
    // U256 has no native f64 conversion; the reserves this crate deals with
    // never approach 2^128, so an intermediate u128 loses nothing relevant
    // to a TVL estimate.
    (atomic.low_u128() as f64) / divisor
}

fn reference_value(amount: U256, decimals: u8, price: f64) -> f64 {
    human_units(amount, decimals) * price
}

/// Computes TVL from current reserves via the injected price map. `None` on
/// either side yields [`Figure::Unknown`] (§4.7).
fn tvl(pool: &Pool, prices: &PriceMap) -> Figure {
    let (reserve_a, reserve_b) = pool.reserves();
    let (decimals_a, decimals_b) = pool.decimals();
    let price_a = prices.get(pool.token_a.address());
    let price_b = prices.get(pool.token_b.address());
    match (price_a, price_b) {
        (Some(&pa), Some(&pb)) => {
            Figure::Value(reference_value(reserve_a, decimals_a, pa) + reference_value(reserve_b, decimals_b, pb))
        }
        _ => Figure::Unknown,
    }
}

/// Sums `amount_in` over the pool's last-24h swap events and converts to the
/// reference unit. Swap-side volume mixes `token_a`-in and `token_b`-in
/// trades without a per-event breakdown, so the two sides' prices are
/// averaged as an approximation when both are known.
async fn volume_24h(pool: &Pool, prices: &PriceMap) -> Figure {
    let price_a = prices.get(pool.token_a.address());
    let price_b = prices.get(pool.token_b.address());
    let (price_a, price_b) = match (price_a, price_b) {
        (Some(&pa), Some(&pb)) => (pa, pb),
        _ => return Figure::Unknown,
    };
    let avg_price = (price_a + price_b) / 2.0;
    let (decimals_a, decimals_b) = pool.decimals();
    let avg_decimals = ((decimals_a as u32 + decimals_b as u32) / 2) as u8;

    let lookup = if pool.is_anchor() {
        pool.repository().anchor_volume_24h(pool.pool_address.address())
    } else {
        pool.repository().volume_24h(pool.pool_address.address())
    };
    let stats = match lookup.await {
        Ok(stats) => stats,
        Err(_) => return Figure::Unknown,
    };
    Figure::Value(reference_value(stats.volume_in, avg_decimals, avg_price))
}

/// `calc(pool) -> {tvl, volume_24h, apy}` (§4.7). `apy = fees_24h * 365 / tvl`
/// as a percentage; unknown if `tvl == 0` or `volume_24h` is unknown.
pub async fn calc(pool: &Pool, prices: &PriceMap) -> PoolStats {
    let tvl = tvl(pool, prices);
    let volume_24h = volume_24h(pool, prices).await;

    let apy_percent = match (tvl.value(), volume_24h.value()) {
        (Some(tvl_value), Some(volume_value)) if tvl_value > 0.0 => {
            let fees_24h = volume_value * VOLUME_FEE_RATE;
            Figure::Value(fees_24h * DAYS_PER_YEAR / tvl_value * 100.0)
        }
        _ => Figure::Unknown,
    };

    PoolStats {
        tvl,
        volume_24h,
        apy_percent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoordinatorConfig;
    use crate::pool::FeeConfig;
    use ledger::{Account, FakeLedgerAdapter};
    use repository::{InMemoryRepository, Repository, SwapEventRow};
    use std::sync::Arc;
    use std::time::Duration;

    fn pool(repo: Arc<dyn Repository>) -> Pool {
        let config = CoordinatorConfig::default();
        Pool::new(
            Account("pool1".into()),
            Account("tokenA".into()),
            Account("tokenB".into()),
            Account("creator".into()),
            None,
            FeeConfig::standard(30, 5),
            Account(config.treasury_address.clone()),
            Duration::from_millis(config.settlement_delay_ms),
            config.default_slippage_percent,
            Arc::new(FakeLedgerAdapter::new()),
            repo,
            false,
        )
    }

    #[tokio::test]
    async fn missing_price_data_yields_unknown() {
        let repo: Arc<dyn Repository> = Arc::new(InMemoryRepository::in_memory_only());
        let pool = pool(repo);
        let prices = PriceMap::new();
        let stats = calc(&pool, &prices).await;
        assert_eq!(stats.tvl, Figure::Unknown);
        assert_eq!(stats.apy_percent, Figure::Unknown);
    }

    #[tokio::test]
    async fn tvl_and_apy_compute_when_prices_and_volume_are_known() {
        let repo = Arc::new(InMemoryRepository::in_memory_only());
        repo.record_swap(SwapEventRow {
            pool_address: "pool1".into(),
            token_in: "tokenA".into(),
            token_out: "tokenB".into(),
            amount_in: U256::from(1_000_000_000u64),
            amount_out: U256::from(900_000_000u64),
            fee_collected: U256::from(3_000_000u64),
            user: "user1".into(),
            tx_hash: "tx1".into(),
            ts: chrono::Utc::now().timestamp(),
        })
        .await
        .unwrap();
        let repo: Arc<dyn Repository> = repo;
        let pool = pool(Arc::clone(&repo));
        pool.set_lp_token_address(Account("lp1".into()));
        let _ = pool.initialize().await;

        let mut prices = PriceMap::new();
        prices.insert("tokenA".into(), 1.0);
        prices.insert("tokenB".into(), 1.0);

        let stats = calc(&pool, &prices).await;
        assert!(stats.volume_24h.value().is_some());
        // Reserves are zero on a freshly-initialized fake pool, so TVL is
        // zero and APY reports unknown rather than dividing by zero.
        assert_eq!(stats.tvl, Figure::Value(0.0));
        assert_eq!(stats.apy_percent, Figure::Unknown);
    }

    #[tokio::test]
    async fn anchor_pool_volume_reads_the_anchor_table() {
        let repo = Arc::new(InMemoryRepository::in_memory_only());
        repo.record_anchor_swap(SwapEventRow {
            pool_address: "pool1".into(),
            token_in: "tokenA".into(),
            token_out: "tokenB".into(),
            amount_in: U256::from(1_000_000_000u64),
            amount_out: U256::from(900_000_000u64),
            fee_collected: U256::from(3_000_000u64),
            user: "user1".into(),
            tx_hash: "tx1".into(),
            ts: chrono::Utc::now().timestamp(),
        })
        .await
        .unwrap();
        let repo: Arc<dyn Repository> = repo;
        let config = CoordinatorConfig::default();
        let pool = Pool::new(
            Account("pool1".into()),
            Account("tokenA".into()),
            Account("tokenB".into()),
            Account("creator".into()),
            None,
            FeeConfig::anchor(100),
            Account(config.treasury_address.clone()),
            Duration::from_millis(config.settlement_delay_ms),
            config.default_slippage_percent,
            Arc::new(FakeLedgerAdapter::new()),
            repo,
            true,
        );

        let mut prices = PriceMap::new();
        prices.insert("tokenA".into(), 1.0);
        prices.insert("tokenB".into(), 1.0);

        let stats = calc(&pool, &prices).await;
        assert!(stats.volume_24h.value().is_some());
    }
}
