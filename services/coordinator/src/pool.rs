//! `Pool` (C4): one instance per token pair. Holds cached reserves and the
//! LP-token address, and implements the two-phase swap/liquidity protocol
//! (§4.4) against the ledger's `SEND_ON_BEHALF` permission model.

use crate::error::{CoordinatorError, Result};
use amm::{V2Math, U256};
use ledger::{Account, LedgerAdapter, LpTokenMetadata};
use parking_lot::RwLock;
use repository::{Repository, SwapEventRow};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{instrument, warn};

/// Permanent lock subtracted from the very first LP mint (§4.1, B3).
const MINIMUM_LIQUIDITY: u64 = 1_000;

/// Fee parameters for one pool. Standard pools use a fixed 30/5 split
/// (§6.5); anchor pools (§4.6) carry a creator-configurable `total_fee_bps`
/// with `protocol_fee_bps = 0` (all fee stays with the LPs).
#[derive(Debug, Clone, Copy)]
pub struct FeeConfig {
    pub total_fee_bps: u32,
    pub protocol_fee_bps: u32,
}

impl FeeConfig {
    pub const fn standard(total_fee_bps: u32, protocol_fee_bps: u32) -> Self {
        Self {
            total_fee_bps,
            protocol_fee_bps,
        }
    }

    pub const fn anchor(fee_bps: u32) -> Self {
        Self {
            total_fee_bps: fee_bps,
            protocol_fee_bps: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct QuoteResult {
    pub amount_out: U256,
    pub fee_amount: U256,
    pub price_impact_bps: u32,
    pub min_amount_out: U256,
}

#[derive(Debug, Clone)]
pub struct SwapResult {
    pub amount_in: U256,
    pub amount_out: U256,
    pub fee_amount: U256,
    pub tx1_hash: Option<String>,
    pub tx2_hash: String,
}

#[derive(Debug, Clone)]
pub struct LiquidityResult {
    pub amount_a: U256,
    pub amount_b: U256,
    pub shares: U256,
    pub tx1_hash: Option<String>,
}

/// Single-flight coalescing for `refresh_reserves` (§5): concurrent callers
/// wait on one in-flight refresh rather than issuing parallel ledger reads.
/// Eventually-consistent by design — a waiter that arrives just after the
/// in-flight refresh already started observes the result of *that* refresh,
/// not one it triggered itself, which is what "refresh reserves" means here.
#[derive(Debug, Default)]
struct RefreshGate {
    in_flight: AtomicBool,
    notify: Notify,
}

impl RefreshGate {
    async fn run<F, Fut>(&self, f: F) -> Result<()>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<()>>,
    {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            let result = f().await;
            self.in_flight.store(false, Ordering::Release);
            self.notify.notify_waiters();
            result
        } else {
            self.notify.notified().await;
            Ok(())
        }
    }
}

/// One pool instance (§3, §4.4). Shared across concurrent request handlers;
/// `reserves`/`lp_token_address`/`decimals_*`/`fee_config` use
/// [`parking_lot::RwLock`] rather than `std::sync::RwLock` for uncontended
/// fast-path reads, matching this workspace's cache conventions.
pub struct Pool {
    pub pool_address: Account,
    pub token_a: Account,
    pub token_b: Account,
    pub creator: Account,
    lp_token_address: RwLock<Option<Account>>,
    decimals_a: RwLock<u8>,
    decimals_b: RwLock<u8>,
    reserves: RwLock<(U256, U256)>,
    refresh_gate: RefreshGate,
    fee_config: RwLock<FeeConfig>,
    treasury: Account,
    settlement_delay: Duration,
    default_slippage_percent: f64,
    adapter: Arc<dyn LedgerAdapter>,
    repository: Arc<dyn Repository>,
    /// True for an anchor pool (§4.6): snapshots and swap events are
    /// recorded into the anchor mirror tables instead of the standard ones.
    is_anchor: bool,
}

impl Pool {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool_address: Account,
        token_a: Account,
        token_b: Account,
        creator: Account,
        lp_token_address: Option<Account>,
        fee_config: FeeConfig,
        treasury: Account,
        settlement_delay: Duration,
        default_slippage_percent: f64,
        adapter: Arc<dyn LedgerAdapter>,
        repository: Arc<dyn Repository>,
        is_anchor: bool,
    ) -> Self {
        Self {
            pool_address,
            token_a,
            token_b,
            creator,
            lp_token_address: RwLock::new(lp_token_address),
            decimals_a: RwLock::new(9),
            decimals_b: RwLock::new(9),
            reserves: RwLock::new((U256::zero(), U256::zero())),
            refresh_gate: RefreshGate::default(),
            fee_config: RwLock::new(fee_config),
            treasury,
            settlement_delay,
            default_slippage_percent,
            adapter,
            repository,
            is_anchor,
        }
    }

    pub fn is_anchor(&self) -> bool {
        self.is_anchor
    }

    pub fn lp_token_address(&self) -> Option<Account> {
        self.lp_token_address.read().clone()
    }

    pub fn set_lp_token_address(&self, address: Account) {
        *self.lp_token_address.write() = Some(address);
    }

    pub fn reserves(&self) -> (U256, U256) {
        *self.reserves.read()
    }

    pub fn decimals(&self) -> (u8, u8) {
        (*self.decimals_a.read(), *self.decimals_b.read())
    }

    pub fn fee_config(&self) -> FeeConfig {
        *self.fee_config.read()
    }

    pub fn set_fee_bps(&self, total_fee_bps: u32) {
        self.fee_config.write().total_fee_bps = total_fee_bps;
    }

    /// Exposes the repository handle for derived read paths (e.g. the APY
    /// calculator's `volume_24h` lookup) that don't belong on `Pool` itself.
    pub fn repository(&self) -> &Arc<dyn Repository> {
        &self.repository
    }

    /// Fetches decimals and reserves on first load (§4.5 `initialize`).
    /// Decimals default to 9 when metadata is absent or undecodable,
    /// matching the LP-token metadata convention (§4.2) of treating
    /// malformed/missing bytes as "unknown" rather than an error.
    pub async fn initialize(&self) -> Result<()> {
        *self.decimals_a.write() = self.fetch_decimals(&self.token_a).await;
        *self.decimals_b.write() = self.fetch_decimals(&self.token_b).await;
        self.refresh_reserves().await?;
        Ok(())
    }

    async fn fetch_decimals(&self, token: &Account) -> u8 {
        match self.adapter.account_info(token).await {
            Ok(info) => info
                .metadata
                .and_then(|bytes| serde_json::from_slice::<serde_json::Value>(&bytes).ok())
                .and_then(|v| v.get("decimals").and_then(|d| d.as_u64()))
                .map(|d| d as u8)
                .unwrap_or(9),
            Err(_) => 9,
        }
    }

    /// Reads `pool_address`'s balances of `token_a`/`token_b` and updates
    /// the cached reserves (R1). Single-flight; see [`RefreshGate`].
    pub async fn refresh_reserves(&self) -> Result<(U256, U256)> {
        self.refresh_gate.run(|| self.do_refresh()).await?;
        Ok(*self.reserves.read())
    }

    async fn do_refresh(&self) -> Result<()> {
        let balances = self.adapter.balances_of(&self.pool_address).await?;
        let mut reserve_a = U256::zero();
        let mut reserve_b = U256::zero();
        for balance in balances {
            if balance.token == self.token_a {
                reserve_a = balance.amount.into();
            } else if balance.token == self.token_b {
                reserve_b = balance.amount.into();
            }
        }
        *self.reserves.write() = (reserve_a, reserve_b);
        let snapshot = if self.is_anchor {
            self.repository.save_anchor_snapshot(self.pool_address.address(), reserve_a, reserve_b)
        } else {
            self.repository.save_snapshot(self.pool_address.address(), reserve_a, reserve_b)
        };
        if let Err(e) = snapshot.await {
            warn!(error = %e, pool = %self.pool_address, "snapshot write failed (non-critical, §4.3)");
        }
        Ok(())
    }

    fn reserve_pair(&self, token_in: &Account) -> Result<(U256, U256)> {
        let (reserve_a, reserve_b) = *self.reserves.read();
        if token_in == &self.token_a {
            Ok((reserve_a, reserve_b))
        } else if token_in == &self.token_b {
            Ok((reserve_b, reserve_a))
        } else {
            Err(CoordinatorError::InvalidInput(format!(
                "token {token_in} is not part of pool {}",
                self.pool_address
            )))
        }
    }

    fn other_token(&self, token_in: &Account) -> Result<Account> {
        if token_in == &self.token_a {
            Ok(self.token_b.clone())
        } else if token_in == &self.token_b {
            Ok(self.token_a.clone())
        } else {
            Err(CoordinatorError::InvalidInput(format!(
                "token {token_in} is not part of pool {}",
                self.pool_address
            )))
        }
    }

    /// Resolves the pool's LP token. If `lp_token_address` is not yet known
    /// (discovered-legacy edge, §4.4.4), scans `user`'s balances for a token
    /// whose metadata encodes `type = "LP_TOKEN"` and `pool =
    /// pool_address`, caching the result on success.
    async fn require_lp_token(&self, user: &Account) -> Result<Account> {
        if let Some(address) = self.lp_token_address.read().clone() {
            return Ok(address);
        }

        let balances = self.adapter.balances_of(user).await?;
        for balance in balances {
            let Ok(info) = self.adapter.account_info(&balance.token).await else {
                continue;
            };
            let Some(metadata) = info.metadata else { continue };
            let Some(lp_meta) = LpTokenMetadata::try_decode(&metadata) else {
                continue;
            };
            if lp_meta.pool == self.pool_address.address() {
                self.set_lp_token_address(balance.token.clone());
                return Ok(balance.token);
            }
        }

        Err(CoordinatorError::InvalidInput(format!(
            "pool {} has no LP token",
            self.pool_address
        )))
    }

    async fn lp_total_shares(&self, lp_token: &Account) -> Result<U256> {
        let info = self.adapter.account_info(lp_token).await?;
        Ok(info.supply.unwrap_or_default())
    }

    /// `quote` per §4.4.1: refreshes reserves, then a pure read.
    #[instrument(skip(self), fields(pool = %self.pool_address))]
    pub async fn quote(&self, token_in: &Account, amount_in: U256) -> Result<QuoteResult> {
        self.refresh_reserves().await?;
        let (reserve_in, reserve_out) = self.reserve_pair(token_in)?;
        let fee_config = *self.fee_config.read();
        let swap = V2Math::swap_output(amount_in, reserve_in, reserve_out, fee_config.total_fee_bps)
            .map_err(|e| match e {
                amm::MathError::EmptyReserves { .. } => CoordinatorError::InsufficientLiquidity,
                other => CoordinatorError::Math(other),
            })?;
        let min_amount_out = V2Math::min_amount_out(swap.amount_out, self.default_slippage_percent)?;
        Ok(QuoteResult {
            amount_out: swap.amount_out,
            fee_amount: swap.fee_amount,
            price_impact_bps: swap.price_impact_bps,
            min_amount_out,
        })
    }

    /// `swap` per §4.4.2, seed-wallet path: the server publishes both TX1
    /// and TX2. `user_client` is the seed-held account that signs TX1; the
    /// adapter is opaque to signer identity (§4.2), so it is carried only
    /// for audit logging here.
    #[instrument(skip(self, user_client), fields(pool = %self.pool_address, user = %user))]
    pub async fn swap(
        &self,
        user_client: &Account,
        user: &Account,
        token_in: &Account,
        amount_in: U256,
        min_amount_out: U256,
    ) -> Result<SwapResult> {
        let _ = user_client;
        let token_out = self.other_token(token_in)?;
        let quote = self.quote(token_in, amount_in).await?;
        if quote.amount_out < min_amount_out {
            return Err(CoordinatorError::SlippageExceeded {
                minimum: min_amount_out.to_string(),
                actual: quote.amount_out.to_string(),
            });
        }
        let fee_config = *self.fee_config.read();
        let (protocol_fee, amount_to_pool) = V2Math::fee_split(amount_in, fee_config.protocol_fee_bps)?;

        let mut tx1 = self.adapter.new_transaction();
        tx1.send(self.pool_address.clone(), amount_to_pool, token_in.clone(), None);
        if !protocol_fee.is_zero() {
            tx1.send(self.treasury.clone(), protocol_fee, token_in.clone(), None);
        }
        let tx1_result = self.adapter.publish(tx1).await?;

        tokio::time::sleep(self.settlement_delay).await;

        match self
            .execute_swap_tx2(user, token_in, &token_out, amount_in, quote.amount_out, quote.fee_amount)
            .await
        {
            Ok(mut result) => {
                result.tx1_hash = tx1_result.block_hashes.into_iter().next();
                Ok(result)
            }
            Err(e) => {
                warn!(error = %e, pool = %self.pool_address, "TX2 failed after TX1 settled; issuing refund (§7, S6)");
                self.refund(user, token_in, amount_to_pool).await?;
                Err(e)
            }
        }
    }

    /// TX2-only completion of a swap (§4.8 `/swap/keythings/complete`),
    /// user-signed-wallet path: the caller attests TX1 has already
    /// published. The attested payload carries only `tokenOut`/`amountOut`,
    /// so unlike the seed-wallet path no swap event is recorded here — there
    /// is no `amount_in`/`fee_amount` to log.
    #[instrument(skip(self), fields(pool = %self.pool_address, user = %user))]
    pub async fn complete_swap(
        &self,
        user: &Account,
        token_out: &Account,
        amount_out: U256,
    ) -> Result<SwapResult> {
        let mut tx2 = self.adapter.new_transaction();
        tx2.send(user.clone(), amount_out, token_out.clone(), Some(self.pool_address.clone()));
        let result = self.adapter.publish(tx2).await?;
        if let Err(e) = self.refresh_reserves().await {
            warn!(error = %e, pool = %self.pool_address, "reserve refresh after attested swap completion failed");
        }
        Ok(SwapResult {
            amount_in: U256::zero(),
            amount_out,
            fee_amount: U256::zero(),
            tx1_hash: None,
            tx2_hash: result.block_hashes.into_iter().next().unwrap_or_default(),
        })
    }

    async fn execute_swap_tx2(
        &self,
        user: &Account,
        token_in: &Account,
        token_out: &Account,
        amount_in: U256,
        amount_out: U256,
        fee_amount: U256,
    ) -> Result<SwapResult> {
        let mut tx2 = self.adapter.new_transaction();
        tx2.send(user.clone(), amount_out, token_out.clone(), Some(self.pool_address.clone()));
        let result = self.adapter.publish(tx2).await?;

        if let Err(e) = self.refresh_reserves().await {
            warn!(error = %e, pool = %self.pool_address, "reserve refresh after swap failed");
        }
        let row = SwapEventRow {
            pool_address: self.pool_address.address().to_string(),
            token_in: token_in.address().to_string(),
            token_out: token_out.address().to_string(),
            amount_in,
            amount_out,
            fee_collected: fee_amount,
            user: user.address().to_string(),
            tx_hash: result.block_hashes.first().cloned().unwrap_or_default(),
            ts: chrono::Utc::now().timestamp(),
        };
        let record = if self.is_anchor {
            self.repository.record_anchor_swap(row)
        } else {
            self.repository.record_swap(row)
        };
        if let Err(e) = record.await {
            warn!(error = %e, pool = %self.pool_address, "swap event log failed (non-critical, §4.3)");
        }

        Ok(SwapResult {
            amount_in,
            amount_out,
            fee_amount,
            tx1_hash: None,
            tx2_hash: result.block_hashes.into_iter().next().unwrap_or_default(),
        })
    }

    /// Refund path for a TX2 failure after TX1 already settled (§7, S6):
    /// returns `amount` of `token_in` from the pool back to `user`.
    #[instrument(skip(self), fields(pool = %self.pool_address, user = %user))]
    pub async fn refund(&self, user: &Account, token_in: &Account, amount: U256) -> Result<()> {
        let mut tx = self.adapter.new_transaction();
        tx.send(user.clone(), amount, token_in.clone(), Some(self.pool_address.clone()));
        self.adapter.publish(tx).await?;
        if let Err(e) = self.refresh_reserves().await {
            warn!(error = %e, pool = %self.pool_address, "reserve refresh after refund failed");
        }
        Ok(())
    }

    /// `add_liquidity` per §4.4.3, seed-wallet path.
    #[instrument(skip(self, user_client), fields(pool = %self.pool_address, user = %user))]
    pub async fn add_liquidity(
        &self,
        user_client: &Account,
        user: &Account,
        a_desired: U256,
        b_desired: U256,
        a_min: U256,
        b_min: U256,
    ) -> Result<LiquidityResult> {
        let _ = user_client;
        self.refresh_reserves().await?;
        let (reserve_a, reserve_b) = *self.reserves.read();
        let (a, b) = V2Math::optimal_liquidity(a_desired, b_desired, reserve_a, reserve_b)?;
        if a < a_min || b < b_min {
            return Err(CoordinatorError::SlippageExceeded {
                minimum: format!("{a_min}/{b_min}"),
                actual: format!("{a}/{b}"),
            });
        }

        let mut tx1 = self.adapter.new_transaction();
        tx1.send(self.pool_address.clone(), a, self.token_a.clone(), None);
        tx1.send(self.pool_address.clone(), b, self.token_b.clone(), None);
        let tx1_result = self.adapter.publish(tx1).await?;

        tokio::time::sleep(self.settlement_delay).await;

        let mut result = self.execute_add_liquidity_tx2(user, a, b).await?;
        result.tx1_hash = tx1_result.block_hashes.into_iter().next();
        Ok(result)
    }

    /// TX2-only completion (§4.8 `/liquidity/keythings/complete`): mints
    /// the LP shares for amounts the client attests it has already sent.
    pub async fn complete_add_liquidity(&self, user: &Account, a: U256, b: U256) -> Result<LiquidityResult> {
        self.execute_add_liquidity_tx2(user, a, b).await
    }

    async fn execute_add_liquidity_tx2(&self, user: &Account, a: U256, b: U256) -> Result<LiquidityResult> {
        let lp_token = self.require_lp_token(user).await?;
        let total_shares = self.lp_total_shares(&lp_token).await?;
        let (reserve_a, reserve_b) = *self.reserves.read();
        let shares = V2Math::lp_to_mint(a, b, reserve_a, reserve_b, total_shares, U256::from(MINIMUM_LIQUIDITY))?;
        if shares.is_zero() {
            return Err(CoordinatorError::InsufficientShares {
                requested: "0".to_string(),
                held: total_shares.to_string(),
            });
        }
        self.adapter.mint_supply(&lp_token, user, shares).await?;
        self.refresh_lp_hint(user, &lp_token).await;
        if let Err(e) = self.refresh_reserves().await {
            warn!(error = %e, pool = %self.pool_address, "reserve refresh after add_liquidity failed");
        }
        Ok(LiquidityResult {
            amount_a: a,
            amount_b: b,
            shares,
            tx1_hash: None,
        })
    }

    /// `remove_liquidity` per §4.4.4, seed-wallet path.
    #[instrument(skip(self, user_client), fields(pool = %self.pool_address, user = %user))]
    pub async fn remove_liquidity(
        &self,
        user_client: &Account,
        user: &Account,
        shares_to_burn: U256,
        a_min: U256,
        b_min: U256,
    ) -> Result<LiquidityResult> {
        let _ = user_client;
        let lp_token = self.require_lp_token(user).await?;

        let mut tx1 = self.adapter.new_transaction();
        tx1.send(lp_token.clone(), shares_to_burn, lp_token.clone(), None);
        let tx1_result = self.adapter.publish(tx1).await?;

        tokio::time::sleep(self.settlement_delay).await;

        let mut result = self
            .execute_remove_liquidity_tx2(user, shares_to_burn, a_min, b_min)
            .await?;
        result.tx1_hash = tx1_result.block_hashes.into_iter().next();
        Ok(result)
    }

    /// TX2-only completion (§4.8 `/liquidity/keythings/remove-complete`).
    pub async fn complete_remove_liquidity(
        &self,
        user: &Account,
        shares_to_burn: U256,
        a_min: U256,
        b_min: U256,
    ) -> Result<LiquidityResult> {
        self.execute_remove_liquidity_tx2(user, shares_to_burn, a_min, b_min).await
    }

    async fn execute_remove_liquidity_tx2(
        &self,
        user: &Account,
        shares_to_burn: U256,
        a_min: U256,
        b_min: U256,
    ) -> Result<LiquidityResult> {
        let lp_token = self.require_lp_token(user).await?;
        let total_shares = self.lp_total_shares(&lp_token).await?;
        let (reserve_a, reserve_b) = *self.reserves.read();
        let (a, b) = V2Math::burn_to_amounts(shares_to_burn, total_shares, reserve_a, reserve_b)?;
        if a < a_min || b < b_min {
            return Err(CoordinatorError::SlippageExceeded {
                minimum: format!("{a_min}/{b_min}"),
                actual: format!("{a}/{b}"),
            });
        }
        self.adapter.burn_supply(&lp_token, &lp_token, shares_to_burn).await?;

        let mut tx2 = self.adapter.new_transaction();
        tx2.send(user.clone(), a, self.token_a.clone(), Some(self.pool_address.clone()));
        tx2.send(user.clone(), b, self.token_b.clone(), Some(self.pool_address.clone()));
        self.adapter.publish(tx2).await?;

        self.refresh_lp_hint(user, &lp_token).await;
        if let Err(e) = self.refresh_reserves().await {
            warn!(error = %e, pool = %self.pool_address, "reserve refresh after remove_liquidity failed");
        }

        Ok(LiquidityResult {
            amount_a: a,
            amount_b: b,
            shares: shares_to_burn,
            tx1_hash: None,
        })
    }

    /// Best-effort refresh of the LP-position hint (§3) from the user's
    /// actual on-ledger LP-token balance, which remains the source of truth
    /// at read time regardless of what is cached here.
    async fn refresh_lp_hint(&self, user: &Account, lp_token: &Account) {
        match self.adapter.balances_of(user).await {
            Ok(balances) => {
                let shares = balances
                    .iter()
                    .find(|b| &b.token == lp_token)
                    .map(|b| U256::from(b.amount))
                    .unwrap_or_default();
                if let Err(e) = self
                    .repository
                    .save_lp_position_hint(self.pool_address.address(), user.address(), shares)
                    .await
                {
                    warn!(error = %e, pool = %self.pool_address, "lp position hint write failed (non-critical, §4.3)");
                }
            }
            Err(e) => warn!(error = %e, user = %user, "could not read LP balance to refresh position hint"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger::FakeLedgerAdapter;
    use repository::InMemoryRepository;

    fn test_pool(adapter: Arc<FakeLedgerAdapter>, repository: Arc<InMemoryRepository>) -> Pool {
        Pool::new(
            Account("pool1".into()),
            Account("tokenA".into()),
            Account("tokenB".into()),
            Account("creator".into()),
            Some(Account("lp1".into())),
            FeeConfig::standard(30, 5),
            Account("treasury".into()),
            Duration::from_millis(1),
            0.5,
            adapter,
            repository,
            false,
        )
    }

    #[tokio::test]
    async fn quote_matches_s1_literal_scenario() {
        let adapter = Arc::new(FakeLedgerAdapter::new());
        adapter.credit(&Account("pool1".into()), &Account("tokenA".into()), U256::from(1_000_000_000_000u64));
        adapter.credit(&Account("pool1".into()), &Account("tokenB".into()), U256::from(2_000_000_000_000u64));
        let repository = Arc::new(InMemoryRepository::in_memory_only());
        let pool = test_pool(adapter, repository);

        let quote = pool
            .quote(&Account("tokenA".into()), U256::from(10_000_000_000u64))
            .await
            .unwrap();
        assert_eq!(quote.fee_amount, U256::from(30_000_000u64));
    }

    #[tokio::test]
    async fn quote_on_empty_pool_fails_insufficient_liquidity() {
        let adapter = Arc::new(FakeLedgerAdapter::new());
        let repository = Arc::new(InMemoryRepository::in_memory_only());
        let pool = test_pool(adapter, repository);

        let err = pool
            .quote(&Account("tokenA".into()), U256::from(100))
            .await
            .unwrap_err();
        assert!(matches!(err, CoordinatorError::InsufficientLiquidity));
    }

    #[tokio::test]
    async fn swap_grows_reserves_and_pays_out_via_send_on_behalf() {
        let adapter = Arc::new(FakeLedgerAdapter::new());
        let pool_account = Account("pool1".into());
        let token_a = Account("tokenA".into());
        let token_b = Account("tokenB".into());
        adapter.credit(&pool_account, &token_a, U256::from(1_000_000_000_000u64));
        adapter.credit(&pool_account, &token_b, U256::from(2_000_000_000_000u64));
        adapter
            .create_storage_account("pool", "", true, &Account("operator".into()))
            .await
            .ok();
        // Grant the pool's SEND_ON_BEHALF to an implicit operator by reusing
        // create_storage_account's side effect against our existing pool
        // account id isn't possible post hoc, so grant directly instead.
        let mut tx = adapter.new_transaction();
        tx.update_permissions(pool_account.clone(), ledger::Permission::SendOnBehalf, true, None);
        adapter.publish(tx).await.unwrap();

        let repository = Arc::new(InMemoryRepository::in_memory_only());
        let pool = test_pool(adapter.clone(), repository);

        let user = Account("user1".into());
        let user_client = user.clone();
        let quote = pool.quote(&token_a, U256::from(10_000_000_000u64)).await.unwrap();
        let result = pool
            .swap(&user_client, &user, &token_a, U256::from(10_000_000_000u64), quote.min_amount_out)
            .await
            .unwrap();

        assert_eq!(result.amount_out, quote.amount_out);
        let (reserve_a, reserve_b) = pool.reserves();
        assert!(reserve_a > U256::from(1_000_000_000_000u64));
        assert!(reserve_b < U256::from(2_000_000_000_000u64));
    }

    #[tokio::test]
    async fn swap_failing_tx2_triggers_refund() {
        let adapter = Arc::new(FakeLedgerAdapter::new());
        let pool_account = Account("pool1".into());
        let token_a = Account("tokenA".into());
        let token_b = Account("tokenB".into());
        adapter.credit(&pool_account, &token_a, U256::from(1_000_000_000_000u64));
        adapter.credit(&pool_account, &token_b, U256::from(2_000_000_000_000u64));
        let mut tx = adapter.new_transaction();
        tx.update_permissions(pool_account.clone(), ledger::Permission::SendOnBehalf, true, None);
        adapter.publish(tx).await.unwrap();

        let repository = Arc::new(InMemoryRepository::in_memory_only());
        let pool = test_pool(adapter.clone(), repository);

        let user = Account("user1".into());
        adapter.force_next_publish_to_fail(&user, "simulated TX2 rejection");

        let quote = pool.quote(&token_a, U256::from(10_000_000_000u64)).await.unwrap();
        let err = pool
            .swap(&user, &user, &token_a, U256::from(10_000_000_000u64), quote.min_amount_out)
            .await
            .unwrap_err();
        assert!(matches!(err, CoordinatorError::Ledger(_)));

        // Refund returned amount_to_pool (9995bps of amount_in) to the user.
        let balances = adapter.balances_of(&user).await.unwrap();
        let refunded = balances.iter().find(|b| b.token == token_a).unwrap();
        assert_eq!(U256::from(refunded.amount), U256::from(9_995_000_000u64));
    }

    #[tokio::test]
    async fn add_then_remove_liquidity_round_trips() {
        let adapter = Arc::new(FakeLedgerAdapter::new());
        let pool_account = Account("pool1".into());
        let token_a = Account("tokenA".into());
        let token_b = Account("tokenB".into());
        let lp_token = Account("lp1".into());
        adapter.credit(&pool_account, &token_a, U256::from(1_000_000u64));
        adapter.credit(&pool_account, &token_b, U256::from(4_000_000u64));
        let mut tx = adapter.new_transaction();
        tx.update_permissions(pool_account.clone(), ledger::Permission::SendOnBehalf, true, None);
        adapter.publish(tx).await.unwrap();

        let repository = Arc::new(InMemoryRepository::in_memory_only());
        let pool = Pool::new(
            pool_account.clone(),
            token_a.clone(),
            token_b.clone(),
            Account("creator".into()),
            Some(lp_token.clone()),
            FeeConfig::standard(30, 5),
            Account("treasury".into()),
            Duration::from_millis(1),
            0.5,
            adapter.clone(),
            repository,
            false,
        );

        // Seed existing LP supply so total_shares != 0 for a proportional mint.
        adapter.mint_supply(&lp_token, &Account("lp_seed".into()), U256::from(2_000_000u64)).await.unwrap();

        let user = Account("user1".into());
        let added = pool
            .add_liquidity(&user, &user, U256::from(500_000u64), U256::from(10_000_000u64), U256::zero(), U256::zero())
            .await
            .unwrap();
        assert_eq!(added.amount_a, U256::from(500_000u64));
        assert_eq!(added.amount_b, U256::from(2_000_000u64));
        assert!(!added.shares.is_zero());

        let removed = pool
            .remove_liquidity(&user, &user, added.shares, U256::zero(), U256::zero())
            .await
            .unwrap();
        assert_eq!(removed.amount_a, added.amount_a);
    }

    /// Discovered-legacy edge (§4.4.4): a pool instance with no cached
    /// `lp_token_address` still resolves removal against the user's
    /// LP-token balance by scanning its metadata.
    #[tokio::test]
    async fn remove_liquidity_discovers_lp_token_from_user_balance_when_unknown() {
        let adapter = Arc::new(FakeLedgerAdapter::new());
        let pool_account = Account("pool1".into());
        let token_a = Account("tokenA".into());
        let token_b = Account("tokenB".into());
        adapter.credit(&pool_account, &token_a, U256::from(1_000_000u64));
        adapter.credit(&pool_account, &token_b, U256::from(4_000_000u64));
        let mut tx = adapter.new_transaction();
        tx.update_permissions(pool_account.clone(), ledger::Permission::SendOnBehalf, true, None);
        adapter.publish(tx).await.unwrap();

        let lp_token = adapter.create_lp_token(&pool_account, &token_a, &token_b).await.unwrap();

        let repository = Arc::new(InMemoryRepository::in_memory_only());
        let pool = Pool::new(
            pool_account.clone(),
            token_a.clone(),
            token_b.clone(),
            Account("creator".into()),
            None, // lp_token_address unknown, as for a discovered pool (§4.5)
            FeeConfig::standard(30, 5),
            Account("treasury".into()),
            Duration::from_millis(1),
            0.5,
            adapter.clone(),
            repository,
            false,
        );

        let user = Account("user1".into());
        adapter.mint_supply(&lp_token, &user, U256::from(1_000_000u64)).await.unwrap();

        let removed = pool
            .remove_liquidity(&user, &user, U256::from(500_000u64), U256::zero(), U256::zero())
            .await
            .unwrap();
        assert_eq!(removed.amount_a, U256::from(500_000u64));
        assert_eq!(pool.lp_token_address(), Some(lp_token));
    }

    #[tokio::test]
    async fn anchor_pool_records_snapshots_and_swaps_in_anchor_tables() {
        let adapter = Arc::new(FakeLedgerAdapter::new());
        let pool_account = Account("pool1".into());
        let token_a = Account("tokenA".into());
        let token_b = Account("tokenB".into());
        adapter.credit(&pool_account, &token_a, U256::from(1_000_000_000_000u64));
        adapter.credit(&pool_account, &token_b, U256::from(2_000_000_000_000u64));
        let mut tx = adapter.new_transaction();
        tx.update_permissions(pool_account.clone(), ledger::Permission::SendOnBehalf, true, None);
        adapter.publish(tx).await.unwrap();

        let repository = Arc::new(InMemoryRepository::in_memory_only());
        let pool = Pool::new(
            pool_account.clone(),
            token_a.clone(),
            token_b.clone(),
            Account("creator".into()),
            Some(Account("lp1".into())),
            FeeConfig::anchor(100),
            Account("treasury".into()),
            Duration::from_millis(1),
            0.5,
            adapter.clone(),
            repository.clone(),
            true,
        );

        let user = Account("user1".into());
        let quote = pool.quote(&token_a, U256::from(10_000_000_000u64)).await.unwrap();
        pool.swap(&user, &user, &token_a, U256::from(10_000_000_000u64), quote.min_amount_out)
            .await
            .unwrap();

        let anchor_volume = repository.anchor_volume_24h(pool_account.address()).await.unwrap();
        assert!(!anchor_volume.volume_in.is_zero());
        let standard_volume = repository.volume_24h(pool_account.address()).await.unwrap();
        assert!(standard_volume.volume_in.is_zero());
    }
}
