//! Request/response bodies for the HTTP surface (§4.8). Amounts are decimal
//! strings of atomic units except where a `-human` suffix is documented.

use crate::anchor::AnchorPool;
use crate::apy::PoolStats;
use crate::error::CoordinatorError;
use crate::pool::{LiquidityResult, Pool, QuoteResult, SwapResult};
use crate::pool_manager::Position;
use primitive_types::U256;
use repository::AnchorStatus;
use serde::{Deserialize, Serialize};

/// Parses a non-negative decimal string of atomic units (§4.8 validation).
pub fn parse_amount(raw: &str) -> Result<U256, CoordinatorError> {
    if raw.starts_with('-') {
        return Err(CoordinatorError::InvalidInput(format!("amount must be non-negative: {raw}")));
    }
    U256::from_dec_str(raw).map_err(|e| CoordinatorError::InvalidInput(format!("invalid amount {raw}: {e}")))
}

pub fn validate_slippage(percent: f64) -> Result<(), CoordinatorError> {
    if !(0.0..=50.0).contains(&percent) {
        return Err(CoordinatorError::InvalidInput(format!(
            "slippagePercent {percent} out of range [0, 50]"
        )));
    }
    Ok(())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolInfoResponse {
    pub pool_address: String,
    pub token_a: String,
    pub token_b: String,
    pub lp_token_address: Option<String>,
    pub reserve_a: String,
    pub reserve_b: String,
    pub fee_bps: u32,
    pub protocol_fee_bps: u32,
}

impl From<&Pool> for PoolInfoResponse {
    fn from(pool: &Pool) -> Self {
        let (reserve_a, reserve_b) = pool.reserves();
        let fee_config = pool.fee_config();
        Self {
            pool_address: pool.pool_address.address().to_string(),
            token_a: pool.token_a.address().to_string(),
            token_b: pool.token_b.address().to_string(),
            lp_token_address: pool.lp_token_address().map(|a| a.address().to_string()),
            reserve_a: reserve_a.to_string(),
            reserve_b: reserve_b.to_string(),
            fee_bps: fee_config.total_fee_bps,
            protocol_fee_bps: fee_config.protocol_fee_bps,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolStatsResponse {
    #[serde(flatten)]
    pub info: PoolInfoResponse,
    #[serde(flatten)]
    pub stats: PoolStats,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub token_in: String,
    pub token_out: String,
    pub amount_in: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    pub amount_out: String,
    pub fee_amount: String,
    pub price_impact_bps: u32,
    pub min_amount_out: String,
}

impl From<QuoteResult> for QuoteResponse {
    fn from(quote: QuoteResult) -> Self {
        Self {
            amount_out: quote.amount_out.to_string(),
            fee_amount: quote.fee_amount.to_string(),
            price_impact_bps: quote.price_impact_bps,
            min_amount_out: quote.min_amount_out.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapResponse {
    pub amount_in: String,
    pub amount_out: String,
    pub fee_amount: String,
    pub tx1_hash: Option<String>,
    pub tx2_hash: String,
}

impl From<SwapResult> for SwapResponse {
    fn from(result: SwapResult) -> Self {
        Self {
            amount_in: result.amount_in.to_string(),
            amount_out: result.amount_out.to_string(),
            fee_amount: result.fee_amount.to_string(),
            tx1_hash: result.tx1_hash,
            tx2_hash: result.tx2_hash,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidityResponse {
    pub amount_a: String,
    pub amount_b: String,
    pub shares: String,
    pub tx1_hash: Option<String>,
}

impl From<LiquidityResult> for LiquidityResponse {
    fn from(result: LiquidityResult) -> Self {
        Self {
            amount_a: result.amount_a.to_string(),
            amount_b: result.amount_b.to_string(),
            shares: result.shares.to_string(),
            tx1_hash: result.tx1_hash,
        }
    }
}

/// `POST /swap/execute` (seed-wallet path, §4.8).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapExecuteRequest {
    pub user_seed: String,
    pub token_in: String,
    pub token_out: String,
    pub amount_in: String,
    pub min_amount_out: String,
    #[serde(default)]
    pub slippage_percent: Option<f64>,
}

/// `POST /swap/keythings/complete` (user-signed-wallet path, §4.8).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapCompleteRequest {
    pub user_address: String,
    pub pool_address: String,
    pub token_out: String,
    pub amount_out: String,
}

/// `POST /liquidity/add`. `user_seed` selects the seed-wallet path (both TX
/// performed here); `user_address` selects the user-signed-wallet path
/// (TX1 must be signed client-side — the response signals that).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidityAddRequest {
    pub token_a: String,
    pub token_b: String,
    pub amount_a_desired: String,
    pub amount_b_desired: String,
    pub a_min: String,
    pub b_min: String,
    pub creator: String,
    pub user_seed: Option<String>,
    pub user_address: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum LiquidityAddResponse {
    Completed(LiquidityResponse),
    RequiresKeythingsLiquidity {
        #[serde(rename = "requiresKeythingsLiquidity")]
        requires_keythings_liquidity: bool,
        #[serde(rename = "poolAddress")]
        pool_address: String,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidityCompleteRequest {
    pub user_address: String,
    pub pool_address: String,
    pub amount_a: String,
    pub amount_b: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidityRemoveCompleteRequest {
    pub user_address: String,
    pub pool_address: String,
    pub shares_to_burn: String,
    pub a_min: String,
    pub b_min: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionResponse {
    pub pool_address: String,
    pub token_a: String,
    pub token_b: String,
    pub shares: String,
    pub amount_a: String,
    pub amount_b: String,
    pub share_bps: u64,
}

impl From<Position> for PositionResponse {
    fn from(position: Position) -> Self {
        Self {
            pool_address: position.pool_address,
            token_a: position.token_a,
            token_b: position.token_b,
            shares: position.shares.to_string(),
            amount_a: position.amount_a.to_string(),
            amount_b: position.amount_b.to_string(),
            share_bps: position.share_bps,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorCreateRequest {
    pub token_a: String,
    pub token_b: String,
    pub creator: String,
    pub fee_bps: u32,
}

/// `POST /anchor-pools/mint-lp`: a single-shot add-liquidity against an
/// anchor pool (the creator-operated back-office path — no two-phase
/// keythings handoff is exposed for anchor pools).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorMintLpRequest {
    pub pool_address: String,
    pub user_address: String,
    pub amount_a_desired: String,
    pub amount_b_desired: String,
    pub a_min: String,
    pub b_min: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorUpdateFeeRequest {
    pub pool_address: String,
    pub caller: String,
    pub new_fee_bps: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorUpdateStatusRequest {
    pub pool_address: String,
    pub caller: String,
    pub new_status: AnchorStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorRemoveLiquidityRequest {
    pub pool_address: String,
    pub caller: String,
    pub shares_to_burn: String,
    pub a_min: String,
    pub b_min: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorPoolResponse {
    pub pool_address: String,
    pub token_a: String,
    pub token_b: String,
    pub creator: String,
    pub fee_bps: u32,
    pub status: AnchorStatus,
    pub reserve_a: String,
    pub reserve_b: String,
}

impl From<&AnchorPool> for AnchorPoolResponse {
    fn from(anchor: &AnchorPool) -> Self {
        let (reserve_a, reserve_b) = anchor.pool.reserves();
        Self {
            pool_address: anchor.pool.pool_address.address().to_string(),
            token_a: anchor.pool.token_a.address().to_string(),
            token_b: anchor.pool.token_b.address().to_string(),
            creator: anchor.pool.creator.address().to_string(),
            fee_bps: anchor.fee_bps(),
            status: anchor.status(),
            reserve_a: reserve_a.to_string(),
            reserve_b: reserve_b.to_string(),
        }
    }
}
