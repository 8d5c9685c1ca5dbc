//! Handler bodies for the HTTP surface (§4.8). Each handler is infallible at
//! the warp layer: the `Result<T>`-returning inner logic is run to
//! completion and then converted to a JSON reply with the matching status
//! code by [`error_reply`], never escalated to a warp `Rejection`.

use super::dto::*;
use crate::anchor::AnchorPool;
use crate::error::{CoordinatorError, Result};
use crate::history::HistoryEntry;
use crate::state::AppState;
use ledger::Account;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::reply::{json, with_status, Reply};

fn error_reply(err: &CoordinatorError) -> Box<dyn Reply> {
    Box::new(with_status(
        json(&ErrorResponse {
            error: format!("{err:?}"),
            message: err.to_string(),
        }),
        err.status_code(),
    ))
}

fn ok_reply<T: serde::Serialize>(body: &T) -> Box<dyn Reply> {
    Box::new(with_status(json(body), StatusCode::OK))
}

/// Runs `f` and converts its outcome to a reply — the shared tail of every
/// handler below.
fn respond<T: serde::Serialize>(result: Result<T>) -> Box<dyn Reply> {
    match result {
        Ok(body) => ok_reply(&body),
        Err(e) => error_reply(&e),
    }
}

fn account(state: &AppState, raw: &str) -> Result<Account> {
    Ok(state.adapter.account_from_address(raw)?)
}

pub async fn list_pools(state: Arc<AppState>) -> Result<Box<dyn Reply>, warp::Rejection> {
    let pools: Vec<PoolInfoResponse> = state.pool_manager.all_pools().iter().map(|p| p.as_ref().into()).collect();
    Ok(ok_reply(&pools))
}

pub async fn pool_stats(pool_address: String, state: Arc<AppState>) -> Result<Box<dyn Reply>, warp::Rejection> {
    let reply = async {
        let pool = state
            .pool_manager
            .get_pool_by_address(&pool_address)
            .ok_or_else(|| CoordinatorError::PoolNotFound(pool_address.clone()))?;
        pool.refresh_reserves().await?;
        let prices = state.prices.read().clone();
        let stats = crate::apy::calc(&pool, &prices).await;
        Ok::<_, CoordinatorError>(PoolStatsResponse {
            info: pool.as_ref().into(),
            stats,
        })
    }
    .await;
    Ok(respond(reply))
}

/// Standard pools take priority; when none cover the pair, the best active
/// anchor pool is offered instead (§4.6 — anchor pools are routable for
/// trading, not only for accruing liquidity).
pub async fn quote(body: QuoteRequest, state: Arc<AppState>) -> Result<Box<dyn Reply>, warp::Rejection> {
    let reply = async {
        let token_in = account(&state, &body.token_in)?;
        let token_out = account(&state, &body.token_out)?;
        let amount_in = parse_amount(&body.amount_in)?;

        let standard = state.pool_manager.swap_route(token_in.address(), token_out.address());
        let anchor = state.anchor_registry.best_active_route(token_in.address(), token_out.address());

        if let Some(pool) = standard {
            Ok::<_, CoordinatorError>(QuoteResponse::from(pool.quote(&token_in, amount_in).await?))
        } else if let Some(anchor) = anchor {
            Ok(QuoteResponse::from(anchor.pool.quote(&token_in, amount_in).await?))
        } else {
            Err(CoordinatorError::PoolNotFound(format!("{}/{}", body.token_in, body.token_out)))
        }
    }
    .await;
    Ok(respond(reply))
}

pub async fn swap_execute(body: SwapExecuteRequest, state: Arc<AppState>) -> Result<Box<dyn Reply>, warp::Rejection> {
    let reply = async {
        if let Some(slippage) = body.slippage_percent {
            validate_slippage(slippage)?;
        }
        // The seed-wallet path has no distinct signer account at this
        // architecture layer (§4.2 — the adapter is opaque to signer
        // identity); `userSeed` names the account the server holds keys
        // for, used as both `user_client` and `user`.
        let user = account(&state, &body.user_seed)?;
        let token_in = account(&state, &body.token_in)?;
        let token_out = account(&state, &body.token_out)?;
        let amount_in = parse_amount(&body.amount_in)?;
        let min_amount_out = parse_amount(&body.min_amount_out)?;
        let pool = state
            .pool_manager
            .swap_route(token_in.address(), token_out.address())
            .ok_or_else(|| CoordinatorError::PoolNotFound(format!("{}/{}", body.token_in, body.token_out)))?;
        let result = pool.swap(&user, &user, &token_in, amount_in, min_amount_out).await?;
        state.history.record(HistoryEntry {
            kind: "swap".to_string(),
            pool_address: pool.pool_address.address().to_string(),
            user: user.address().to_string(),
            detail: format!("{} {} -> {} {}", amount_in, body.token_in, result.amount_out, body.token_out),
            tx_hash: result.tx2_hash.clone(),
            ts: chrono::Utc::now().timestamp(),
        });
        Ok::<_, CoordinatorError>(SwapResponse::from(result))
    }
    .await;
    Ok(respond(reply))
}

pub async fn swap_complete(body: SwapCompleteRequest, state: Arc<AppState>) -> Result<Box<dyn Reply>, warp::Rejection> {
    let reply = async {
        let user = account(&state, &body.user_address)?;
        let token_out = account(&state, &body.token_out)?;
        let amount_out = parse_amount(&body.amount_out)?;
        let pool = state
            .pool_manager
            .get_pool_by_address(&body.pool_address)
            .ok_or_else(|| CoordinatorError::PoolNotFound(body.pool_address.clone()))?;
        let result = pool.complete_swap(&user, &token_out, amount_out).await?;
        Ok::<_, CoordinatorError>(SwapResponse::from(result))
    }
    .await;
    Ok(respond(reply))
}

pub async fn liquidity_add(body: LiquidityAddRequest, state: Arc<AppState>) -> Result<Box<dyn Reply>, warp::Rejection> {
    let reply = async {
        let token_a = account(&state, &body.token_a)?;
        let token_b = account(&state, &body.token_b)?;
        let creator = account(&state, &body.creator)?;
        let a_desired = parse_amount(&body.amount_a_desired)?;
        let b_desired = parse_amount(&body.amount_b_desired)?;
        let a_min = parse_amount(&body.a_min)?;
        let b_min = parse_amount(&body.b_min)?;

        let pool = match state.pool_manager.get_pool(token_a.address(), token_b.address()) {
            Some(pool) => pool,
            None => state.pool_manager.create_pool(&token_a, &token_b, &creator).await?,
        };

        if let Some(user_seed) = &body.user_seed {
            let user = account(&state, user_seed)?;
            let result = pool.add_liquidity(&user, &user, a_desired, b_desired, a_min, b_min).await?;
            Ok::<_, CoordinatorError>(LiquidityAddResponse::Completed(result.into()))
        } else if body.user_address.is_some() {
            Ok(LiquidityAddResponse::RequiresKeythingsLiquidity {
                requires_keythings_liquidity: true,
                pool_address: pool.pool_address.address().to_string(),
            })
        } else {
            Err(CoordinatorError::InvalidInput(
                "either userSeed or userAddress is required".to_string(),
            ))
        }
    }
    .await;
    Ok(respond(reply))
}

pub async fn liquidity_complete(body: LiquidityCompleteRequest, state: Arc<AppState>) -> Result<Box<dyn Reply>, warp::Rejection> {
    let reply = async {
        let user = account(&state, &body.user_address)?;
        let amount_a = parse_amount(&body.amount_a)?;
        let amount_b = parse_amount(&body.amount_b)?;
        let pool = state
            .pool_manager
            .get_pool_by_address(&body.pool_address)
            .ok_or_else(|| CoordinatorError::PoolNotFound(body.pool_address.clone()))?;
        let result = pool.complete_add_liquidity(&user, amount_a, amount_b).await?;
        Ok::<_, CoordinatorError>(LiquidityResponse::from(result))
    }
    .await;
    Ok(respond(reply))
}

pub async fn liquidity_remove_complete(
    body: LiquidityRemoveCompleteRequest,
    state: Arc<AppState>,
) -> Result<Box<dyn Reply>, warp::Rejection> {
    let reply = async {
        let user = account(&state, &body.user_address)?;
        let shares = parse_amount(&body.shares_to_burn)?;
        let a_min = parse_amount(&body.a_min)?;
        let b_min = parse_amount(&body.b_min)?;
        let pool = state
            .pool_manager
            .get_pool_by_address(&body.pool_address)
            .ok_or_else(|| CoordinatorError::PoolNotFound(body.pool_address.clone()))?;
        let result = pool.complete_remove_liquidity(&user, shares, a_min, b_min).await?;
        Ok::<_, CoordinatorError>(LiquidityResponse::from(result))
    }
    .await;
    Ok(respond(reply))
}

pub async fn liquidity_positions(user_address: String, state: Arc<AppState>) -> Result<Box<dyn Reply>, warp::Rejection> {
    let reply = async {
        let user = account(&state, &user_address)?;
        let positions = state.pool_manager.user_positions(&user).await?;
        let positions: Vec<PositionResponse> = positions.into_iter().map(Into::into).collect();
        Ok::<_, CoordinatorError>(positions)
    }
    .await;
    Ok(respond(reply))
}

pub async fn anchor_create(body: AnchorCreateRequest, state: Arc<AppState>) -> Result<Box<dyn Reply>, warp::Rejection> {
    let reply = async {
        let token_a = account(&state, &body.token_a)?;
        let token_b = account(&state, &body.token_b)?;
        let creator = account(&state, &body.creator)?;
        let anchor = state.anchor_registry.create_pool(&token_a, &token_b, &creator, body.fee_bps).await?;
        Ok::<_, CoordinatorError>(AnchorPoolResponse::from(anchor.as_ref()))
    }
    .await;
    Ok(respond(reply))
}

pub async fn anchor_mint_lp(body: AnchorMintLpRequest, state: Arc<AppState>) -> Result<Box<dyn Reply>, warp::Rejection> {
    let reply = async {
        let user = account(&state, &body.user_address)?;
        let a_desired = parse_amount(&body.amount_a_desired)?;
        let b_desired = parse_amount(&body.amount_b_desired)?;
        let a_min = parse_amount(&body.a_min)?;
        let b_min = parse_amount(&body.b_min)?;
        let anchor = find_anchor(&state, &body.pool_address)?;
        let result = anchor.pool.add_liquidity(&user, &user, a_desired, b_desired, a_min, b_min).await?;
        Ok::<_, CoordinatorError>(LiquidityResponse::from(result))
    }
    .await;
    Ok(respond(reply))
}

pub async fn anchor_update_fee(body: AnchorUpdateFeeRequest, state: Arc<AppState>) -> Result<Box<dyn Reply>, warp::Rejection> {
    let reply = async {
        let caller = account(&state, &body.caller)?;
        state.anchor_registry.update_fee(&caller, &body.pool_address, body.new_fee_bps).await?;
        let anchor = find_anchor(&state, &body.pool_address)?;
        Ok::<_, CoordinatorError>(AnchorPoolResponse::from(anchor.as_ref()))
    }
    .await;
    Ok(respond(reply))
}

pub async fn anchor_update_status(body: AnchorUpdateStatusRequest, state: Arc<AppState>) -> Result<Box<dyn Reply>, warp::Rejection> {
    let reply = async {
        let caller = account(&state, &body.caller)?;
        state
            .anchor_registry
            .update_status(&caller, &body.pool_address, body.new_status)
            .await?;
        let anchor = find_anchor(&state, &body.pool_address)?;
        Ok::<_, CoordinatorError>(AnchorPoolResponse::from(anchor.as_ref()))
    }
    .await;
    Ok(respond(reply))
}

pub async fn anchor_remove_liquidity(
    body: AnchorRemoveLiquidityRequest,
    state: Arc<AppState>,
) -> Result<Box<dyn Reply>, warp::Rejection> {
    let reply = async {
        let caller = account(&state, &body.caller)?;
        let shares = parse_amount(&body.shares_to_burn)?;
        let a_min = parse_amount(&body.a_min)?;
        let b_min = parse_amount(&body.b_min)?;
        let anchor = find_anchor(&state, &body.pool_address)?;
        let result = anchor.pool.remove_liquidity(&caller, &caller, shares, a_min, b_min).await?;
        Ok::<_, CoordinatorError>(LiquidityResponse::from(result))
    }
    .await;
    Ok(respond(reply))
}

pub async fn anchor_list(state: Arc<AppState>) -> Result<Box<dyn Reply>, warp::Rejection> {
    let pools: Vec<AnchorPoolResponse> = state.anchor_registry.all_pools().iter().map(|p| p.as_ref().into()).collect();
    Ok(ok_reply(&pools))
}

pub async fn anchor_by_creator(creator_address: String, state: Arc<AppState>) -> Result<Box<dyn Reply>, warp::Rejection> {
    let pools: Vec<AnchorPoolResponse> = state
        .anchor_registry
        .pools_by_creator(&creator_address)
        .iter()
        .map(|p| p.as_ref().into())
        .collect();
    Ok(ok_reply(&pools))
}

pub async fn anchor_by_address(pool_address: String, state: Arc<AppState>) -> Result<Box<dyn Reply>, warp::Rejection> {
    match find_anchor(&state, &pool_address) {
        Ok(anchor) => Ok(ok_reply(&AnchorPoolResponse::from(anchor.as_ref()))),
        Err(e) => Ok(error_reply(&e)),
    }
}

fn find_anchor(state: &AppState, pool_address: &str) -> Result<Arc<AnchorPool>> {
    state
        .anchor_registry
        .get_pool(pool_address)
        .ok_or_else(|| CoordinatorError::PoolNotFound(pool_address.to_string()))
}
