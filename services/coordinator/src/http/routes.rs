//! Route composition for the HTTP surface (§4.8), in the `warp::path(...)
//! .and(...).and_then(handler)` idiom already used by this workspace's
//! dashboard server.

use super::handlers;
use crate::error::CoordinatorError;
use crate::state::AppState;
use std::sync::Arc;
use warp::Filter;

fn with_state(
    state: Arc<AppState>,
) -> impl Filter<Extract = (Arc<AppState>,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || Arc::clone(&state))
}

/// Rejects with a 429 body once the global inbound budget (§10 ambient
/// resilience) is spent, without escalating to a warp `Rejection` — kept
/// consistent with every other handler's always-`Ok` reply style.
fn rate_limited(
    state: Arc<AppState>,
) -> impl Filter<Extract = (), Error = warp::Rejection> + Clone {
    warp::any()
        .and(with_state(state))
        .and_then(|state: Arc<AppState>| async move {
            if state.rate_limiter.check() {
                Ok(())
            } else {
                Err(warp::reject::custom(RateLimitedRejection))
            }
        })
        .untuple_one()
}

#[derive(Debug)]
struct RateLimitedRejection;
impl warp::reject::Reject for RateLimitedRejection {}

async fn handle_rejection(err: warp::Rejection) -> Result<Box<dyn warp::Reply>, std::convert::Infallible> {
    let (status, message) = if err.find::<RateLimitedRejection>().is_some() {
        (warp::http::StatusCode::TOO_MANY_REQUESTS, CoordinatorError::RateLimited.to_string())
    } else if err.is_not_found() {
        (warp::http::StatusCode::NOT_FOUND, "no such route".to_string())
    } else if err.find::<warp::filters::body::BodyDeserializeError>().is_some() {
        (warp::http::StatusCode::BAD_REQUEST, "malformed request body".to_string())
    } else {
        (warp::http::StatusCode::INTERNAL_SERVER_ERROR, "unhandled rejection".to_string())
    };
    let body = serde_json::json!({ "error": format!("{status}"), "message": message });
    Ok(Box::new(warp::reply::with_status(warp::reply::json(&body), status)))
}

fn json_body<T>() -> impl Filter<Extract = (T,), Error = warp::Rejection> + Clone
where
    T: serde::de::DeserializeOwned + Send,
{
    warp::body::content_length_limit(64 * 1024).and(warp::body::json())
}

/// Builds the full composed filter for the coordinator's HTTP surface.
/// CORS is applied by the caller (`main`) per §10, mirroring the
/// dashboard server's `enable_cors` toggle.
pub fn build_routes(
    state: Arc<AppState>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = std::convert::Infallible> + Clone {
    let health = warp::path("health").map(|| warp::reply::with_status("OK", warp::http::StatusCode::OK));

    let list_pools = warp::path("pools")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handlers::list_pools);

    let pool_stats = warp::path!("pools" / String / "stats")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handlers::pool_stats);

    let quote = warp::path("quote")
        .and(warp::path::end())
        .and(warp::post())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(handlers::quote);

    let swap_execute = warp::path!("swap" / "execute")
        .and(warp::post())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(handlers::swap_execute);

    let swap_complete = warp::path!("swap" / "keythings" / "complete")
        .and(warp::post())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(handlers::swap_complete);

    let liquidity_add = warp::path!("liquidity" / "add")
        .and(warp::post())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(handlers::liquidity_add);

    let liquidity_complete = warp::path!("liquidity" / "keythings" / "complete")
        .and(warp::post())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(handlers::liquidity_complete);

    let liquidity_remove_complete = warp::path!("liquidity" / "keythings" / "remove-complete")
        .and(warp::post())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(handlers::liquidity_remove_complete);

    let liquidity_positions = warp::path!("liquidity" / "positions" / String)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handlers::liquidity_positions);

    let anchor_create = warp::path!("anchor-pools" / "create")
        .and(warp::post())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(handlers::anchor_create);

    let anchor_mint_lp = warp::path!("anchor-pools" / "mint-lp")
        .and(warp::post())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(handlers::anchor_mint_lp);

    let anchor_update_fee = warp::path!("anchor-pools" / "update-fee")
        .and(warp::post())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(handlers::anchor_update_fee);

    let anchor_update_status = warp::path!("anchor-pools" / "update-status")
        .and(warp::post())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(handlers::anchor_update_status);

    let anchor_remove_liquidity = warp::path!("anchor-pools" / "remove-liquidity")
        .and(warp::post())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(handlers::anchor_remove_liquidity);

    let anchor_list = warp::path("anchor-pools")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handlers::anchor_list);

    let anchor_by_creator = warp::path!("anchor-pools" / "creator" / String)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handlers::anchor_by_creator);

    let anchor_by_address = warp::path!("anchor-pools" / String)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handlers::anchor_by_address);

    let posts = rate_limited(state.clone()).and(
        quote
            .or(swap_execute)
            .or(swap_complete)
            .or(liquidity_add)
            .or(liquidity_complete)
            .or(liquidity_remove_complete)
            .or(anchor_create)
            .or(anchor_mint_lp)
            .or(anchor_update_fee)
            .or(anchor_update_status)
            .or(anchor_remove_liquidity),
    );

    let gets = health
        .or(list_pools)
        .or(pool_stats)
        .or(liquidity_positions)
        .or(anchor_list)
        .or(anchor_by_creator)
        .or(anchor_by_address);

    gets.or(posts).recover(handle_rejection)
}
