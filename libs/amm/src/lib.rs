//! # AMM Math — Precise Constant-Product DEX Mathematics
//!
//! ## Purpose
//!
//! Pure, allocation-free mathematics for a constant-product ("x*y=k") AMM
//! operating on unsigned 256-bit integers. No floating point and no decimal
//! approximation anywhere in this crate: every amount is an atomic-unit
//! integer, and every division rounds toward zero unless documented
//! otherwise. This is the single place in the coordinator that computes
//! swap outputs, fee splits, optimal deposit ratios, LP-share minting and
//! burning, and slippage bounds.
//!
//! ## Integration points
//!
//! - **Callers**: `Pool::quote`, `Pool::swap`, `Pool::add_liquidity`,
//!   `Pool::remove_liquidity` in the coordinator service.
//! - **Inputs**: cached reserves and fee parameters, never ledger state
//!   directly — this crate has no I/O.
//! - **Precision**: `primitive-types::U256`, the same big-integer family
//!   already used at the ledger-adapter boundary.

pub mod error;
pub mod v2_math;

pub use error::MathError;
pub use v2_math::V2Math;

pub use primitive_types::U256;
