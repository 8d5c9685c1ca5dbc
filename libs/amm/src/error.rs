//! Error types for AMM math

use thiserror::Error;

/// Errors raised by the pure AMM math functions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MathError {
    /// `swap_output` called against a pool with zero reserves on either side.
    #[error("empty reserves: reserve_in={reserve_in}, reserve_out={reserve_out}")]
    EmptyReserves {
        reserve_in: String,
        reserve_out: String,
    },

    /// A fee or slippage value fell outside its allowed range.
    #[error("fee/slippage {value} out of range [{min}, {max}]")]
    OutOfRange { value: u32, min: u32, max: u32 },

    /// `calculate_input_amount` was asked for an output at or above the
    /// available reserve; no finite input achieves it.
    #[error("requested output {amount_out} meets or exceeds reserve_out {reserve_out}")]
    InsufficientLiquidity {
        amount_out: String,
        reserve_out: String,
    },

    /// Total supply is zero but a proportional (non-first) deposit or a
    /// burn was requested.
    #[error("total shares is zero")]
    ZeroTotalShares,
}
