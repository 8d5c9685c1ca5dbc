//! Coordinator configuration (§10.3): env-driven with sane defaults, so a
//! bare `from_env()` in a test environment still produces a usable (if
//! non-production) configuration. `validate()` rejects obviously unusable
//! values.

use serde::{Deserialize, Serialize};
use std::env;

/// Top-level coordinator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// HTTP bind address, e.g. `127.0.0.1`.
    pub bind_address: String,
    /// HTTP bind port.
    pub port: u16,

    /// Ledger RPC endpoint the production adapter connects to.
    pub ledger_rpc_url: String,
    /// Deadline for a single ledger call, in milliseconds (§5).
    pub ledger_call_timeout_ms: u64,

    /// Address of the treasury account that receives the protocol-fee leg
    /// of TX1 (§4.4.2).
    pub treasury_address: String,

    /// Directory for the repository's journal file and the file-fallback
    /// pool index (§6.4).
    pub data_dir: String,

    /// Default slippage tolerance applied to quotes, as a percentage
    /// (§4.4.1, default 0.5%).
    pub default_slippage_percent: f64,

    /// TX1->TX2 settlement delay lower bound, in milliseconds (§4.4.2, §9 Q2).
    pub settlement_delay_ms: u64,

    /// Total swap fee for standard pools, in basis points (§6.5, default 30).
    pub standard_fee_bps: u32,
    /// Protocol-fee share of `standard_fee_bps` routed to the treasury
    /// (§6.5, default 5).
    pub protocol_fee_bps: u32,

    /// Candidate pool addresses for background discovery (§4.5.3, §9 Q3).
    /// Empty by default; the mechanism is retained as a configuration hook.
    pub discovery_candidates: Vec<String>,
    /// Delay before the first background discovery pass after startup, in
    /// seconds (§4.5, default 5s).
    pub discovery_startup_delay_secs: u64,
    /// Maximum number of concurrent discovery reads (§11 bounded discovery).
    pub discovery_concurrency: usize,

    /// Log format: `"pretty"` or `"json"`.
    pub log_format: String,

    /// Global inbound request budget for the HTTP surface, in requests per
    /// minute. 0 disables the limiter.
    pub rate_limit_per_minute: u32,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 8787,
            ledger_rpc_url: "http://127.0.0.1:9999".to_string(),
            ledger_call_timeout_ms: 10_000,
            treasury_address: "treasury".to_string(),
            data_dir: "./data".to_string(),
            default_slippage_percent: 0.5,
            settlement_delay_ms: 1_000,
            standard_fee_bps: 30,
            protocol_fee_bps: 5,
            discovery_candidates: Vec::new(),
            discovery_startup_delay_secs: 5,
            discovery_concurrency: 8,
            log_format: "pretty".to_string(),
            rate_limit_per_minute: 600,
        }
    }
}

impl CoordinatorConfig {
    /// Loads configuration from environment variables, falling back to
    /// [`Default`] for anything unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_address: env::var("COORDINATOR_BIND_ADDRESS").unwrap_or(defaults.bind_address),
            port: env::var("COORDINATOR_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            ledger_rpc_url: env::var("LEDGER_RPC_URL").unwrap_or(defaults.ledger_rpc_url),
            ledger_call_timeout_ms: env::var("LEDGER_CALL_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.ledger_call_timeout_ms),
            treasury_address: env::var("TREASURY_ADDRESS").unwrap_or(defaults.treasury_address),
            data_dir: env::var("COORDINATOR_DATA_DIR").unwrap_or(defaults.data_dir),
            default_slippage_percent: env::var("DEFAULT_SLIPPAGE_PERCENT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.default_slippage_percent),
            settlement_delay_ms: env::var("SETTLEMENT_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.settlement_delay_ms),
            standard_fee_bps: env::var("STANDARD_FEE_BPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.standard_fee_bps),
            protocol_fee_bps: env::var("PROTOCOL_FEE_BPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.protocol_fee_bps),
            discovery_candidates: env::var("DISCOVERY_CANDIDATES")
                .map(|s| s.split(',').filter(|s| !s.is_empty()).map(String::from).collect())
                .unwrap_or(defaults.discovery_candidates),
            discovery_startup_delay_secs: env::var("DISCOVERY_STARTUP_DELAY_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.discovery_startup_delay_secs),
            discovery_concurrency: env::var("DISCOVERY_CONCURRENCY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.discovery_concurrency),
            log_format: env::var("LOG_FORMAT").unwrap_or(defaults.log_format),
            rate_limit_per_minute: env::var("RATE_LIMIT_PER_MINUTE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.rate_limit_per_minute),
        }
    }

    /// Rejects obviously unusable configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.bind_address.is_empty() {
            return Err("bind address cannot be empty".to_string());
        }
        if self.port == 0 {
            return Err("port must be greater than 0".to_string());
        }
        if self.ledger_rpc_url.is_empty() {
            return Err("ledger RPC URL cannot be empty".to_string());
        }
        if self.treasury_address.is_empty() {
            return Err("treasury address cannot be empty".to_string());
        }
        if !(0.0..=50.0).contains(&self.default_slippage_percent) {
            return Err("default slippage percent must be within [0, 50]".to_string());
        }
        if self.standard_fee_bps > 5_000 {
            return Err("standard fee bps out of range".to_string());
        }
        if self.protocol_fee_bps > self.standard_fee_bps {
            return Err("protocol fee cannot exceed the total standard fee".to_string());
        }
        if self.discovery_concurrency == 0 {
            return Err("discovery concurrency must be greater than 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(CoordinatorConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_protocol_fee_above_total() {
        let mut config = CoordinatorConfig::default();
        config.protocol_fee_bps = config.standard_fee_bps + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_slippage() {
        let mut config = CoordinatorConfig::default();
        config.default_slippage_percent = 75.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn from_env_reads_overrides() {
        env::set_var("COORDINATOR_PORT", "9000");
        let config = CoordinatorConfig::from_env();
        assert_eq!(config.port, 9000);
        env::remove_var("COORDINATOR_PORT");
    }
}
