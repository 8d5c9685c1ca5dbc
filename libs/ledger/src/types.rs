//! Value types shared across the ledger adapter boundary.

use primitive_types::U256;
use serde::{Deserialize, Serialize};

/// An account on the ledger, derived from a public-key address string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Account(pub String);

impl Account {
    pub fn address(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A permission grantable on a storage account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    /// Holder may transfer any asset out of the subject account in a
    /// transaction the holder itself signs.
    SendOnBehalf,
    /// Holder may deposit into the subject storage account.
    StorageDeposit,
    /// Subject storage account is permitted to hold the given asset.
    StorageCanHold,
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Permission::SendOnBehalf => "SEND_ON_BEHALF",
            Permission::StorageDeposit => "STORAGE_DEPOSIT",
            Permission::StorageCanHold => "STORAGE_CAN_HOLD",
        };
        write!(f, "{s}")
    }
}

/// A balance of one token held by an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub token: TokenId,
    pub amount: U256Wrapper,
}

/// Token identifier — the token's own account address.
pub type TokenId = Account;

/// `U256` newtype carrying `serde` support via string encoding, so large
/// amounts survive JSON round-trips without precision loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct U256Wrapper(pub U256);

impl From<U256> for U256Wrapper {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

impl From<U256Wrapper> for U256 {
    fn from(value: U256Wrapper) -> Self {
        value.0
    }
}

impl Serialize for U256Wrapper {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for U256Wrapper {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        U256::from_dec_str(&s)
            .map(U256Wrapper)
            .map_err(serde::de::Error::custom)
    }
}

/// Account metadata: opaque bytes plus, for fungible tokens, a supply.
#[derive(Debug, Clone, Default)]
pub struct AccountInfo {
    pub metadata: Option<Vec<u8>>,
    pub supply: Option<U256>,
}

/// By-convention schema for LP-token metadata (§4.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LpTokenMetadata {
    #[serde(rename = "type")]
    pub kind: String,
    pub pool: String,
    #[serde(rename = "tokenA")]
    pub token_a: String,
    #[serde(rename = "tokenB")]
    pub token_b: String,
    pub decimals: u8,
}

impl LpTokenMetadata {
    pub const KIND: &'static str = "LP_TOKEN";

    pub fn new(pool: &Account, token_a: &Account, token_b: &Account, decimals: u8) -> Self {
        Self {
            kind: Self::KIND.to_string(),
            pool: pool.0.clone(),
            token_a: token_a.0.clone(),
            token_b: token_b.0.clone(),
            decimals,
        }
    }

    /// Parses opaque metadata bytes as UTF-8 JSON and checks `type ==
    /// "LP_TOKEN"`. Returns `None` for anything else, including malformed
    /// bytes — callers treat absence as "not an LP token" rather than an
    /// error (§4.5 `user_positions`).
    pub fn try_decode(bytes: &[u8]) -> Option<Self> {
        let parsed: Self = serde_json::from_slice(bytes).ok()?;
        if parsed.kind == Self::KIND {
            Some(parsed)
        } else {
            None
        }
    }
}

/// Result of publishing a transaction: the hashes of the blocks it produced.
#[derive(Debug, Clone)]
pub struct PublishResult {
    pub block_hashes: Vec<String>,
}
