//! The narrow ledger adapter trait (§4.2). This is the *only* interface
//! the coordinator's core uses to touch the ledger; nothing above this
//! boundary constructs or parses ledger blocks directly.

use crate::error::Result;
use crate::types::{Account, AccountInfo, Balance, Permission, PublishResult, TokenId};
use async_trait::async_trait;
use primitive_types::U256;

/// One queued instruction in a transaction under construction.
#[derive(Debug, Clone)]
pub enum Instruction {
    Send {
        to: Account,
        amount: U256,
        token: TokenId,
        on_behalf_of: Option<Account>,
    },
    UpdatePermissions {
        subject: Account,
        permission: Permission,
        grant: bool,
        on_behalf_of: Option<Account>,
    },
    SetMetadata { account: Account, bytes: Vec<u8> },
}

/// A single pending transaction under construction. Obtained from
/// [`LedgerAdapter::new_transaction`] and handed to
/// [`LedgerAdapter::publish`]. There is exactly one implementation per
/// ledger client; this is a plain instruction buffer rather than a trait,
/// since nothing above the adapter boundary needs to substitute its
/// behavior.
#[derive(Debug, Clone, Default)]
pub struct TransactionBuilder {
    instructions: Vec<Instruction>,
}

impl TransactionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a transfer of `amount` of `token` to `to`. If `on_behalf_of`
    /// is set, the transfer is signed using the builder's `SEND_ON_BEHALF`
    /// permission on that account rather than sending from the signer's
    /// own balance.
    pub fn send(&mut self, to: Account, amount: U256, token: TokenId, on_behalf_of: Option<Account>) {
        self.instructions.push(Instruction::Send {
            to,
            amount,
            token,
            on_behalf_of,
        });
    }

    /// Queue a permission grant or revoke on `subject`.
    pub fn update_permissions(
        &mut self,
        subject: Account,
        permission: Permission,
        grant: bool,
        on_behalf_of: Option<Account>,
    ) {
        self.instructions.push(Instruction::UpdatePermissions {
            subject,
            permission,
            grant,
            on_behalf_of,
        });
    }

    /// Queue a metadata write on `account`.
    pub fn set_metadata(&mut self, account: Account, bytes: Vec<u8>) {
        self.instructions.push(Instruction::SetMetadata { account, bytes });
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn into_instructions(self) -> Vec<Instruction> {
        self.instructions
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

/// Thin wrapper around the ledger client (§4.2). Implementations own the
/// actual RPC/WS connection and signing keys; this trait exposes only the
/// operations the coordinator's core depends on.
#[async_trait]
pub trait LedgerAdapter: Send + Sync {
    /// Parses an address string into an [`Account`]. Pure and synchronous;
    /// fails `InvalidAddress` on malformed input.
    fn account_from_address(&self, address: &str) -> Result<Account>;

    /// Reads all token balances held by `account`.
    async fn balances_of(&self, account: &Account) -> Result<Vec<Balance>>;

    /// Reads `account`'s metadata and, if it is a token, its supply.
    async fn account_info(&self, account: &Account) -> Result<AccountInfo>;

    /// Allocates a new, empty transaction builder.
    fn new_transaction(&self) -> TransactionBuilder {
        TransactionBuilder::new()
    }

    /// Publishes a built transaction. This is the suspension point on the
    /// ledger side of every swap and liquidity operation (§5); once this
    /// call is accepted by the ledger the operation is committed-or-failed
    /// at the ledger and cannot be cancelled by the coordinator.
    async fn publish(&self, builder: TransactionBuilder) -> Result<PublishResult>;

    /// Creates a storage account, optionally granting the operator
    /// `SEND_ON_BEHALF` on it immediately.
    async fn create_storage_account(
        &self,
        name: &str,
        description: &str,
        grant_send_on_behalf_to_operator: bool,
        owner: &Account,
    ) -> Result<Account>;

    /// Creates the LP token bound to a pool, with metadata encoding the
    /// pool/token-pair mapping (§4.2).
    async fn create_lp_token(
        &self,
        pool_address: &Account,
        token_a: &Account,
        token_b: &Account,
    ) -> Result<Account>;

    /// Mints `amount` of `token_address` to `to`.
    async fn mint_supply(&self, token_address: &Account, to: &Account, amount: U256)
        -> Result<()>;

    /// Burns `amount` of `token_address`, pulled from `from_user_client`
    /// (the account the tokens were positioned into ahead of the burn).
    async fn burn_supply(
        &self,
        token_address: &Account,
        from_user_client: &Account,
        amount: U256,
    ) -> Result<()>;
}
