//! An in-memory [`LedgerAdapter`] used by integration tests so `Pool` and
//! `PoolManager` logic can be exercised without a real ledger client.

use crate::adapter::{Instruction, LedgerAdapter, TransactionBuilder};
use crate::error::{LedgerError, Result};
use crate::types::{Account, AccountInfo, Balance, LpTokenMetadata, Permission, PublishResult, TokenId};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use primitive_types::U256;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct AccountState {
    balances: DashMap<TokenId, U256>,
    metadata: Mutex<Option<Vec<u8>>>,
    permissions: DashMap<(Account, Permission), bool>,
}

/// In-process ledger double. Every account's token balances live in a
/// [`DashMap`]; instructions are applied atomically in-process (there is no
/// real consensus to race against).
pub struct FakeLedgerAdapter {
    accounts: DashMap<Account, Arc<AccountState>>,
    next_id: AtomicU64,
    /// Accounts whose next `publish` call touching them should fail,
    /// simulating ledger rejection (used to exercise the TX2-failure/refund
    /// path, S6).
    force_reject: DashMap<Account, String>,
}

impl Default for FakeLedgerAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeLedgerAdapter {
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
            next_id: AtomicU64::new(1),
            force_reject: DashMap::new(),
        }
    }

    fn state(&self, account: &Account) -> Arc<AccountState> {
        self.accounts
            .entry(account.clone())
            .or_insert_with(|| Arc::new(AccountState::default()))
            .clone()
    }

    /// Test helper: directly credits `account` with `amount` of `token`,
    /// bypassing transaction semantics (seeding initial reserves/balances).
    pub fn credit(&self, account: &Account, token: &TokenId, amount: U256) {
        let state = self.state(account);
        *state.balances.entry(token.clone()).or_insert(U256::zero()) += amount;
    }

    /// Test helper: makes the next `publish` that sends to `account` fail.
    pub fn force_next_publish_to_fail(&self, account: &Account, reason: &str) {
        self.force_reject
            .insert(account.clone(), reason.to_string());
    }

    fn fresh_address(&self, prefix: &str) -> Account {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        Account(format!("{prefix}_{id}"))
    }

    /// Whether *any* holder has been granted `permission` on `subject`. The
    /// fake has no notion of "who is calling publish", so it authorizes an
    /// on-behalf-of send whenever the subject has granted the permission to
    /// anyone — sufficient to exercise the authorization-gated code paths
    /// without modeling per-caller identity.
    fn has_permission(&self, subject: &Account, permission: Permission) -> bool {
        self.state(subject)
            .permissions
            .iter()
            .any(|entry| entry.key().1 == permission && *entry.value())
    }
}

#[async_trait]
impl LedgerAdapter for FakeLedgerAdapter {
    fn account_from_address(&self, address: &str) -> Result<Account> {
        if address.trim().is_empty() {
            return Err(LedgerError::InvalidAddress(address.to_string()));
        }
        Ok(Account(address.to_string()))
    }

    async fn balances_of(&self, account: &Account) -> Result<Vec<Balance>> {
        let state = self.state(account);
        Ok(state
            .balances
            .iter()
            .map(|entry| Balance {
                token: entry.key().clone(),
                amount: (*entry.value()).into(),
            })
            .collect())
    }

    async fn account_info(&self, account: &Account) -> Result<AccountInfo> {
        let state = self.state(account);
        let metadata = state.metadata.lock().clone();
        let supply = state.balances.get(account).map(|v| *v);
        Ok(AccountInfo { metadata, supply })
    }

    async fn publish(&self, builder: TransactionBuilder) -> Result<PublishResult> {
        let instructions = builder.into_instructions();

        for instruction in &instructions {
            if let Instruction::Send { to, .. } = instruction {
                if let Some((_, reason)) = self.force_reject.remove(to) {
                    return Err(LedgerError::Rejected {
                        account: to.to_string(),
                        reason,
                    });
                }
            }
        }

        for instruction in instructions {
            match instruction {
                Instruction::Send {
                    to,
                    amount,
                    token,
                    on_behalf_of,
                } => {
                    if let Some(owner) = &on_behalf_of {
                        if !self.has_permission(owner, Permission::SendOnBehalf) {
                            return Err(LedgerError::PermissionDenied {
                                account: owner.to_string(),
                                subject: owner.to_string(),
                                permission: Permission::SendOnBehalf.to_string(),
                            });
                        }
                        let from_state = self.state(owner);
                        let mut bal = from_state.balances.entry(token.clone()).or_insert(U256::zero());
                        if *bal < amount {
                            return Err(LedgerError::Rejected {
                                account: owner.to_string(),
                                reason: "insufficient balance".to_string(),
                            });
                        }
                        *bal -= amount;
                    }
                    let to_state = self.state(&to);
                    *to_state.balances.entry(token).or_insert(U256::zero()) += amount;
                }
                Instruction::UpdatePermissions {
                    subject,
                    permission,
                    grant,
                    on_behalf_of,
                } => {
                    let holder = on_behalf_of.unwrap_or_else(|| subject.clone());
                    self.state(&subject)
                        .permissions
                        .insert((holder, permission), grant);
                }
                Instruction::SetMetadata { account, bytes } => {
                    *self.state(&account).metadata.lock() = Some(bytes);
                }
            }
        }

        Ok(PublishResult {
            block_hashes: vec![format!(
                "fake-block-{}",
                self.next_id.fetch_add(1, Ordering::SeqCst)
            )],
        })
    }

    async fn create_storage_account(
        &self,
        name: &str,
        _description: &str,
        grant_send_on_behalf_to_operator: bool,
        owner: &Account,
    ) -> Result<Account> {
        let account = self.fresh_address(name);
        self.state(&account);
        if grant_send_on_behalf_to_operator {
            self.state(&account)
                .permissions
                .insert((owner.clone(), Permission::SendOnBehalf), true);
        }
        Ok(account)
    }

    async fn create_lp_token(
        &self,
        pool_address: &Account,
        token_a: &Account,
        token_b: &Account,
    ) -> Result<Account> {
        let token = self.fresh_address("lp");
        let metadata = LpTokenMetadata::new(pool_address, token_a, token_b, 9);
        let bytes = serde_json::to_vec(&metadata).map_err(|e| LedgerError::CreationFailed {
            kind: "lp_token".to_string(),
            reason: e.to_string(),
        })?;
        *self.state(&token).metadata.lock() = Some(bytes);
        Ok(token)
    }

    async fn mint_supply(&self, token_address: &Account, to: &Account, amount: U256) -> Result<()> {
        let to_state = self.state(to);
        *to_state
            .balances
            .entry(token_address.clone())
            .or_insert(U256::zero()) += amount;
        let supply_state = self.state(token_address);
        *supply_state
            .balances
            .entry(token_address.clone())
            .or_insert(U256::zero()) += amount;
        Ok(())
    }

    async fn burn_supply(
        &self,
        token_address: &Account,
        from_user_client: &Account,
        amount: U256,
    ) -> Result<()> {
        let from_state = self.state(from_user_client);
        let mut bal = from_state
            .balances
            .entry(token_address.clone())
            .or_insert(U256::zero());
        if *bal < amount {
            return Err(LedgerError::SupplyError {
                token: token_address.to_string(),
                reason: "burn exceeds balance".to_string(),
            });
        }
        *bal -= amount;
        drop(bal);
        let supply_state = self.state(token_address);
        let mut supply = supply_state
            .balances
            .entry(token_address.clone())
            .or_insert(U256::zero());
        *supply = supply.saturating_sub(amount);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn credit_and_read_balance_round_trips() {
        let adapter = FakeLedgerAdapter::new();
        let account = Account("user1".to_string());
        let token = Account("tokenA".to_string());
        adapter.credit(&account, &token, U256::from(1_000));

        let balances = adapter.balances_of(&account).await.unwrap();
        assert_eq!(balances.len(), 1);
        assert_eq!(U256::from(balances[0].amount), U256::from(1_000));
    }

    #[tokio::test]
    async fn send_on_behalf_requires_permission() {
        let adapter = FakeLedgerAdapter::new();
        let pool = Account("pool1".to_string());
        let operator = Account("operator".to_string());
        let user = Account("user1".to_string());
        let token = Account("tokenA".to_string());
        adapter.credit(&pool, &token, U256::from(1_000));

        let mut tx = adapter.new_transaction();
        tx.send(user.clone(), U256::from(100), token.clone(), Some(pool.clone()));
        let err = adapter.publish(tx).await.unwrap_err();
        assert!(matches!(err, LedgerError::PermissionDenied { .. }));

        let granted = adapter
            .create_storage_account("pool", "", true, &operator)
            .await
            .unwrap();
        adapter.credit(&granted, &token, U256::from(1_000));
        let mut tx = adapter.new_transaction();
        tx.send(user.clone(), U256::from(100), token.clone(), Some(granted.clone()));
        adapter.publish(tx).await.unwrap();

        let balances = adapter.balances_of(&user).await.unwrap();
        assert_eq!(U256::from(balances[0].amount), U256::from(100));
    }

    #[tokio::test]
    async fn forced_rejection_surfaces_to_caller() {
        let adapter = FakeLedgerAdapter::new();
        let user = Account("user1".to_string());
        let token = Account("tokenA".to_string());
        adapter.force_next_publish_to_fail(&user, "simulated rejection");

        let mut tx = adapter.new_transaction();
        tx.send(user, U256::from(1), token, None);
        let err = adapter.publish(tx).await.unwrap_err();
        assert!(matches!(err, LedgerError::Rejected { .. }));
    }
}
