use crate::error::{PoolError, Result};
use crate::storage::Storage;
use crate::types::{Identity, StoreId};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;

/// Address of a custodial escrow account. Public information; knowing the
/// address grants no spending rights.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EscrowAddress(String);

impl EscrowAddress {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EscrowAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Exclusive right to move funds out of one escrow account.
///
/// Deliberately not `Clone`: the capability lives inside the distribution
/// that opened the account and moves with it. `Treasury::drain` takes it by
/// value, so once a distribution is removed no code path can spend from its
/// account again.
#[derive(Debug)]
pub struct EscrowCap {
    address: EscrowAddress,
}

impl EscrowCap {
    pub(crate) fn new(address: EscrowAddress) -> Self {
        Self { address }
    }

    pub fn address(&self) -> &EscrowAddress {
        &self.address
    }
}

/// Fund-transfer collaborator. The bookkeeping core moves value only
/// through this seam; identity accounts are addressed directly while
/// escrow accounts require the capability handed out by `open_escrow`.
#[async_trait]
pub trait Treasury: Send + Sync {
    /// Credit an identity account out of thin air. Faucet for local use;
    /// a production treasury would settle against an external system.
    async fn deposit(&self, to: &Identity, amount: u64) -> Result<()>;

    async fn balance_of(&self, id: &Identity) -> Result<u64>;

    async fn escrow_balance(&self, address: &EscrowAddress) -> Result<u64>;

    /// Materialize the escrow account for one distribution and hand out its
    /// capability. The derivation is deterministic, so retrying a failed
    /// creation lands on the same account instead of leaking a new one.
    async fn open_escrow(&self, store: &StoreId, distribution_id: &str) -> Result<EscrowCap>;

    /// Move `amount` from an identity account into escrow.
    async fn fund_escrow(&self, from: &Identity, escrow: &EscrowCap, amount: u64) -> Result<()>;

    /// Move `amount` out of escrow to an identity account.
    async fn payout(&self, escrow: &EscrowCap, to: &Identity, amount: u64) -> Result<()>;

    /// Move the entire live balance out of escrow and consume the
    /// capability. Returns the amount moved.
    async fn drain(&self, escrow: EscrowCap, to: &Identity) -> Result<u64>;
}

/// Each component is length-prefixed before hashing, so identities and ids
/// containing any delimiter cannot collide across stores.
pub(crate) fn derive_escrow_address(store: &StoreId, distribution_id: &str) -> EscrowAddress {
    let mut hasher = Sha256::new();
    for part in [
        store.organizer().as_str(),
        store.asset().as_str(),
        distribution_id,
    ] {
        hasher.update((part.len() as u64).to_le_bytes());
        hasher.update(part.as_bytes());
    }
    let digest = hasher.finalize();
    EscrowAddress(format!("escrow:{}", hex::encode(&digest[..20])))
}

/// Treasury backed by the shared sqlite `accounts` table. Every transfer
/// runs inside one sqlite transaction, so a debit and its matching credit
/// commit or roll back together.
pub struct SqliteTreasury {
    storage: Arc<Storage>,
}

impl SqliteTreasury {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    fn to_db(amount: u64) -> Result<i64> {
        i64::try_from(amount).map_err(|_| PoolError::AmountOverflow)
    }

    fn balance(conn: &Connection, address: &str) -> Result<u64> {
        let balance: Option<i64> = conn
            .query_row(
                "SELECT balance FROM accounts WHERE address = ?1",
                params![address],
                |row| row.get(0),
            )
            .optional()?;
        match balance {
            None => Ok(0),
            Some(stored) => u64::try_from(stored).map_err(|_| {
                PoolError::internal(format!("Negative balance stored for {}", address))
            }),
        }
    }

    fn credit(conn: &Connection, address: &str, amount: u64) -> Result<()> {
        let current = Self::balance(conn, address)?;
        let next = current
            .checked_add(amount)
            .ok_or(PoolError::AmountOverflow)?;
        conn.execute(
            "INSERT OR REPLACE INTO accounts (address, balance) VALUES (?1, ?2)",
            params![address, Self::to_db(next)?],
        )?;
        Ok(())
    }

    fn transfer(conn: &Connection, from: &str, to: &str, amount: u64) -> Result<()> {
        let available = Self::balance(conn, from)?;
        if available < amount {
            return Err(PoolError::InsufficientFunds {
                need: amount,
                available,
            });
        }
        conn.execute(
            "UPDATE accounts SET balance = balance - ?2 WHERE address = ?1",
            params![from, Self::to_db(amount)?],
        )?;
        Self::credit(conn, to, amount)?;
        Ok(())
    }
}

#[async_trait]
impl Treasury for SqliteTreasury {
    async fn deposit(&self, to: &Identity, amount: u64) -> Result<()> {
        let conn = self.storage.get_connection().await;
        Self::credit(&conn, to.as_str(), amount)?;
        tracing::debug!("Deposited {} to {}", amount, to);
        Ok(())
    }

    async fn balance_of(&self, id: &Identity) -> Result<u64> {
        let conn = self.storage.get_connection().await;
        Self::balance(&conn, id.as_str())
    }

    async fn escrow_balance(&self, address: &EscrowAddress) -> Result<u64> {
        let conn = self.storage.get_connection().await;
        Self::balance(&conn, address.as_str())
    }

    async fn open_escrow(&self, store: &StoreId, distribution_id: &str) -> Result<EscrowCap> {
        let address = derive_escrow_address(store, distribution_id);
        let conn = self.storage.get_connection().await;
        conn.execute(
            "INSERT OR IGNORE INTO accounts (address, balance) VALUES (?1, 0)",
            params![address.as_str()],
        )?;
        Ok(EscrowCap::new(address))
    }

    async fn fund_escrow(&self, from: &Identity, escrow: &EscrowCap, amount: u64) -> Result<()> {
        let mut conn = self.storage.get_connection().await;
        let tx = conn.transaction()?;
        Self::transfer(&tx, from.as_str(), escrow.address().as_str(), amount)?;
        tx.commit()?;
        Ok(())
    }

    async fn payout(&self, escrow: &EscrowCap, to: &Identity, amount: u64) -> Result<()> {
        let mut conn = self.storage.get_connection().await;
        let tx = conn.transaction()?;
        Self::transfer(&tx, escrow.address().as_str(), to.as_str(), amount)?;
        tx.commit()?;
        Ok(())
    }

    async fn drain(&self, escrow: EscrowCap, to: &Identity) -> Result<u64> {
        let mut conn = self.storage.get_connection().await;
        let tx = conn.transaction()?;
        let balance = Self::balance(&tx, escrow.address().as_str())?;
        if balance > 0 {
            Self::transfer(&tx, escrow.address().as_str(), to.as_str(), balance)?;
        }
        tx.execute(
            "DELETE FROM accounts WHERE address = ?1",
            params![escrow.address().as_str()],
        )?;
        tx.commit()?;
        Ok(balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AssetKind;
    use tempfile::tempdir;

    async fn treasury() -> (tempfile::TempDir, SqliteTreasury) {
        let dir = tempdir().unwrap();
        let storage = Arc::new(Storage::new(&dir.path().join("test.db")).await.unwrap());
        (dir, SqliteTreasury::new(storage))
    }

    fn store_id(organizer: &str, asset: &str) -> StoreId {
        StoreId::new(Identity::new(organizer), AssetKind::new(asset))
    }

    #[tokio::test]
    async fn deposit_and_transfer_through_escrow() {
        let (_dir, treasury) = treasury().await;
        let alice = Identity::new("alice");
        let bob = Identity::new("bob");

        treasury.deposit(&alice, 10_000).await.unwrap();
        assert_eq!(treasury.balance_of(&alice).await.unwrap(), 10_000);

        let cap = treasury
            .open_escrow(&store_id("store", "usd"), "hackathon")
            .await
            .unwrap();
        treasury.fund_escrow(&alice, &cap, 6_000).await.unwrap();
        assert_eq!(treasury.balance_of(&alice).await.unwrap(), 4_000);
        assert_eq!(treasury.escrow_balance(cap.address()).await.unwrap(), 6_000);

        treasury.payout(&cap, &bob, 2_500).await.unwrap();
        assert_eq!(treasury.balance_of(&bob).await.unwrap(), 2_500);
        assert_eq!(treasury.escrow_balance(cap.address()).await.unwrap(), 3_500);
    }

    #[tokio::test]
    async fn fund_escrow_fails_without_balance() {
        let (_dir, treasury) = treasury().await;
        let alice = Identity::new("alice");
        treasury.deposit(&alice, 100).await.unwrap();

        let cap = treasury
            .open_escrow(&store_id("store", "usd"), "short")
            .await
            .unwrap();
        let err = treasury.fund_escrow(&alice, &cap, 500).await.unwrap_err();
        assert!(matches!(
            err,
            PoolError::InsufficientFunds {
                need: 500,
                available: 100
            }
        ));

        // Nothing moved
        assert_eq!(treasury.balance_of(&alice).await.unwrap(), 100);
        assert_eq!(treasury.escrow_balance(cap.address()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn drain_moves_live_balance_and_consumes_cap() {
        let (_dir, treasury) = treasury().await;
        let alice = Identity::new("alice");
        let refund = Identity::new("refund");
        treasury.deposit(&alice, 1_000).await.unwrap();

        let cap = treasury
            .open_escrow(&store_id("store", "usd"), "done")
            .await
            .unwrap();
        let address = cap.address().clone();
        treasury.fund_escrow(&alice, &cap, 1_000).await.unwrap();

        let drained = treasury.drain(cap, &refund).await.unwrap();
        assert_eq!(drained, 1_000);
        assert_eq!(treasury.balance_of(&refund).await.unwrap(), 1_000);
        assert_eq!(treasury.escrow_balance(&address).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn deposit_rejects_amounts_beyond_storage_range() {
        let (_dir, treasury) = treasury().await;
        let alice = Identity::new("alice");

        let err = treasury.deposit(&alice, u64::MAX).await.unwrap_err();
        assert!(matches!(err, PoolError::AmountOverflow));
        assert_eq!(treasury.balance_of(&alice).await.unwrap(), 0);

        // A balance at the storage limit is fine; one past it is not
        treasury.deposit(&alice, i64::MAX as u64).await.unwrap();
        let err = treasury.deposit(&alice, 1).await.unwrap_err();
        assert!(matches!(err, PoolError::AmountOverflow));
        assert_eq!(treasury.balance_of(&alice).await.unwrap(), i64::MAX as u64);
    }

    #[test]
    fn escrow_address_is_deterministic() {
        let a = derive_escrow_address(&store_id("org", "usd"), "spring");
        let b = derive_escrow_address(&store_id("org", "usd"), "spring");
        let c = derive_escrow_address(&store_id("org", "usd"), "summer");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.as_str().starts_with("escrow:"));
    }

    #[test]
    fn escrow_address_keeps_component_boundaries() {
        // Shifting a delimiter between asset and distribution id must not
        // land two different distributions on the same account.
        let a = derive_escrow_address(&store_id("alice", "usd"), "a/b");
        let b = derive_escrow_address(&store_id("alice", "usd/a"), "b");
        assert_ne!(a, b);

        let c = derive_escrow_address(&store_id("alice/usd", "a"), "b");
        assert_ne!(a, c);
        assert_ne!(b, c);
    }
}
