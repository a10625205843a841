use crate::audit::{AuditEvent, AuditEventKind, AuditSink, LogSink, WithdrawalKind};
use crate::clock::{Clock, SystemClock};
use crate::error::{PoolError, Result};
use crate::ledger::PrizeLedger;
use crate::storage::{RegistryStore, Storage};
use crate::store::{require_at_least_one, Distribution, Store};
use crate::treasury::{SqliteTreasury, Treasury};
use crate::types::{AssetKind, DistributionInfo, Identity, PrizeEntry, StoreId, StoreInfo};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Entry point for every operation on prize distribution stores.
///
/// Each store is guarded by its own async mutex held for the duration of a
/// mutating call, so authorization check, ledger mutation and escrow
/// transfer commit as one unit. Operations on different stores proceed
/// independently.
pub struct DistributionManager {
    storage: Arc<Storage>,
    treasury: Arc<dyn Treasury>,
    clock: Arc<dyn Clock>,
    audit: Arc<dyn AuditSink>,
    stores: Arc<RwLock<HashMap<StoreId, Arc<Mutex<Store>>>>>,
}

impl DistributionManager {
    pub async fn new(data_dir: &Path) -> Result<Self> {
        let db_path = data_dir.join("prizepool.db");
        let storage = Arc::new(Storage::new(&db_path).await?);
        let treasury = Arc::new(SqliteTreasury::new(storage.clone()));

        Ok(Self::with_parts(
            storage,
            treasury,
            Arc::new(SystemClock),
            Arc::new(LogSink),
        ))
    }

    /// Assemble a manager from explicit collaborators. Tests use this to
    /// drive time manually and to capture audit events.
    pub fn with_parts(
        storage: Arc<Storage>,
        treasury: Arc<dyn Treasury>,
        clock: Arc<dyn Clock>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            storage,
            treasury,
            clock,
            audit,
            stores: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn treasury(&self) -> &Arc<dyn Treasury> {
        &self.treasury
    }

    fn emit(&self, kind: AuditEventKind) {
        self.audit.emit(AuditEvent::new(self.clock.now(), kind));
    }

    async fn persist(&self, store: &Store) -> Result<()> {
        let registry_store = RegistryStore::new(&self.storage);
        registry_store.save_store(&store.to_record()).await
    }

    /// Fetch the cached handle for a store, loading it from storage on
    /// first touch. `StoreNotFound` if it was never initialized.
    async fn store_handle(&self, id: &StoreId) -> Result<Arc<Mutex<Store>>> {
        if let Some(handle) = self.stores.read().get(id) {
            return Ok(handle.clone());
        }

        let registry_store = RegistryStore::new(&self.storage);
        let record =
            registry_store
                .load_store(id)
                .await?
                .ok_or_else(|| PoolError::StoreNotFound {
                    organizer: id.organizer().clone(),
                    asset: id.asset().clone(),
                })?;

        let mut stores = self.stores.write();
        let handle = stores
            .entry(id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(Store::from_record(record))))
            .clone();
        Ok(handle)
    }

    /// Create the caller's store for `asset`. Exactly one store may exist
    /// per (organizer, asset); the admin set may be empty and the refund
    /// address is taken as-is.
    pub async fn initialize_store(
        &self,
        caller: &Identity,
        asset: &AssetKind,
        admins: Vec<Identity>,
        refund_address: Identity,
    ) -> Result<StoreId> {
        let id = StoreId::new(caller.clone(), asset.clone());

        let registry_store = RegistryStore::new(&self.storage);
        if registry_store.store_exists(&id).await? {
            return Err(PoolError::StoreExists {
                organizer: caller.clone(),
                asset: asset.clone(),
            });
        }

        let store = Store::new(
            id.clone(),
            admins.clone(),
            refund_address.clone(),
            self.clock.now(),
        );
        registry_store.create_store(&store.to_record()).await?;
        self.stores
            .write()
            .insert(id.clone(), Arc::new(Mutex::new(store)));

        self.emit(AuditEventKind::StoreInitialized {
            organizer: caller.clone(),
            asset: asset.clone(),
            admins,
            refund_address,
        });
        tracing::info!("Initialized store {}", id);
        Ok(id)
    }

    /// Grant admin rights. Owner-only; identities already present are
    /// skipped silently and do not appear in the returned delta. No event
    /// is emitted when the delta is empty.
    pub async fn add_admins(
        &self,
        caller: &Identity,
        store_id: &StoreId,
        identities: Vec<Identity>,
    ) -> Result<Vec<Identity>> {
        let handle = self.store_handle(store_id).await?;
        let mut store = handle.lock().await;

        store.require_owner(caller)?;
        require_at_least_one(&identities)?;

        let added = store.add_admins(identities);
        if added.is_empty() {
            return Ok(added);
        }

        self.persist(&store).await?;
        self.emit(AuditEventKind::AdminsAdded {
            store: store_id.clone(),
            added: added.clone(),
        });
        tracing::info!("Added {} admin(s) to {}", added.len(), store_id);
        Ok(added)
    }

    /// Revoke admin rights. Owner-only; absent identities are skipped
    /// silently, mirroring `add_admins`.
    pub async fn remove_admins(
        &self,
        caller: &Identity,
        store_id: &StoreId,
        identities: Vec<Identity>,
    ) -> Result<Vec<Identity>> {
        let handle = self.store_handle(store_id).await?;
        let mut store = handle.lock().await;

        store.require_owner(caller)?;
        require_at_least_one(&identities)?;

        let removed = store.remove_admins(identities);
        if removed.is_empty() {
            return Ok(removed);
        }

        self.persist(&store).await?;
        self.emit(AuditEventKind::AdminsRemoved {
            store: store_id.clone(),
            removed: removed.clone(),
        });
        tracing::info!("Removed {} admin(s) from {}", removed.len(), store_id);
        Ok(removed)
    }

    /// Create and fund a distribution in one step. Duplicate recipients in
    /// the input lists merge by summation; the caller funds the sum of the
    /// raw amounts. Returns the funded total.
    pub async fn add_distribution(
        &self,
        caller: &Identity,
        store_id: &StoreId,
        distribution_id: &str,
        recipients: Vec<Identity>,
        amounts: Vec<u64>,
        expiration: DateTime<Utc>,
    ) -> Result<u64> {
        let handle = self.store_handle(store_id).await?;
        let mut store = handle.lock().await;

        store.require_owner_or_admin(caller)?;
        if store.distribution(distribution_id).is_some() {
            return Err(PoolError::DistributionExists {
                id: distribution_id.to_string(),
            });
        }
        require_at_least_one(&recipients)?;
        if recipients.len() != amounts.len() {
            return Err(PoolError::LengthMismatch {
                recipients: recipients.len(),
                amounts: amounts.len(),
            });
        }
        if expiration <= self.clock.now() {
            return Err(PoolError::InvalidExpiration { expiration });
        }

        let mut ledger = PrizeLedger::new();
        let mut total: u64 = 0;
        for (recipient, amount) in recipients.iter().zip(amounts.iter()) {
            ledger.credit(recipient.clone(), *amount)?;
            total = total.checked_add(*amount).ok_or(PoolError::AmountOverflow)?;
        }

        // A retry derives the same (still empty) account, so a failed
        // funding attempt leaves nothing behind.
        let escrow = self.treasury.open_escrow(store_id, distribution_id).await?;
        self.treasury.fund_escrow(caller, &escrow, total).await?;

        let escrow_address = escrow.address().clone();
        store.insert_distribution(Distribution::new(
            distribution_id.to_string(),
            ledger,
            expiration,
            escrow,
        ));
        self.persist(&store).await?;

        self.emit(AuditEventKind::DistributionAdded {
            store: store_id.clone(),
            distribution_id: distribution_id.to_string(),
            recipients,
            amounts,
            escrow: escrow_address,
            expiration,
        });
        tracing::info!(
            "Added distribution '{}' to {} ({} funded)",
            distribution_id,
            store_id,
            total
        );
        Ok(total)
    }

    /// Delete a distribution, sending its entire live escrow balance to the
    /// store's refund address. Unclaimed prizes are forfeited; the id is
    /// immediately reusable. Returns the refunded amount.
    pub async fn remove_distribution(
        &self,
        caller: &Identity,
        store_id: &StoreId,
        distribution_id: &str,
    ) -> Result<u64> {
        let handle = self.store_handle(store_id).await?;
        let mut store = handle.lock().await;

        store.require_owner_or_admin(caller)?;
        let refund_address = store.refund_address().clone();

        // Pay the live balance out while the distribution is still
        // registered: a failed transfer leaves ledger and escrow untouched.
        let distribution =
            store
                .distribution(distribution_id)
                .ok_or_else(|| PoolError::DistributionNotFound {
                    id: distribution_id.to_string(),
                })?;
        let escrow_address = distribution.escrow_address().clone();
        let balance = self.treasury.escrow_balance(&escrow_address).await?;
        if balance > 0 {
            self.treasury
                .payout(distribution.escrow(), &refund_address, balance)
                .await?;
        }

        // The account is empty now; draining it only closes it and retires
        // the capability.
        let distribution = store.take_distribution(distribution_id)?;
        let leftover = self
            .treasury
            .drain(distribution.into_escrow(), &refund_address)
            .await?;
        let refunded = balance
            .checked_add(leftover)
            .ok_or(PoolError::AmountOverflow)?;
        self.persist(&store).await?;

        self.emit(AuditEventKind::DistributionRemoved {
            store: store_id.clone(),
            distribution_id: distribution_id.to_string(),
            escrow: escrow_address,
            refunded,
        });
        tracing::info!(
            "Removed distribution '{}' from {} ({} refunded)",
            distribution_id,
            store_id,
            refunded
        );
        Ok(refunded)
    }

    /// Merge-add a prize for one recipient, funded by the caller. No
    /// expiration check: funds added to an expired distribution flow to the
    /// refund address on removal and are never claimable. Returns the
    /// recipient's new ledger amount.
    pub async fn add_prize(
        &self,
        caller: &Identity,
        store_id: &StoreId,
        distribution_id: &str,
        recipient: Identity,
        amount: u64,
    ) -> Result<u64> {
        let handle = self.store_handle(store_id).await?;
        let mut store = handle.lock().await;

        store.require_owner_or_admin(caller)?;
        let distribution = store.distribution_mut(distribution_id)?;

        // Fallible transfer first, ledger write after: the two never diverge.
        self.treasury
            .fund_escrow(caller, distribution.escrow(), amount)
            .await?;
        let new_amount = distribution.ledger_mut().credit(recipient.clone(), amount)?;
        self.persist(&store).await?;

        self.emit(AuditEventKind::PrizeAdded {
            store: store_id.clone(),
            distribution_id: distribution_id.to_string(),
            recipient,
            amount,
        });
        Ok(new_amount)
    }

    /// Delete a recipient's prize and refund exactly its amount to the
    /// store's refund address. Returns the refunded amount.
    pub async fn remove_prize(
        &self,
        caller: &Identity,
        store_id: &StoreId,
        distribution_id: &str,
        recipient: &Identity,
    ) -> Result<u64> {
        let handle = self.store_handle(store_id).await?;
        let mut store = handle.lock().await;

        store.require_owner_or_admin(caller)?;
        let refund_address = store.refund_address().clone();
        let distribution = store.distribution_mut(distribution_id)?;

        let amount =
            distribution
                .ledger()
                .amount_for(recipient)
                .ok_or_else(|| PoolError::PrizeNotFound {
                    recipient: recipient.clone(),
                })?;
        // Fallible transfer first, ledger removal after: a failed payout
        // leaves the entry in place.
        self.treasury
            .payout(distribution.escrow(), &refund_address, amount)
            .await?;
        distribution.ledger_mut().remove(recipient);
        self.persist(&store).await?;

        self.emit(AuditEventKind::PrizeWithdrawn {
            store: store_id.clone(),
            distribution_id: distribution_id.to_string(),
            recipient: recipient.clone(),
            amount,
            destination: refund_address,
            kind: WithdrawalKind::Removed,
        });
        Ok(amount)
    }

    /// Overwrite a distribution's expiration. Matching the source system,
    /// the new value is not validated against the clock: a distribution can
    /// be expired on the spot or revived by moving the deadline forward.
    pub async fn update_prize_expiration(
        &self,
        caller: &Identity,
        store_id: &StoreId,
        distribution_id: &str,
        new_expiration: DateTime<Utc>,
    ) -> Result<()> {
        let handle = self.store_handle(store_id).await?;
        let mut store = handle.lock().await;

        store.require_owner_or_admin(caller)?;
        let distribution = store.distribution_mut(distribution_id)?;
        distribution.set_expiration(new_expiration);
        self.persist(&store).await?;

        self.emit(AuditEventKind::ExpirationUpdated {
            store: store_id.clone(),
            distribution_id: distribution_id.to_string(),
            expiration: new_expiration,
        });
        Ok(())
    }

    /// Withdraw the caller's own prize before the deadline. No owner/admin
    /// requirement; the caller's identity is the ledger key. Returns the
    /// claimed amount.
    pub async fn claim_prize(
        &self,
        caller: &Identity,
        store_id: &StoreId,
        distribution_id: &str,
    ) -> Result<u64> {
        let handle = self.store_handle(store_id).await?;
        let mut store = handle.lock().await;

        let now = self.clock.now();
        let distribution = store.distribution_mut(distribution_id)?;
        let amount = distribution
            .ledger()
            .amount_for(caller)
            .ok_or_else(|| PoolError::PrizeNotFound {
                recipient: caller.clone(),
            })?;
        if distribution.is_expired(now) {
            return Err(PoolError::Expired {
                id: distribution_id.to_string(),
            });
        }

        // Fallible transfer first, ledger removal after: a failed payout
        // leaves the entry claimable.
        self.treasury
            .payout(distribution.escrow(), caller, amount)
            .await?;
        distribution.ledger_mut().remove(caller);
        self.persist(&store).await?;

        self.emit(AuditEventKind::PrizeWithdrawn {
            store: store_id.clone(),
            distribution_id: distribution_id.to_string(),
            recipient: caller.clone(),
            amount,
            destination: caller.clone(),
            kind: WithdrawalKind::Claimed,
        });
        tracing::info!(
            "{} claimed {} from '{}' in {}",
            caller,
            amount,
            distribution_id,
            store_id
        );
        Ok(amount)
    }

    pub async fn store_info(&self, store_id: &StoreId) -> Result<StoreInfo> {
        let handle = self.store_handle(store_id).await?;
        let store = handle.lock().await;

        Ok(StoreInfo {
            organizer: store.id().organizer().clone(),
            asset: store.id().asset().clone(),
            refund_address: store.refund_address().clone(),
            admins: store.admins(),
            distribution_count: store.distribution_count(),
            created_at: store.created_at(),
        })
    }

    pub async fn list_stores(&self) -> Result<Vec<StoreInfo>> {
        let registry_store = RegistryStore::new(&self.storage);
        let records = registry_store.list_stores().await?;

        Ok(records
            .into_iter()
            .map(|r| StoreInfo {
                organizer: r.organizer,
                asset: r.asset,
                refund_address: r.refund_address,
                admins: r.admins,
                distribution_count: r.distributions.len(),
                created_at: r.created_at,
            })
            .collect())
    }

    pub async fn list_distributions(&self, store_id: &StoreId) -> Result<Vec<String>> {
        let handle = self.store_handle(store_id).await?;
        let store = handle.lock().await;
        Ok(store.distribution_ids())
    }

    pub async fn distribution_info(
        &self,
        store_id: &StoreId,
        distribution_id: &str,
    ) -> Result<DistributionInfo> {
        let handle = self.store_handle(store_id).await?;
        let store = handle.lock().await;

        let distribution =
            store
                .distribution(distribution_id)
                .ok_or_else(|| PoolError::DistributionNotFound {
                    id: distribution_id.to_string(),
                })?;
        let escrow_balance = self
            .treasury
            .escrow_balance(distribution.escrow_address())
            .await?;

        Ok(DistributionInfo {
            id: distribution.id().to_string(),
            expiration: distribution.expiration(),
            escrow: distribution.escrow_address().clone(),
            escrow_balance,
            entries: distribution
                .ledger()
                .entries()
                .into_iter()
                .map(|(recipient, amount)| PrizeEntry { recipient, amount })
                .collect(),
            expired: distribution.is_expired(self.clock.now()),
        })
    }

    /// Amount the caller could claim right now, if any. Expired or absent
    /// entries yield `None`.
    pub async fn claimable_amount(
        &self,
        caller: &Identity,
        store_id: &StoreId,
        distribution_id: &str,
    ) -> Result<Option<u64>> {
        let handle = self.store_handle(store_id).await?;
        let store = handle.lock().await;

        let distribution =
            store
                .distribution(distribution_id)
                .ok_or_else(|| PoolError::DistributionNotFound {
                    id: distribution_id.to_string(),
                })?;
        if distribution.is_expired(self.clock.now()) {
            return Ok(None);
        }
        Ok(distribution.ledger().amount_for(caller))
    }
}
