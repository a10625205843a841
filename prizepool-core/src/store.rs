use crate::error::{PoolError, Result};
use crate::ledger::PrizeLedger;
use crate::storage::registry_store::{DistributionRecord, StoreRecord};
use crate::treasury::{EscrowAddress, EscrowCap};
use crate::types::{Identity, StoreId};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

/// One escrow-backed, expiring prize pool.
///
/// Owns the capability of its escrow account; removing the distribution
/// consumes it via `into_escrow`, after which nothing can spend from the
/// account.
#[derive(Debug)]
pub struct Distribution {
    id: String,
    ledger: PrizeLedger,
    expiration: DateTime<Utc>,
    escrow: EscrowCap,
}

impl Distribution {
    pub(crate) fn new(
        id: String,
        ledger: PrizeLedger,
        expiration: DateTime<Utc>,
        escrow: EscrowCap,
    ) -> Self {
        Self {
            id,
            ledger,
            expiration,
            escrow,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn ledger(&self) -> &PrizeLedger {
        &self.ledger
    }

    pub(crate) fn ledger_mut(&mut self) -> &mut PrizeLedger {
        &mut self.ledger
    }

    pub fn expiration(&self) -> DateTime<Utc> {
        self.expiration
    }

    pub(crate) fn set_expiration(&mut self, expiration: DateTime<Utc>) {
        self.expiration = expiration;
    }

    /// Expiration is strict: at the deadline itself the pool counts as
    /// expired.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiration
    }

    pub fn escrow_address(&self) -> &EscrowAddress {
        self.escrow.address()
    }

    pub(crate) fn escrow(&self) -> &EscrowCap {
        &self.escrow
    }

    pub(crate) fn into_escrow(self) -> EscrowCap {
        self.escrow
    }

    fn to_record(&self) -> DistributionRecord {
        DistributionRecord {
            id: self.id.clone(),
            ledger: self.ledger.clone(),
            expiration: self.expiration,
            escrow: self.escrow.address().clone(),
        }
    }

    fn from_record(record: DistributionRecord) -> Self {
        Self {
            id: record.id,
            ledger: record.ledger,
            expiration: record.expiration,
            escrow: EscrowCap::new(record.escrow),
        }
    }
}

/// Per-organizer registry of distributions for one asset. The owner is
/// fixed at creation; only the admin set and refund address accompany it.
#[derive(Debug)]
pub struct Store {
    id: StoreId,
    refund_address: Identity,
    admins: HashSet<Identity>,
    distributions: HashMap<String, Distribution>,
    created_at: DateTime<Utc>,
}

impl Store {
    pub(crate) fn new(
        id: StoreId,
        admins: Vec<Identity>,
        refund_address: Identity,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            refund_address,
            admins: admins.into_iter().collect(),
            distributions: HashMap::new(),
            created_at,
        }
    }

    pub fn id(&self) -> &StoreId {
        &self.id
    }

    pub fn owner(&self) -> &Identity {
        self.id.organizer()
    }

    pub fn refund_address(&self) -> &Identity {
        &self.refund_address
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_owner(&self, caller: &Identity) -> bool {
        self.owner() == caller
    }

    /// The owner is always authorized; admin membership is only consulted
    /// for non-owners.
    pub fn is_owner_or_admin(&self, caller: &Identity) -> bool {
        self.is_owner(caller) || self.admins.contains(caller)
    }

    pub(crate) fn require_owner(&self, caller: &Identity) -> Result<()> {
        if self.is_owner(caller) {
            Ok(())
        } else {
            Err(PoolError::NotOwner)
        }
    }

    pub(crate) fn require_owner_or_admin(&self, caller: &Identity) -> Result<()> {
        if self.is_owner_or_admin(caller) {
            Ok(())
        } else {
            Err(PoolError::NotOwnerOrAdmin)
        }
    }

    /// Admins sorted for stable display and persistence.
    pub fn admins(&self) -> Vec<Identity> {
        let mut admins: Vec<_> = self.admins.iter().cloned().collect();
        admins.sort();
        admins
    }

    /// Insert the identities not already present, returning the effective
    /// delta in input order. Duplicates and existing admins are skipped
    /// silently.
    pub(crate) fn add_admins(&mut self, identities: Vec<Identity>) -> Vec<Identity> {
        let mut added = Vec::new();
        for id in identities {
            if self.admins.insert(id.clone()) {
                added.push(id);
            }
        }
        added
    }

    /// Remove the identities that are present, returning the effective
    /// delta in input order.
    pub(crate) fn remove_admins(&mut self, identities: Vec<Identity>) -> Vec<Identity> {
        let mut removed = Vec::new();
        for id in identities {
            if self.admins.remove(&id) {
                removed.push(id);
            }
        }
        removed
    }

    pub fn distribution(&self, id: &str) -> Option<&Distribution> {
        self.distributions.get(id)
    }

    pub(crate) fn distribution_mut(&mut self, id: &str) -> Result<&mut Distribution> {
        self.distributions
            .get_mut(id)
            .ok_or_else(|| PoolError::DistributionNotFound { id: id.to_string() })
    }

    pub(crate) fn insert_distribution(&mut self, distribution: Distribution) {
        self.distributions
            .insert(distribution.id().to_string(), distribution);
    }

    pub(crate) fn take_distribution(&mut self, id: &str) -> Result<Distribution> {
        self.distributions
            .remove(id)
            .ok_or_else(|| PoolError::DistributionNotFound { id: id.to_string() })
    }

    pub fn distribution_count(&self) -> usize {
        self.distributions.len()
    }

    pub fn distribution_ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.distributions.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub(crate) fn to_record(&self) -> StoreRecord {
        let mut distributions: Vec<_> = self
            .distributions
            .values()
            .map(Distribution::to_record)
            .collect();
        distributions.sort_by(|a, b| a.id.cmp(&b.id));

        StoreRecord {
            organizer: self.id.organizer().clone(),
            asset: self.id.asset().clone(),
            refund_address: self.refund_address.clone(),
            admins: self.admins(),
            distributions,
            created_at: self.created_at,
        }
    }

    pub(crate) fn from_record(record: StoreRecord) -> Self {
        let distributions = record
            .distributions
            .into_iter()
            .map(|d| (d.id.clone(), Distribution::from_record(d)))
            .collect();

        Self {
            id: StoreId::new(record.organizer, record.asset),
            refund_address: record.refund_address,
            admins: record.admins.into_iter().collect(),
            distributions,
            created_at: record.created_at,
        }
    }
}

/// Argument check shared by the admin-management operations.
pub(crate) fn require_at_least_one(identities: &[Identity]) -> Result<()> {
    if identities.is_empty() {
        Err(PoolError::EmptyList)
    } else {
        Ok(())
    }
}
