use crate::error::{PoolError, Result};
use crate::types::Identity;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-distribution mapping of recipient to awarded amount. Every mutation
/// here is paired by the manager with an equal-and-opposite escrow transfer,
/// which is what keeps `total()` equal to the live escrow balance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrizeLedger {
    entries: HashMap<Identity, u64>,
}

impl PrizeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge-add `amount` into the recipient's entry, creating it if absent.
    /// Returns the recipient's new total.
    pub fn credit(&mut self, recipient: Identity, amount: u64) -> Result<u64> {
        let entry = self.entries.entry(recipient).or_insert(0);
        *entry = entry.checked_add(amount).ok_or(PoolError::AmountOverflow)?;
        Ok(*entry)
    }

    /// Delete the recipient's entry, returning its amount if present.
    pub fn remove(&mut self, recipient: &Identity) -> Option<u64> {
        self.entries.remove(recipient)
    }

    pub fn amount_for(&self, recipient: &Identity) -> Option<u64> {
        self.entries.get(recipient).copied()
    }

    pub fn total(&self) -> Result<u64> {
        self.entries
            .values()
            .try_fold(0u64, |acc, v| acc.checked_add(*v))
            .ok_or(PoolError::AmountOverflow)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries sorted by recipient, for stable display and event payloads.
    pub fn entries(&self) -> Vec<(Identity, u64)> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .map(|(r, a)| (r.clone(), *a))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credit_merges_by_summation() {
        let mut ledger = PrizeLedger::new();
        assert_eq!(ledger.credit("alice".into(), 1_000_000).unwrap(), 1_000_000);
        assert_eq!(ledger.credit("bob".into(), 2_000_000).unwrap(), 2_000_000);
        assert_eq!(ledger.credit("alice".into(), 3_000_000).unwrap(), 4_000_000);

        assert_eq!(ledger.amount_for(&"alice".into()), Some(4_000_000));
        assert_eq!(ledger.amount_for(&"bob".into()), Some(2_000_000));
        assert_eq!(ledger.total().unwrap(), 6_000_000);
    }

    #[test]
    fn remove_returns_exact_amount() {
        let mut ledger = PrizeLedger::new();
        ledger.credit("alice".into(), 3_000_000).unwrap();

        assert_eq!(ledger.remove(&"alice".into()), Some(3_000_000));
        assert_eq!(ledger.remove(&"alice".into()), None);
        assert!(ledger.is_empty());
    }

    #[test]
    fn credit_rejects_overflow() {
        let mut ledger = PrizeLedger::new();
        ledger.credit("alice".into(), u64::MAX).unwrap();

        assert!(matches!(
            ledger.credit("alice".into(), 1),
            Err(PoolError::AmountOverflow)
        ));
        // Failed credit leaves the entry untouched
        assert_eq!(ledger.amount_for(&"alice".into()), Some(u64::MAX));
    }
}
