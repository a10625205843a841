use crate::treasury::EscrowAddress;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identity of a caller, recipient or refund target. The
/// authentication substrate proving control of an identity lives outside
/// this crate; here an identity is just a stable address string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Identity {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Tag for the unit of value a store escrows. One store exists per
/// (organizer, asset) pair; stores of different assets never share state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetKind(String);

impl AssetKind {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetKind {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Key of a store: the organizer identity plus the escrowed asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoreId {
    organizer: Identity,
    asset: AssetKind,
}

impl StoreId {
    pub fn new(organizer: Identity, asset: AssetKind) -> Self {
        Self { organizer, asset }
    }

    pub fn organizer(&self) -> &Identity {
        &self.organizer
    }

    pub fn asset(&self) -> &AssetKind {
        &self.asset
    }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.organizer, self.asset)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreInfo {
    pub organizer: Identity,
    pub asset: AssetKind,
    pub refund_address: Identity,
    pub admins: Vec<Identity>,
    pub distribution_count: usize,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrizeEntry {
    pub recipient: Identity,
    pub amount: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionInfo {
    pub id: String,
    pub expiration: DateTime<Utc>,
    pub escrow: EscrowAddress,
    pub escrow_balance: u64,
    pub entries: Vec<PrizeEntry>,
    pub expired: bool,
}
