//! prizepool - Core library for escrowed prize distributions
//!
//! This library provides a store-centric API for registering prize
//! distributions: pools of funds held in escrow, claimable by their
//! recipients until an expiration deadline, with owner/admin authorization
//! over every mutation.

pub mod audit;
pub mod clock;
pub mod error;
pub mod ledger;
pub mod manager;
pub mod storage;
pub mod store;
pub mod treasury;
pub mod types;

pub use audit::{AuditEvent, AuditEventKind, AuditSink, LogSink, MemorySink, WithdrawalKind};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{PoolError, Result};
pub use ledger::PrizeLedger;
pub use manager::DistributionManager;
pub use storage::Storage;
pub use store::{Distribution, Store};
pub use treasury::{EscrowAddress, EscrowCap, SqliteTreasury, Treasury};
pub use types::{AssetKind, DistributionInfo, Identity, PrizeEntry, StoreId, StoreInfo};
