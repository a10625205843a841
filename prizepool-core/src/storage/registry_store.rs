use crate::error::Result;
use crate::ledger::PrizeLedger;
use crate::storage::Storage;
use crate::treasury::EscrowAddress;
use crate::types::{AssetKind, Identity, StoreId};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};

/// Persisted form of a distribution. Holds the escrow account address only;
/// the live capability is reissued when the store is loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionRecord {
    pub id: String,
    pub ledger: PrizeLedger,
    pub expiration: DateTime<Utc>,
    pub escrow: EscrowAddress,
}

/// Persisted form of a store: one record per (organizer, asset), with the
/// full distribution map inline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreRecord {
    pub organizer: Identity,
    pub asset: AssetKind,
    pub refund_address: Identity,
    pub admins: Vec<Identity>,
    pub distributions: Vec<DistributionRecord>,
    pub created_at: DateTime<Utc>,
}

pub struct RegistryStore<'a> {
    storage: &'a Storage,
}

impl<'a> RegistryStore<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Insert a brand-new store row. Fails on the (organizer, asset)
    /// primary key if the store already exists, which makes the existence
    /// check and the insert one atomic step.
    pub async fn create_store(&self, record: &StoreRecord) -> Result<()> {
        let conn = self.storage.get_connection().await;

        let admins = serde_json::to_string(&record.admins)?;
        let distributions = serde_json::to_string(&record.distributions)?;

        conn.execute(
            "INSERT INTO stores
             (organizer, asset, refund_address, admins, distributions, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.organizer.as_str(),
                record.asset.as_str(),
                record.refund_address.as_str(),
                admins,
                distributions,
                record.created_at.timestamp(),
                Utc::now().timestamp(),
            ],
        )?;

        Ok(())
    }

    pub async fn save_store(&self, record: &StoreRecord) -> Result<()> {
        let conn = self.storage.get_connection().await;

        let admins = serde_json::to_string(&record.admins)?;
        let distributions = serde_json::to_string(&record.distributions)?;

        conn.execute(
            "INSERT OR REPLACE INTO stores
             (organizer, asset, refund_address, admins, distributions, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.organizer.as_str(),
                record.asset.as_str(),
                record.refund_address.as_str(),
                admins,
                distributions,
                record.created_at.timestamp(),
                Utc::now().timestamp(),
            ],
        )?;

        Ok(())
    }

    pub async fn load_store(&self, id: &StoreId) -> Result<Option<StoreRecord>> {
        let conn = self.storage.get_connection().await;

        let row: Option<(String, String, String, i64)> = conn
            .query_row(
                "SELECT refund_address, admins, distributions, created_at
                 FROM stores WHERE organizer = ?1 AND asset = ?2",
                params![id.organizer().as_str(), id.asset().as_str()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;

        match row {
            None => Ok(None),
            Some((refund, admins, distributions, created_at)) => Ok(Some(StoreRecord {
                organizer: id.organizer().clone(),
                asset: id.asset().clone(),
                refund_address: Identity::new(refund),
                admins: serde_json::from_str(&admins)?,
                distributions: serde_json::from_str(&distributions)?,
                created_at: DateTime::from_timestamp(created_at, 0).unwrap_or_else(Utc::now),
            })),
        }
    }

    pub async fn store_exists(&self, id: &StoreId) -> Result<bool> {
        let conn = self.storage.get_connection().await;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM stores WHERE organizer = ?1 AND asset = ?2",
            params![id.organizer().as_str(), id.asset().as_str()],
            |row| row.get(0),
        )?;

        Ok(count > 0)
    }

    pub async fn list_stores(&self) -> Result<Vec<StoreRecord>> {
        let conn = self.storage.get_connection().await;

        let mut stmt = conn.prepare(
            "SELECT organizer, asset, refund_address, admins, distributions, created_at
             FROM stores ORDER BY organizer, asset",
        )?;

        let rows = stmt.query_map([], |row| {
            let organizer: String = row.get(0)?;
            let asset: String = row.get(1)?;
            let refund: String = row.get(2)?;
            let admins: String = row.get(3)?;
            let distributions: String = row.get(4)?;
            let created_at: i64 = row.get(5)?;
            Ok((organizer, asset, refund, admins, distributions, created_at))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (organizer, asset, refund, admins, distributions, created_at) = row?;
            records.push(StoreRecord {
                organizer: Identity::new(organizer),
                asset: AssetKind::new(asset),
                refund_address: Identity::new(refund),
                admins: serde_json::from_str(&admins)?,
                distributions: serde_json::from_str(&distributions)?,
                created_at: DateTime::from_timestamp(created_at, 0).unwrap_or_else(Utc::now),
            });
        }

        Ok(records)
    }
}
