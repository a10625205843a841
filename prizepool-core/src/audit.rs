use crate::treasury::EscrowAddress;
use crate::types::{AssetKind, Identity, StoreId};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use uuid::Uuid;

/// Where a withdrawn prize went: back to the refund address (removal) or to
/// the recipient (claim). Claims reuse the withdrawal event shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WithdrawalKind {
    Removed,
    Claimed,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum AuditEventKind {
    StoreInitialized {
        organizer: Identity,
        asset: AssetKind,
        admins: Vec<Identity>,
        refund_address: Identity,
    },
    AdminsAdded {
        store: StoreId,
        added: Vec<Identity>,
    },
    AdminsRemoved {
        store: StoreId,
        removed: Vec<Identity>,
    },
    /// Carries the raw input lists, before duplicate recipients merge.
    DistributionAdded {
        store: StoreId,
        distribution_id: String,
        recipients: Vec<Identity>,
        amounts: Vec<u64>,
        escrow: EscrowAddress,
        expiration: DateTime<Utc>,
    },
    DistributionRemoved {
        store: StoreId,
        distribution_id: String,
        escrow: EscrowAddress,
        refunded: u64,
    },
    PrizeAdded {
        store: StoreId,
        distribution_id: String,
        recipient: Identity,
        amount: u64,
    },
    PrizeWithdrawn {
        store: StoreId,
        distribution_id: String,
        recipient: Identity,
        amount: u64,
        destination: Identity,
        kind: WithdrawalKind,
    },
    ExpirationUpdated {
        store: StoreId,
        distribution_id: String,
        expiration: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub id: Uuid,
    pub at: DateTime<Utc>,
    pub kind: AuditEventKind,
}

impl AuditEvent {
    pub fn new(at: DateTime<Utc>, kind: AuditEventKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            at,
            kind,
        }
    }
}

/// Immutable event log collaborator. One event per committed state
/// transition; sinks must not fail the operation that emitted the event.
pub trait AuditSink: Send + Sync {
    fn emit(&self, event: AuditEvent);
}

/// Sink that forwards events to the tracing pipeline.
#[derive(Debug, Default)]
pub struct LogSink;

impl AuditSink for LogSink {
    fn emit(&self, event: AuditEvent) {
        match serde_json::to_string(&event) {
            Ok(json) => tracing::info!(target: "prizepool::audit", "{}", json),
            Err(e) => tracing::warn!(target: "prizepool::audit", "Unserializable event: {}", e),
        }
    }
}

/// Sink that keeps events in memory for test inspection.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().clone()
    }
}

impl AuditSink for MemorySink {
    fn emit(&self, event: AuditEvent) {
        self.events.lock().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_id_and_type_tag() {
        let event = AuditEvent::new(
            Utc::now(),
            AuditEventKind::AdminsAdded {
                store: StoreId::new(Identity::new("org"), AssetKind::new("usd")),
                added: vec![Identity::new("a")],
            },
        );
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(&event.id.to_string()));
        assert!(json.contains(r#""type":"AdminsAdded""#));
    }
}
