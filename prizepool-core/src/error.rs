use crate::types::{AssetKind, Identity};
use chrono::{DateTime, Utc};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PoolError>;

#[derive(Error, Debug)]
pub enum PoolError {
    #[error("Store already exists for {organizer}/{asset}")]
    StoreExists {
        organizer: Identity,
        asset: AssetKind,
    },

    #[error("Store not found for {organizer}/{asset}")]
    StoreNotFound {
        organizer: Identity,
        asset: AssetKind,
    },

    #[error("Distribution already exists: {id}")]
    DistributionExists { id: String },

    #[error("Distribution not found: {id}")]
    DistributionNotFound { id: String },

    #[error("No prize for recipient: {recipient}")]
    PrizeNotFound { recipient: Identity },

    #[error("Distribution expired: {id}")]
    Expired { id: String },

    #[error("Identity list must not be empty")]
    EmptyList,

    #[error("Length mismatch: {recipients} recipients, {amounts} amounts")]
    LengthMismatch { recipients: usize, amounts: usize },

    #[error("Expiration must be in the future: {expiration}")]
    InvalidExpiration { expiration: DateTime<Utc> },

    #[error("Caller is not the store owner")]
    NotOwner,

    #[error("Caller is neither store owner nor admin")]
    NotOwnerOrAdmin,

    #[error("Insufficient funds: need {need}, have {available}")]
    InsufficientFunds { need: u64, available: u64 },

    #[error("Amount overflow")]
    AmountOverflow,

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PoolError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
