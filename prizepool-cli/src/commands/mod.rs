mod account;
mod distribution;
mod prize;
mod store;

pub use account::{handle_account_command, AccountCommands};
pub use distribution::{handle_distribution_command, DistributionCommands};
pub use prize::{handle_prize_command, PrizeCommands};
pub use store::{handle_store_command, StoreCommands};

use chrono::{DateTime, Duration, Utc};
use prizepool_core::{AssetKind, Identity, PoolError, Result, StoreId};

pub(crate) fn store_id(organizer: &str, asset: &str) -> StoreId {
    StoreId::new(Identity::new(organizer), AssetKind::new(asset))
}

/// Parse an expiration argument: either an RFC 3339 timestamp or a relative
/// offset like "+3600" (seconds from now).
pub(crate) fn parse_expiration(s: &str) -> Result<DateTime<Utc>> {
    if let Some(offset) = s.strip_prefix('+') {
        let seconds: i64 = offset.parse().map_err(|_| {
            PoolError::config(format!("Invalid relative expiration: {}", s))
        })?;
        return Ok(Utc::now() + Duration::seconds(seconds));
    }

    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| {
            PoolError::config(format!(
                "Invalid expiration '{}': expected RFC 3339 or +<seconds>",
                s
            ))
        })
}
