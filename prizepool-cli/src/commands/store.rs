use super::store_id;
use clap::Subcommand;
use comfy_table::{presets::UTF8_FULL, Table};
use prizepool_core::{AssetKind, DistributionManager, Identity, Result};

#[derive(Subcommand)]
pub enum StoreCommands {
    /// Initialize a distribution store for the caller
    Init {
        /// Organizer identity (becomes the immutable store owner)
        #[arg(long)]
        caller: String,
        /// Asset tag the store escrows
        #[arg(short, long, default_value = "points")]
        asset: String,
        /// Refund address for removed distributions and prizes
        #[arg(long)]
        refund_address: String,
        /// Initial admin identity (repeatable)
        #[arg(long = "admin")]
        admins: Vec<String>,
    },
    /// Show store details
    Info {
        /// Organizer identity
        organizer: String,
        /// Asset tag
        #[arg(short, long, default_value = "points")]
        asset: String,
    },
    /// List all stores
    List,
    /// Grant admin rights (owner only)
    AdminAdd {
        #[arg(long)]
        caller: String,
        /// Organizer identity of the store
        organizer: String,
        #[arg(short, long, default_value = "points")]
        asset: String,
        /// Identity to grant (repeatable)
        #[arg(long = "admin", required = true)]
        admins: Vec<String>,
    },
    /// Revoke admin rights (owner only)
    AdminRemove {
        #[arg(long)]
        caller: String,
        /// Organizer identity of the store
        organizer: String,
        #[arg(short, long, default_value = "points")]
        asset: String,
        /// Identity to revoke (repeatable)
        #[arg(long = "admin", required = true)]
        admins: Vec<String>,
    },
}

pub async fn handle_store_command(cmd: StoreCommands, manager: &DistributionManager) -> Result<()> {
    match cmd {
        StoreCommands::Init {
            caller,
            asset,
            refund_address,
            admins,
        } => {
            let id = manager
                .initialize_store(
                    &Identity::new(caller),
                    &AssetKind::new(asset),
                    admins.into_iter().map(Identity::new).collect(),
                    Identity::new(refund_address),
                )
                .await?;

            println!("Store initialized: {}", id);
        }

        StoreCommands::Info { organizer, asset } => {
            let info = manager.store_info(&store_id(&organizer, &asset)).await?;

            println!("Store Information:");
            println!("  Organizer: {}", info.organizer);
            println!("  Asset: {}", info.asset);
            println!("  Refund address: {}", info.refund_address);
            println!("  Distributions: {}", info.distribution_count);
            println!("  Created: {}", info.created_at);
            if info.admins.is_empty() {
                println!("  Admins: (none)");
            } else {
                println!("Admins:");
                for admin in info.admins {
                    println!("  - {}", admin);
                }
            }
        }

        StoreCommands::List => {
            let stores = manager.list_stores().await?;

            if stores.is_empty() {
                println!("No stores found.");
                println!("Create one with: prizepool store init --caller <identity> --refund-address <identity>");
                return Ok(());
            }

            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            table.set_header(vec!["Organizer", "Asset", "Refund", "Admins", "Distributions"]);

            for store in stores {
                table.add_row(vec![
                    store.organizer.to_string(),
                    store.asset.to_string(),
                    store.refund_address.to_string(),
                    store.admins.len().to_string(),
                    store.distribution_count.to_string(),
                ]);
            }

            println!("{}", table);
        }

        StoreCommands::AdminAdd {
            caller,
            organizer,
            asset,
            admins,
        } => {
            let added = manager
                .add_admins(
                    &Identity::new(caller),
                    &store_id(&organizer, &asset),
                    admins.into_iter().map(Identity::new).collect(),
                )
                .await?;

            if added.is_empty() {
                println!("No changes: all identities were already admins.");
            } else {
                for admin in added {
                    println!("Granted admin: {}", admin);
                }
            }
        }

        StoreCommands::AdminRemove {
            caller,
            organizer,
            asset,
            admins,
        } => {
            let removed = manager
                .remove_admins(
                    &Identity::new(caller),
                    &store_id(&organizer, &asset),
                    admins.into_iter().map(Identity::new).collect(),
                )
                .await?;

            if removed.is_empty() {
                println!("No changes: none of the identities were admins.");
            } else {
                for admin in removed {
                    println!("Revoked admin: {}", admin);
                }
            }
        }
    }

    Ok(())
}
