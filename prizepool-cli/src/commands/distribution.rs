use super::{parse_expiration, store_id};
use clap::Subcommand;
use comfy_table::{presets::UTF8_FULL, Table};
use dialoguer::Confirm;
use prizepool_core::{DistributionManager, Identity, PoolError, Result};

#[derive(Subcommand)]
pub enum DistributionCommands {
    /// Create and fund a distribution
    Add {
        #[arg(long)]
        caller: String,
        /// Organizer identity of the store
        organizer: String,
        #[arg(short, long, default_value = "points")]
        asset: String,
        /// Distribution id
        id: String,
        /// Recipient identity (repeatable, paired with --amount by position)
        #[arg(long = "recipient", required = true)]
        recipients: Vec<String>,
        /// Prize amount (repeatable, paired with --recipient by position)
        #[arg(long = "amount", required = true)]
        amounts: Vec<u64>,
        /// Expiration: RFC 3339 timestamp or +<seconds>
        #[arg(long)]
        expires: String,
    },
    /// Remove a distribution, refunding its whole escrow balance
    Remove {
        #[arg(long)]
        caller: String,
        /// Organizer identity of the store
        organizer: String,
        #[arg(short, long, default_value = "points")]
        asset: String,
        /// Distribution id
        id: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Overwrite a distribution's expiration
    SetExpiration {
        #[arg(long)]
        caller: String,
        /// Organizer identity of the store
        organizer: String,
        #[arg(short, long, default_value = "points")]
        asset: String,
        /// Distribution id
        id: String,
        /// Expiration: RFC 3339 timestamp or +<seconds>
        #[arg(long)]
        expires: String,
    },
    /// List distributions in a store
    List {
        /// Organizer identity of the store
        organizer: String,
        #[arg(short, long, default_value = "points")]
        asset: String,
    },
    /// Show a distribution's ledger and escrow balance
    Info {
        /// Organizer identity of the store
        organizer: String,
        #[arg(short, long, default_value = "points")]
        asset: String,
        /// Distribution id
        id: String,
    },
}

pub async fn handle_distribution_command(
    cmd: DistributionCommands,
    manager: &DistributionManager,
) -> Result<()> {
    match cmd {
        DistributionCommands::Add {
            caller,
            organizer,
            asset,
            id,
            recipients,
            amounts,
            expires,
        } => {
            let expiration = parse_expiration(&expires)?;
            let funded = manager
                .add_distribution(
                    &Identity::new(caller),
                    &store_id(&organizer, &asset),
                    &id,
                    recipients.into_iter().map(Identity::new).collect(),
                    amounts,
                    expiration,
                )
                .await?;

            println!("Distribution '{}' created.", id);
            println!("  Funded: {}", funded);
            println!("  Expires: {}", expiration);
        }

        DistributionCommands::Remove {
            caller,
            organizer,
            asset,
            id,
            force,
        } => {
            if !force {
                let confirm = Confirm::new()
                    .with_prompt(format!(
                        "Remove distribution '{}'? Unclaimed prizes are forfeited to the refund address. This action cannot be undone.",
                        id
                    ))
                    .default(false)
                    .interact()
                    .map_err(|e| PoolError::config(e.to_string()))?;

                if !confirm {
                    println!("Removal cancelled.");
                    return Ok(());
                }
            }

            let refunded = manager
                .remove_distribution(&Identity::new(caller), &store_id(&organizer, &asset), &id)
                .await?;
            println!("Distribution '{}' removed; {} refunded.", id, refunded);
        }

        DistributionCommands::SetExpiration {
            caller,
            organizer,
            asset,
            id,
            expires,
        } => {
            let expiration = parse_expiration(&expires)?;
            manager
                .update_prize_expiration(
                    &Identity::new(caller),
                    &store_id(&organizer, &asset),
                    &id,
                    expiration,
                )
                .await?;
            println!("Distribution '{}' now expires at {}.", id, expiration);
        }

        DistributionCommands::List { organizer, asset } => {
            let sid = store_id(&organizer, &asset);
            let ids = manager.list_distributions(&sid).await?;

            if ids.is_empty() {
                println!("No distributions in {}.", sid);
                return Ok(());
            }

            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            table.set_header(vec!["Id", "Escrow balance", "Entries", "Expires", "Status"]);

            for id in ids {
                let info = manager.distribution_info(&sid, &id).await?;
                table.add_row(vec![
                    info.id,
                    info.escrow_balance.to_string(),
                    info.entries.len().to_string(),
                    info.expiration.to_rfc3339(),
                    if info.expired { "Expired" } else { "Active" }.to_string(),
                ]);
            }

            println!("{}", table);
        }

        DistributionCommands::Info {
            organizer,
            asset,
            id,
        } => {
            let info = manager
                .distribution_info(&store_id(&organizer, &asset), &id)
                .await?;

            println!("Distribution '{}':", info.id);
            println!("  Escrow account: {}", info.escrow);
            println!("  Escrow balance: {}", info.escrow_balance);
            println!("  Expires: {}", info.expiration);
            println!("  Status: {}", if info.expired { "Expired" } else { "Active" });

            if info.entries.is_empty() {
                println!("  Prizes: (none)");
            } else {
                let mut table = Table::new();
                table.load_preset(UTF8_FULL);
                table.set_header(vec!["Recipient", "Amount"]);
                for entry in info.entries {
                    table.add_row(vec![entry.recipient.to_string(), entry.amount.to_string()]);
                }
                println!("{}", table);
            }
        }
    }

    Ok(())
}
