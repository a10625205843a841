use super::store_id;
use clap::Subcommand;
use prizepool_core::{DistributionManager, Identity, Result};

#[derive(Subcommand)]
pub enum PrizeCommands {
    /// Add (merge) a prize for a recipient, funded by the caller
    Add {
        #[arg(long)]
        caller: String,
        /// Organizer identity of the store
        organizer: String,
        #[arg(short, long, default_value = "points")]
        asset: String,
        /// Distribution id
        distribution: String,
        /// Recipient identity
        recipient: String,
        /// Amount to add
        amount: u64,
    },
    /// Remove a recipient's prize, refunding its amount
    Remove {
        #[arg(long)]
        caller: String,
        /// Organizer identity of the store
        organizer: String,
        #[arg(short, long, default_value = "points")]
        asset: String,
        /// Distribution id
        distribution: String,
        /// Recipient identity
        recipient: String,
    },
    /// Claim the caller's own prize
    Claim {
        #[arg(long)]
        caller: String,
        /// Organizer identity of the store
        organizer: String,
        #[arg(short, long, default_value = "points")]
        asset: String,
        /// Distribution id
        distribution: String,
    },
}

pub async fn handle_prize_command(cmd: PrizeCommands, manager: &DistributionManager) -> Result<()> {
    match cmd {
        PrizeCommands::Add {
            caller,
            organizer,
            asset,
            distribution,
            recipient,
            amount,
        } => {
            let recipient = Identity::new(recipient);
            let total = manager
                .add_prize(
                    &Identity::new(caller),
                    &store_id(&organizer, &asset),
                    &distribution,
                    recipient.clone(),
                    amount,
                )
                .await?;
            println!("Prize added: {} now holds {} in '{}'.", recipient, total, distribution);
        }

        PrizeCommands::Remove {
            caller,
            organizer,
            asset,
            distribution,
            recipient,
        } => {
            let recipient = Identity::new(recipient);
            let refunded = manager
                .remove_prize(
                    &Identity::new(caller),
                    &store_id(&organizer, &asset),
                    &distribution,
                    &recipient,
                )
                .await?;
            println!(
                "Prize removed: {} refunded from {}'s entry in '{}'.",
                refunded, recipient, distribution
            );
        }

        PrizeCommands::Claim {
            caller,
            organizer,
            asset,
            distribution,
        } => {
            let caller = Identity::new(caller);
            let amount = manager
                .claim_prize(&caller, &store_id(&organizer, &asset), &distribution)
                .await?;
            println!("Claimed {} from '{}' for {}.", amount, distribution, caller);
        }
    }

    Ok(())
}
