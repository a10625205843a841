use clap::Subcommand;
use prizepool_core::{DistributionManager, Identity, Result};

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Credit an identity account in the local treasury
    Deposit {
        /// Identity to credit
        identity: String,
        /// Amount to deposit
        amount: u64,
    },
    /// Show an identity account balance
    Balance {
        /// Identity to inspect
        identity: String,
    },
}

pub async fn handle_account_command(
    cmd: AccountCommands,
    manager: &DistributionManager,
) -> Result<()> {
    match cmd {
        AccountCommands::Deposit { identity, amount } => {
            let identity = Identity::new(identity);
            manager.treasury().deposit(&identity, amount).await?;
            let balance = manager.treasury().balance_of(&identity).await?;
            println!("Deposited {} to {}. Balance: {}", amount, identity, balance);
        }

        AccountCommands::Balance { identity } => {
            let identity = Identity::new(identity);
            let balance = manager.treasury().balance_of(&identity).await?;
            println!("{}: {}", identity, balance);
        }
    }

    Ok(())
}
