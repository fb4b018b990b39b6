use abyssal_vault::config;
use abyssal_vault::db::Db;
use abyssal_vault::db::repo::{LedgerRepo, LedgerRepository};
use abyssal_vault::models::types::{AccountId, ItemEntry};
use abyssal_vault::protocol::{AddonFramer, VaultMessage};
use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::sync::Arc;

// cargo run --bin abyssal-vault -- grant --account 7 --entry 2589 --count 20
//
// Grant and revoke write the table directly. A server that has the account resident keeps its
// cached counts and overwrites them on its next write, so only run them while the account is
// offline.

#[derive(Debug, Parser)]
#[command(name = "abyssal-vault", version, about = "Inspect and maintain the Abyssal Storage ledger")]
struct Args {
    /// Override database URL (if omitted, use env/config)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Debug, Subcommand)]
enum Cmd {
    /// Run the embedded migrations
    Migrate,
    /// List accounts that own at least one vault row
    Accounts,
    /// Print the vault contents of an account
    Show {
        #[arg(long)]
        account: u32,
    },
    /// Add items to an account's vault (account must be offline)
    Grant {
        #[arg(long)]
        account: u32,
        #[arg(long)]
        entry: u32,
        #[arg(long)]
        count: u32,
    },
    /// Remove items from an account's vault (account must be offline)
    Revoke {
        #[arg(long)]
        account: u32,
        #[arg(long)]
        entry: u32,
        /// Everything when omitted
        #[arg(long)]
        count: Option<u32>,
    },
    /// Print the addon messages a full sync would send for an account
    SyncPreview {
        #[arg(long)]
        account: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;
    let args = Args::parse();

    // load config from env
    let cfg = Arc::new(config::Config::from_env()?);

    // allow overriding the DSN from CLI
    let database_url = args.database_url.as_deref().unwrap_or(&cfg.database_url);

    let db = Arc::new(Db::new(database_url)?);
    db.init().await?;
    let ledger = LedgerRepository::new(db.clone());

    match args.cmd {
        Cmd::Migrate => println!("Migrations are up to date."),
        Cmd::Accounts => {
            for account in ledger.list_accounts().await? {
                println!("{account}");
            }
        }
        Cmd::Show { account } => {
            let items = sorted(ledger.load_account(AccountId(account)).await?);
            if items.is_empty() {
                println!("Vault of account {account} is empty.");
            }
            for (entry, count) in items {
                println!("{:>8}  x{count}", entry.get());
            }
        }
        Cmd::Grant { account, entry, count } => {
            grant(&ledger, AccountId(account), ItemEntry(entry), count).await?;
        }
        Cmd::Revoke { account, entry, count } => {
            revoke(&ledger, AccountId(account), ItemEntry(entry), count).await?;
        }
        Cmd::SyncPreview { account } => {
            let items = sorted(ledger.load_account(AccountId(account)).await?);
            let framer = AddonFramer::new(cfg.vault.addon_prefix.clone(), cfg.vault.max_message_len);
            for chunk in framer.frame_message(&VaultMessage::sync(&items)) {
                println!("{} ({} bytes)", chunk.replace('\t', "\\t"), chunk.len());
            }
        }
    }

    Ok(())
}

async fn grant(ledger: &LedgerRepository, account: AccountId, entry: ItemEntry, count: u32) -> anyhow::Result<()> {
    if count == 0 {
        bail!("count must be positive");
    }
    let have = ledger.load_account(account).await?.get(&entry).copied().unwrap_or(0);
    let Some(total) = have.checked_add(count) else {
        bail!("account {account} holds {have} x {entry}, adding {count} would exceed {}", u32::MAX);
    };

    ledger
        .add_count(account, entry, count)
        .await
        .with_context(|| format!("granting {count} x {entry} to account {account}"))?;
    tracing::info!(account = %account, entry = %entry, count, total, "granted");
    Ok(())
}

async fn revoke(ledger: &LedgerRepository, account: AccountId, entry: ItemEntry, count: Option<u32>) -> anyhow::Result<()> {
    let have = ledger.load_account(account).await?.get(&entry).copied().unwrap_or(0);
    if have == 0 {
        bail!("account {account} has no item {entry} in the vault");
    }

    let take = count.unwrap_or(have);
    if take > have {
        bail!("account {account} only holds {have} x {entry}");
    }

    if take == have {
        ledger.delete_row(account, entry).await?;
    } else {
        ledger.set_count(account, entry, have - take).await?;
    }
    tracing::info!(account = %account, entry = %entry, count = take, left = have - take, "revoked");
    Ok(())
}

fn sorted(items: std::collections::HashMap<ItemEntry, u32>) -> BTreeMap<ItemEntry, u32> {
    items.into_iter().collect()
}

fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::{EnvFilter, prelude::*};

    color_eyre::install().map_err(|e| anyhow::anyhow!("{e}"))?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_timer(tracing_subscriber::fmt::time::uptime()),
        )
        .with(tracing_error::ErrorLayer::default())
        .init();
    Ok(())
}
