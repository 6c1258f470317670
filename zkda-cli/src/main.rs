//! Command-line client for the zkda ledger service.
//!
//! Builds transition batches from user intents, submits them to the
//! service, and reads back roots, history, and published transition
//! records from the availability network.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use zkda_client::{
    build_create_account, build_transfer, ClientConfig, LedgerClient, RetrieveState, RetryPolicy,
    TransitionReceipt, TransitionRetriever,
};
use zkda_common::{
    Account, Operation, OperationKind, TransitionBatch, TransitionRecord, VerifiableOperation,
};

#[derive(Parser)]
#[command(name = "zkda", about = "Client for the zkda ledger service")]
struct Cli {
    /// API server URL (overrides ZKDA_API_URL).
    #[arg(long)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account with an initial balance.
    CreateAccount {
        /// Account name.
        #[arg(long)]
        name: String,
        /// Initial balance.
        #[arg(long)]
        balance: u64,
    },
    /// Transfer funds between accounts.
    Transfer {
        /// Sender account.
        #[arg(long)]
        from: String,
        /// Receiver account.
        #[arg(long)]
        to: String,
        /// Amount to transfer.
        #[arg(long)]
        amount: u64,
    },
    /// Show an account's current state and inclusion proof.
    Balance {
        /// Account name.
        name: String,
    },
    /// Write a raw value under a key.
    Set {
        /// Target key.
        #[arg(long)]
        key: String,
        /// Value (UTF-8).
        #[arg(long)]
        value: String,
    },
    /// Show the current root and sync status.
    Status,
    /// Show the batch history.
    History,
    /// Fetch the published transition record at an availability height.
    Transition {
        /// Availability-network height to fetch.
        #[arg(long)]
        height: u64,
        /// Give up after a single attempt instead of backing off.
        #[arg(long)]
        no_retry: bool,
    },
    /// List published transition records in a height range.
    Transitions {
        /// First availability-network height (inclusive).
        #[arg(long)]
        from_height: u64,
        /// Last availability-network height (inclusive).
        #[arg(long)]
        to_height: u64,
    },
    /// Run a demo: create accounts, run transfers, show final state.
    Demo,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "zkda=info".into()),
        )
        .init();

    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let mut config = ClientConfig::from_env();
    if let Some(url) = cli.api_url {
        config.base_url = url;
    }
    let client = LedgerClient::new(config)?;

    if !client.health().await {
        bail!(
            "ledger service at {} is not reachable; is it running?",
            client.base_url()
        );
    }

    match cli.command {
        Commands::CreateAccount { name, balance } => create_account(&client, &name, balance).await,
        Commands::Transfer { from, to, amount } => transfer(&client, &from, &to, amount).await,
        Commands::Balance { name } => show_balance(&client, &name).await,
        Commands::Set { key, value } => set_value(&client, &key, &value).await,
        Commands::Status => show_status(&client).await,
        Commands::History => show_history(&client).await,
        Commands::Transition { height, no_retry } => {
            show_transition(&client, height, no_retry).await
        }
        Commands::Transitions {
            from_height,
            to_height,
        } => show_transitions(&client, from_height, to_height).await,
        Commands::Demo => run_demo(&client).await,
    }
}

async fn create_account(client: &LedgerClient, name: &str, balance: u64) -> Result<()> {
    if client.value(&zkda_common::account_key(name)).await?.is_some() {
        bail!("account '{name}' already exists");
    }

    info!(name, balance, "creating account");
    let batch = build_create_account(name, balance)?;
    let receipt = client.submit_transition(&batch).await?;

    println!("Account created:");
    println!("  Name: {name}");
    println!("  Balance: {balance}");
    print_receipt(&receipt);
    Ok(())
}

async fn transfer(client: &LedgerClient, from: &str, to: &str, amount: u64) -> Result<()> {
    info!(from, to, amount, "building transfer");
    let batch = build_transfer(client, from, to, amount).await?;
    let receipt = client.submit_transition(&batch).await?;

    println!("Transfer complete:");
    println!("  From: {from}");
    println!("  To: {to}");
    println!("  Amount: {amount}");
    print_receipt(&receipt);
    Ok(())
}

async fn show_balance(client: &LedgerClient, name: &str) -> Result<()> {
    let proven = client
        .value_with_proof(&zkda_common::account_key(name))
        .await?;

    match proven.value.as_deref().and_then(Account::decode) {
        Some(account) => {
            println!("Account: {name}");
            println!("  Balance: {}", account.balance);
            println!("  Nonce: {}", account.nonce);
            println!("  Root: {}", hex::encode(proven.root));
            println!("  Proof siblings: {}", proven.proof.siblings.len());
        }
        None => println!("Account '{name}' not found"),
    }
    Ok(())
}

async fn set_value(client: &LedgerClient, key: &str, value: &str) -> Result<()> {
    let old_value = client.value(key).await?;
    let new_value = value.as_bytes().to_vec();

    let batch = TransitionBatch {
        operations: vec![Operation::Insert {
            key: key.to_string(),
            value: new_value.clone(),
        }],
        public_inputs: format!("set:{key}").into_bytes(),
        private_inputs: vec![],
        verifiable_operations: vec![VerifiableOperation {
            kind: OperationKind::Set,
            key: key.to_string(),
            old_value,
            new_value: Some(new_value),
            witness_index: 0,
        }],
    };

    let receipt = client.submit_transition(&batch).await?;
    println!("Value set under '{key}'");
    print_receipt(&receipt);
    Ok(())
}

async fn show_status(client: &LedgerClient) -> Result<()> {
    let root = client.latest_root().await?;
    let sync = client.sync_status().await?;

    println!("=== Ledger Status ===");
    println!("Root: {}", hex::encode(root.root));
    println!("Transition index: {}", root.transition_index);
    println!("Celestia enabled: {}", sync.celestia_enabled);
    match sync.last_celestia_height {
        Some(height) => println!("Last published height: {height}"),
        None => println!("Last published height: none"),
    }
    Ok(())
}

async fn show_history(client: &LedgerClient) -> Result<()> {
    println!("=== Batch History ===");
    for entry in client.history().await? {
        print!("  {}: {}", entry.sequence, hex::encode(entry.root));
        if let Some(height) = entry.celestia_height {
            print!(" (celestia: {height})");
        }
        println!();
    }
    Ok(())
}

async fn show_transition(client: &LedgerClient, height: u64, no_retry: bool) -> Result<()> {
    let policy = if no_retry {
        RetryPolicy::no_retry()
    } else {
        RetryPolicy::default()
    };
    let retriever = TransitionRetriever::new(client.clone(), policy);

    retriever.select(height).await;
    match retriever.state().await {
        RetrieveState::Success(record) => print_record(&record),
        RetrieveState::Failed { message } => bail!(message),
        other => bail!("retrieval ended in unexpected state: {other:?}"),
    }
    Ok(())
}

async fn show_transitions(client: &LedgerClient, from_height: u64, to_height: u64) -> Result<()> {
    if from_height > to_height {
        bail!("from-height {from_height} is beyond to-height {to_height}");
    }

    let records = client.transitions_in_range(from_height, to_height).await?;
    if records.is_empty() {
        println!("No transitions published in heights {from_height}..={to_height}");
        return Ok(());
    }
    for record in &records {
        println!(
            "  seq {} at height {}: {} ({} byte proof)",
            record.sequence,
            record.celestia_height,
            hex::encode(&record.new_root[..8]),
            record.proof_size_bytes,
        );
    }
    Ok(())
}

async fn run_demo(client: &LedgerClient) -> Result<()> {
    println!("=== zkda Demo ===\n");

    // Receipts collected here are session-local convenience state; the
    // authoritative history is re-queried from the service below.
    let mut receipts: Vec<TransitionReceipt> = Vec::new();

    println!("--- Creating Accounts ---");
    let accounts = [("alice", 1000u64), ("bob", 500), ("charlie", 250)];
    for (name, balance) in &accounts {
        let batch = build_create_account(name, *balance)?;
        let receipt = client
            .submit_transition(&batch)
            .await
            .with_context(|| format!("creating account '{name}'"))?;
        println!(
            "Created {name}: balance={balance}, root={}",
            hex::encode(&receipt.new_root[..8])
        );
        receipts.push(receipt);
    }

    println!("\n--- Transfers ---");
    let transfers = [
        ("alice", "bob", 200u64),
        ("bob", "charlie", 100),
        ("charlie", "alice", 50),
    ];
    for (from, to, amount) in &transfers {
        let batch = build_transfer(client, from, to, *amount).await?;
        let receipt = client
            .submit_transition(&batch)
            .await
            .with_context(|| format!("transfer {from} -> {to}"))?;
        println!(
            "Transfer {from} -> {to} ({amount}): root={}",
            hex::encode(&receipt.new_root[..8])
        );
        receipts.push(receipt);
    }

    println!("\n--- Final Balances ---");
    for (name, _) in &accounts {
        let value = client.value(&zkda_common::account_key(name)).await?;
        if let Some(account) = value.as_deref().and_then(Account::decode) {
            println!("{name}: balance={}, nonce={}", account.balance, account.nonce);
        }
    }

    println!("\n--- Session Receipts ---");
    for receipt in &receipts {
        print!(
            "  seq {}: {}",
            receipt.sequence,
            hex::encode(&receipt.new_root[..8])
        );
        if let Some(height) = receipt.celestia_height {
            print!(" (celestia: {height})");
        }
        println!();
    }

    println!("\n--- Service History ---");
    for entry in client.history().await? {
        print!("  {}: {}", entry.sequence, hex::encode(&entry.root[..8]));
        if let Some(height) = entry.celestia_height {
            print!(" (celestia: {height})");
        }
        println!();
    }

    println!("\n=== Demo Complete ===");
    Ok(())
}

fn print_receipt(receipt: &TransitionReceipt) {
    println!("  Sequence: {}", receipt.sequence);
    println!("  Root: {}", hex::encode(receipt.new_root));
    println!("  Proof size: {} bytes", receipt.proof_size_bytes);
    match receipt.celestia_height {
        Some(height) => println!("  Celestia height: {height}"),
        None => println!("  Celestia height: pending publication"),
    }
}

fn print_record(record: &TransitionRecord) {
    println!("Transition record:");
    println!("  Sequence: {}", record.sequence);
    println!("  Prev root: {}", hex::encode(record.prev_root));
    println!("  New root: {}", hex::encode(record.new_root));
    println!("  Program hash: {}", hex::encode(record.program_hash));
    println!("  Proof size: {} bytes", record.proof_size_bytes);
    println!("  Public inputs: {}", String::from_utf8_lossy(&record.public_inputs));
    println!("  Celestia height: {}", record.celestia_height);
}
