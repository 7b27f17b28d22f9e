use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use txledger::application::engine::LedgerEngine;
use txledger::config::LedgerConfig;
use txledger::infrastructure::in_memory::InMemoryStore;
use txledger::interfaces::batch::BatchRunner;
use txledger::interfaces::csv::command_reader::CommandReader;
use txledger::interfaces::csv::report_writer::{AccountWriter, TransactionWriter};
use txledger::logging::init_tracing;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input commands CSV file
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Write the transaction log as CSV to this file.
    #[arg(long)]
    journal: Option<PathBuf>,

    /// Maximum wait for a single lock, in milliseconds.
    #[arg(long, default_value_t = 10_000)]
    lock_timeout_ms: u64,

    /// Enable debug logging on stderr.
    #[arg(short, long)]
    verbose: bool,
}

fn build_engine(db_path: Option<PathBuf>, config: LedgerConfig) -> Result<LedgerEngine> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => {
            let store = txledger::infrastructure::rocksdb::RocksDBStore::open(path).into_diagnostic()?;
            Ok(LedgerEngine::from_store(store, config))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            eprintln!(
                "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            Ok(LedgerEngine::from_store(InMemoryStore::new(), config))
        }
        None => Ok(LedgerEngine::from_store(InMemoryStore::new(), config)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config =
        LedgerConfig::default().with_lock_timeout(Duration::from_millis(cli.lock_timeout_ms));
    let engine = build_engine(cli.db_path, config)?;

    // Process commands
    let file = File::open(cli.input).into_diagnostic()?;
    let reader = CommandReader::new(file);
    let mut runner = BatchRunner::new(&engine);
    for command in reader.commands() {
        match command {
            Ok(command) => {
                if let Err(e) = runner.apply(command).await {
                    let response = e.to_response();
                    eprintln!(
                        "Error processing command: {:?}: {}",
                        response.category, response.message
                    );
                }
            }
            Err(e) => {
                eprintln!("Error reading command: {}", e);
            }
        }
    }

    if let Some(path) = cli.journal {
        let transactions = engine.list_transactions().await.into_diagnostic()?;
        let mut writer = TransactionWriter::new(File::create(path).into_diagnostic()?);
        writer.write_transactions(&transactions).into_diagnostic()?;
    }

    // Output final state
    let accounts = engine.list_accounts().await.into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = AccountWriter::new(stdout.lock());
    writer.write_accounts(&accounts).into_diagnostic()?;

    Ok(())
}
