//! `frbctl` - CLI for frbvault
//!
//! Lists, submits and advances FRB records stored in the configured contract.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context};
use chrono::DateTime;
use clap::Parser;
use tracing::{debug, warn};

use frbvault::cli::{
    actions_label, Cli, Command, ConfigCommand, ListCommand, OutputFormat, ShowCommand,
};
use frbvault::config::Backend;
use frbvault::state::{Action, TxPhase};
use frbvault::{
    init_logging, AppState, Config, Error, KeyValueContract, LocalWallet, MemoryContract, Record,
    SqliteContract, Status, SyncSettings, Synchronizer, Wallet,
};

/// An opened contract plus the synchronizer and state that work on it.
struct Session {
    sync: Synchronizer<dyn KeyValueContract>,
    state: AppState,
    sqlite: Option<Arc<SqliteContract>>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let mut config = Config::load_from(cli.config.clone()).context("failed to load configuration")?;
    if let Some(account) = &cli.account {
        config.wallet.accounts = vec![account.clone()];
    }

    match cli.command {
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
        Command::List(list_cmd) => {
            let mut session = open_session(&config).await?;
            handle_list(&mut session, &list_cmd).await
        }
        Command::Show(show_cmd) => {
            let mut session = open_session(&config).await?;
            handle_show(&mut session, &show_cmd).await
        }
        Command::Submit(submit_cmd) => {
            let mut session = open_session(&config).await?;
            let result = session
                .sync
                .submit(&mut session.state, submit_cmd.into_draft())
                .await;
            print_banner(&mut session.state);
            let id = result?;
            println!("{id}");
            Ok(())
        }
        Command::Process(record_cmd) => {
            let mut session = open_session(&config).await?;
            handle_advance(&mut session, &record_cmd.id, Action::Process).await
        }
        Command::Analyze(record_cmd) => {
            let mut session = open_session(&config).await?;
            handle_advance(&mut session, &record_cmd.id, Action::Analyze).await
        }
        Command::Stats(stats_cmd) => {
            let mut session = open_session(&config).await?;
            handle_stats(&mut session, stats_cmd.json).await
        }
        Command::Status(status_cmd) => {
            let session = open_session(&config).await?;
            handle_status(&config, &session, status_cmd.json).await
        }
    }
}

async fn open_session(config: &Config) -> anyhow::Result<Session> {
    let (contract, sqlite): (Arc<dyn KeyValueContract>, Option<Arc<SqliteContract>>) =
        match config.contract.backend {
            Backend::Sqlite => {
                let path = config.database_path();
                let db = Arc::new(
                    SqliteContract::open(&path)
                        .with_context(|| format!("failed to open {}", path.display()))?,
                );
                (Arc::clone(&db) as Arc<dyn KeyValueContract>, Some(db))
            }
            Backend::Memory => {
                warn!("Using the in-memory contract; nothing is kept after exit");
                (Arc::new(MemoryContract::new()) as Arc<dyn KeyValueContract>, None)
            }
        };

    let wallet: Arc<dyn Wallet> = Arc::new(LocalWallet::new(config.wallet.accounts.clone()));
    let sync = Synchronizer::new(contract, SyncSettings::from_config(config)).with_wallet(wallet);
    let mut state = AppState::new(config.banner_timings());

    if config.wallet.accounts.is_empty() {
        debug!("No wallet accounts configured, running read-only");
    } else {
        sync.connect(&mut state).await?;
    }

    Ok(Session { sync, state, sqlite })
}

fn print_banner(state: &mut AppState) {
    state.clear_expired(Instant::now());
    if let Some(banner) = state.banner() {
        let tag = match banner.phase {
            TxPhase::Pending => "..",
            TxPhase::Success => "ok",
            TxPhase::Error => "!!",
        };
        eprintln!("[{tag}] {}", banner.message);
    }
}

fn format_timestamp(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .map_or_else(|| timestamp.to_string(), |dt| dt.format("%Y-%m-%d %H:%M").to_string())
}

async fn handle_list(session: &mut Session, cmd: &ListCommand) -> anyhow::Result<()> {
    session.sync.refresh(&mut session.state).await?;

    let filter = cmd.status.map(Status::from);
    let records: Vec<&Record> = session
        .state
        .records()
        .iter()
        .filter(|r| filter.map_or(true, |s| r.status == s))
        .collect();

    match cmd.format {
        OutputFormat::Json => {
            let rows: Vec<_> = records
                .iter()
                .map(|r| {
                    serde_json::json!({
                        "record": r,
                        "actions": session.state.available_actions(r),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        OutputFormat::Plain => {
            for r in records {
                println!(
                    "{} {} {} {}MHz {} {} [{}]",
                    r.id,
                    r.status,
                    r.observatory,
                    r.frequency,
                    r.signal_strength,
                    r.location,
                    actions_label(&session.state.available_actions(r))
                );
            }
        }
        OutputFormat::Table => {
            if records.is_empty() {
                println!("No records.");
                return Ok(());
            }
            println!(
                "{:<22} {:<10} {:<12} {:>10} {:>8} {:<16} {:<20} ACTIONS",
                "ID", "STATUS", "OBSERVATORY", "FREQ(MHz)", "STRENGTH", "SUBMITTED", "LOCATION"
            );
            for r in records {
                println!(
                    "{:<22} {:<10} {:<12} {:>10} {:>8} {:<16} {:<20} {}",
                    r.id,
                    r.status,
                    r.observatory,
                    r.frequency,
                    r.signal_strength,
                    format_timestamp(r.timestamp),
                    r.location,
                    actions_label(&session.state.available_actions(r))
                );
            }
        }
    }
    Ok(())
}

async fn handle_show(session: &mut Session, cmd: &ShowCommand) -> anyhow::Result<()> {
    session.sync.refresh(&mut session.state).await?;
    let record = session
        .state
        .record(&cmd.id)
        .ok_or_else(|| Error::not_found(&cmd.id))?;
    let decoded = record.decode_draft();

    if cmd.json {
        let value = serde_json::json!({
            "record": record,
            "draft": decoded.as_ref().ok(),
            "actions": session.state.available_actions(record),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("Record {}", record.id);
    println!("  Status:          {}", record.status);
    println!("  Observatory:     {}", record.observatory);
    println!("  Frequency:       {} MHz", record.frequency);
    println!("  Signal strength: {}", record.signal_strength);
    println!("  Location:        {}", record.location);
    println!("  Submitted:       {}", format_timestamp(record.timestamp));
    println!(
        "  Actions:         {}",
        actions_label(&session.state.available_actions(record))
    );
    match decoded {
        Ok(draft) => println!(
            "  Payload:         {} / {} / {} / {}",
            draft.observatory, draft.frequency, draft.signal_strength, draft.location
        ),
        Err(e) => println!("  Payload:         <undecodable: {e}>"),
    }
    Ok(())
}

async fn handle_advance(session: &mut Session, id: &str, action: Action) -> anyhow::Result<()> {
    if session.state.account().is_none() {
        return Err(Error::WalletNotConnected.into());
    }

    // Ownership is advisory: warn, but let the contract decide.
    if session.sync.refresh(&mut session.state).await.is_ok() {
        if let Some(record) = session.state.record(id) {
            if !session.state.available_actions(record).contains(&action) {
                warn!(
                    "Record {id} does not offer {:?} to this account; submitting anyway",
                    action
                );
            }
        }
    }

    let result = session
        .sync
        .advance(&mut session.state, id, action.target())
        .await;
    print_banner(&mut session.state);
    result?;
    Ok(())
}

async fn handle_stats(session: &mut Session, json: bool) -> anyhow::Result<()> {
    session.sync.refresh(&mut session.state).await?;
    let stats = session.state.stats();

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("Total:     {}", stats.total());
    for status in Status::ALL {
        let count = match status {
            Status::Raw => stats.raw,
            Status::Processed => stats.processed,
            Status::Analyzed => stats.analyzed,
        };
        println!(
            "{:<10} {count} ({:.1}%)",
            format!("{status}:"),
            stats.percentage(status)
        );
    }
    Ok(())
}

async fn handle_status(config: &Config, session: &Session, json: bool) -> anyhow::Result<()> {
    let contract = session.sync.table().contract();
    let available = contract.is_available().await.unwrap_or(false);
    let records = session.sync.table().read_index().await.map(|ids| ids.len()).ok();
    let db_stats = match &session.sqlite {
        Some(db) => Some(db.stats()?),
        None => None,
    };
    let account_writes = match (&session.sqlite, session.state.account()) {
        (Some(db), Some(account)) => Some(db.transactions_from(account)?),
        _ => None,
    };

    if json {
        let status = serde_json::json!({
            "backend": contract.backend_name(),
            "available": available,
            "account": session.state.account(),
            "database_path": session.sqlite.as_ref().map(|db| db.path().display().to_string()),
            "indexed_records": records,
            "database": db_stats,
            "account_writes": account_writes,
            "key_prefix": config.contract.key_prefix,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("frbctl status");
    println!("-------------");
    println!("Backend:         {}", contract.backend_name());
    println!("Available:       {}", if available { "yes" } else { "no" });
    println!(
        "Account:         {}",
        session.state.account().unwrap_or("(not connected)")
    );
    println!("Key prefix:      {}", config.contract.key_prefix);
    match records {
        Some(n) => println!("Indexed records: {n}"),
        None => println!("Indexed records: (unreadable)"),
    }
    if let (Some(db), Some(stats)) = (&session.sqlite, db_stats) {
        println!("Database:        {}", db.path().display());
        println!("  Keys:          {}", stats.keys);
        println!("  Transactions:  {}", stats.transactions);
        if let Some(writes) = account_writes {
            println!("  By account:    {writes}");
        }
        println!("  Size:          {} bytes", stats.db_size_bytes);
        if let Some(last) = stats.last_write {
            println!("  Last write:    {}", last.format("%Y-%m-%d %H:%M:%S UTC"));
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Contract]");
                println!("  Backend:             {:?}", config.contract.backend);
                println!("  Database path:       {}", config.database_path().display());
                println!("  Key prefix:          {}", config.contract.key_prefix);
                println!();
                println!("[Wallet]");
                println!("  Accounts:            {}", config.wallet.accounts.join(", "));
                println!();
                println!("[Workflow]");
                println!(
                    "  Observatories:       {}",
                    config.workflow.observatories.join(", ")
                );
                println!("  Compute delay (ms):  {}", config.workflow.compute_delay_ms);
                println!(
                    "  Enforce transitions: {}",
                    config.workflow.enforce_transitions
                );
                println!();
                println!("[Banner]");
                println!("  Success (ms):        {}", config.banner.success_dismiss_ms);
                println!("  Error (ms):          {}", config.banner.error_dismiss_ms);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => bail!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
