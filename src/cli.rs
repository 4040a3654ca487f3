//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::fmt::Write as _;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_adapter::CsvTradeAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::config_validation::{DEFAULT_CURRENCY, DEFAULT_LOG_LEVEL, validate_config};
use crate::domain::details::PositionDetails;
use crate::domain::edit_policy::check_patch;
use crate::domain::error::JournalError;
use crate::domain::inconsistency::Inconsistency;
use crate::domain::money::Money;
use crate::domain::position::{PositionSummary, aggregate, group_positions};
use crate::domain::sub_events::{
    IncrementRequest, PartialExitRequest, plan_increment, plan_partial_exit,
};
use crate::domain::trade::{Trade, TradePatch, TradeType};
use crate::ports::config_port::ConfigPort;
use crate::ports::trade_port::TradePort;

/// Exit code of `check` when the journal holds inconsistent positions.
pub const EXIT_INCONSISTENT: u8 = 6;

#[derive(Parser, Debug)]
#[command(name = "positionbook", about = "Trade journal position summaries")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List every position in the journal
    List {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show one position with its history
    Show {
        #[arg(short, long)]
        config: PathBuf,
        /// Id of the position's entry trade
        #[arg(long)]
        position: u64,
    },
    /// Edit one trade record
    Update {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        id: u64,
        #[command(flatten)]
        fields: PatchArgs,
    },
    /// Delete one trade record, or with --position its whole position
    Delete {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        id: u64,
        /// Delete every record of the position the trade belongs to
        #[arg(long)]
        position: bool,
    },
    /// Record a partial exit against the open trade
    Exit {
        #[arg(short, long)]
        config: PathBuf,
        /// Id of the open trade
        #[arg(long)]
        id: u64,
        #[arg(long)]
        quantity: i64,
        #[arg(long)]
        date: NaiveDate,
        #[arg(long)]
        price: Money,
        /// Realized result, computed from the average entry price if omitted
        #[arg(long, allow_hyphen_values = true)]
        result: Option<Money>,
        #[arg(long)]
        observations: Option<String>,
    },
    /// Add size to the open trade
    Increment {
        #[arg(short, long)]
        config: PathBuf,
        /// Id of the open trade
        #[arg(long)]
        id: u64,
        #[arg(long)]
        quantity: i64,
        #[arg(long)]
        date: NaiveDate,
        #[arg(long)]
        price: Money,
        #[arg(long)]
        observations: Option<String>,
    },
    /// Aggregate every position and report inconsistencies
    Check {
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[derive(Args, Debug, Default)]
pub struct PatchArgs {
    #[arg(long)]
    pub entry_date: Option<NaiveDate>,
    #[arg(long)]
    pub entry_price: Option<Money>,
    #[arg(long)]
    pub quantity: Option<i64>,
    #[arg(long)]
    pub exit_date: Option<NaiveDate>,
    #[arg(long)]
    pub exit_price: Option<Money>,
    #[arg(long, allow_hyphen_values = true)]
    pub result: Option<Money>,
    #[arg(long)]
    pub observations: Option<String>,
    #[arg(long)]
    pub setup: Option<String>,
}

impl From<PatchArgs> for TradePatch {
    fn from(args: PatchArgs) -> Self {
        TradePatch {
            entry_date: args.entry_date,
            entry_price: args.entry_price,
            quantity: args.quantity,
            exit_date: args.exit_date,
            exit_price: args.exit_price,
            result: args.result,
            observations: args.observations,
            setup: args.setup,
        }
    }
}

/// An opened journal plus the display settings from its config.
pub struct Journal {
    pub port: CsvTradeAdapter,
    pub currency: String,
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::List { config } => with_journal(&config, run_list),
        Command::Show { config, position } => {
            with_journal(&config, |journal| run_show(journal, position))
        }
        Command::Update { config, id, fields } => {
            with_journal(&config, |journal| run_update(journal, id, fields.into()))
        }
        Command::Delete {
            config,
            id,
            position,
        } => with_journal(&config, |journal| {
            if position {
                run_delete_position(journal, id)
            } else {
                run_delete(journal, id)
            }
        }),
        Command::Exit {
            config,
            id,
            quantity,
            date,
            price,
            result,
            observations,
        } => {
            let request = PartialExitRequest {
                quantity,
                exit_date: date,
                exit_price: price,
                result,
                observations,
            };
            with_journal(&config, |journal| run_exit(journal, id, &request))
        }
        Command::Increment {
            config,
            id,
            quantity,
            date,
            price,
            observations,
        } => {
            let request = IncrementRequest {
                quantity,
                entry_date: date,
                entry_price: price,
                observations,
            };
            with_journal(&config, |journal| run_increment(journal, id, &request))
        }
        Command::Check { config } => with_journal(&config, run_check),
    }
}

fn with_journal(config_path: &PathBuf, command: impl FnOnce(&Journal) -> ExitCode) -> ExitCode {
    match open_journal(config_path) {
        Ok(journal) => command(&journal),
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, JournalError> {
    FileConfigAdapter::from_file(path).map_err(|e| JournalError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

pub fn open_journal(config_path: &PathBuf) -> Result<Journal, JournalError> {
    let config = load_config(config_path)?;
    validate_config(&config)?;
    init_logging(&config.get_string_or("log", "level", DEFAULT_LOG_LEVEL));

    let journal_path = config.get_string_or("journal", "path", "");
    let path = config.resolve_path(&journal_path);
    tracing::debug!(config = %config_path.display(), journal = %path.display(), "opened journal");

    Ok(Journal {
        port: CsvTradeAdapter::new(path),
        currency: config.get_string_or("display", "currency", DEFAULT_CURRENCY),
    })
}

/// `RUST_LOG` wins over the configured level. Later calls are no-ops.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.trim().to_lowercase()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn list_positions(port: &dyn TradePort) -> Result<Vec<PositionSummary>, JournalError> {
    group_positions(port.load_trades()?)
        .into_iter()
        .map(|trades| aggregate(trades).map_err(JournalError::from))
        .collect()
}

pub fn load_summary(port: &dyn TradePort, root_id: u64) -> Result<PositionSummary, JournalError> {
    Ok(aggregate(port.load_position(root_id)?)?)
}

fn position_of(port: &dyn TradePort, trade_id: u64) -> Result<u64, JournalError> {
    port.load_trades()?
        .iter()
        .find(|t| t.id == trade_id)
        .map(Trade::position_key)
        .ok_or(JournalError::TradeNotFound { id: trade_id })
}

/// Checks the edit against the position's policy, writes it, and returns the
/// re-aggregated position.
pub fn apply_update(
    port: &dyn TradePort,
    trade_id: u64,
    patch: &TradePatch,
) -> Result<PositionSummary, JournalError> {
    let root_id = position_of(port, trade_id)?;
    let before = load_summary(port, root_id)?;
    check_patch(&before, trade_id, patch)?;
    port.update_trade(trade_id, patch)?;
    load_summary(port, root_id)
}

/// Deletes one record and returns what remains of its position, if anything.
pub fn apply_delete(
    port: &dyn TradePort,
    trade_id: u64,
) -> Result<Option<PositionSummary>, JournalError> {
    let root_id = position_of(port, trade_id)?;
    port.delete_trade(trade_id)?;
    match load_summary(port, root_id) {
        Ok(summary) => Ok(Some(summary)),
        Err(JournalError::TradeNotFound { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Deletes every record of the position `trade_id` belongs to.
pub fn apply_delete_position(port: &dyn TradePort, trade_id: u64) -> Result<usize, JournalError> {
    let root_id = position_of(port, trade_id)?;
    port.delete_position(root_id)
}

/// Records a partial exit against the open trade and returns the
/// re-aggregated position.
pub fn apply_partial_exit(
    port: &dyn TradePort,
    trade_id: u64,
    request: &PartialExitRequest,
) -> Result<PositionSummary, JournalError> {
    let root_id = position_of(port, trade_id)?;
    let before = load_summary(port, root_id)?;
    let record = plan_partial_exit(&before, trade_id, request)?;
    port.insert_trade(record)?;
    load_summary(port, root_id)
}

/// Records an increment against the open trade and returns the
/// re-aggregated position.
pub fn apply_increment(
    port: &dyn TradePort,
    trade_id: u64,
    request: &IncrementRequest,
) -> Result<PositionSummary, JournalError> {
    let root_id = position_of(port, trade_id)?;
    let before = load_summary(port, root_id)?;
    let record = plan_increment(&before, trade_id, request)?;
    port.insert_trade(record)?;
    load_summary(port, root_id)
}

/// All inconsistencies in the journal, keyed by position id.
pub fn check_journal(port: &dyn TradePort) -> Result<Vec<(u64, Inconsistency)>, JournalError> {
    let summaries = list_positions(port)?;
    Ok(summaries
        .iter()
        .flat_map(|summary| {
            PositionDetails::build(summary)
                .inconsistencies
                .into_iter()
                .map(move |i| (summary.id, i))
        })
        .collect())
}

fn amount(value: Money, currency: &str) -> String {
    format!("{currency} {value}")
}

fn signed_amount(value: Money, currency: &str) -> String {
    let sign = if value.is_negative() { "-" } else { "+" };
    format!("{sign}{currency} {}", value.abs())
}

fn exit_label(trade_type: TradeType) -> &'static str {
    match trade_type {
        TradeType::Buy => "Partial sell",
        TradeType::Sell => "Partial buy",
    }
}

pub fn format_position_line(summary: &PositionSummary, currency: &str) -> String {
    format!(
        "#{:<5} {:<8} {:<4} {:<6} {:>6}/{:<6} {}",
        summary.id,
        summary.ticker,
        summary.trade_type,
        summary.status,
        summary.open_quantity,
        summary.initial_quantity,
        signed_amount(summary.total_realized_profit, currency),
    )
}

pub fn format_details(details: &PositionDetails<'_>, currency: &str) -> String {
    let summary = details.summary;
    let stats = &details.closed_stats;
    let mut out = String::new();

    let _ = writeln!(
        out,
        "{} ({}) #{} {}",
        summary.ticker, summary.trade_type, summary.id, summary.status
    );
    let _ = writeln!(
        out,
        "  Entry:          {} @ {}",
        summary.entry_date,
        amount(summary.entry_price, currency)
    );
    if summary.is_open() {
        let _ = writeln!(out, "  Initial qty:    {}", summary.initial_quantity);
        let _ = writeln!(out, "  Open qty:       {}", summary.open_quantity);
    } else {
        let _ = writeln!(out, "  Total qty:      {}", summary.initial_quantity);
    }
    let average = if stats.closed_count > 0 {
        amount(stats.average_exit_price, currency)
    } else {
        "-".to_string()
    };
    let _ = writeln!(out, "  Avg exit:       {average}");
    let last_exit = stats
        .last_exit_date
        .map(|d| d.to_string())
        .unwrap_or_else(|| "-".to_string());
    let _ = writeln!(out, "  Last exit:      {last_exit}");
    let _ = writeln!(
        out,
        "  Realized:       {}",
        signed_amount(summary.total_realized_profit, currency)
    );
    if let Some(ref setup) = summary.setup {
        let _ = writeln!(out, "  Setup:          {setup}");
    }
    if let Some(ref observations) = summary.observations {
        let _ = writeln!(out, "  Observations:   {observations}");
    }

    if !details.history_events.is_empty() {
        let _ = writeln!(out, "History:");
        for event in &details.history_events {
            if event.is_increment() {
                let _ = writeln!(
                    out,
                    "  {}  {:<13} {:>6} @ {}",
                    event.event_date(),
                    "Increment",
                    event.quantity,
                    amount(event.entry_price, currency)
                );
            } else {
                let price = event
                    .exit_price
                    .map(|p| amount(p, currency))
                    .unwrap_or_else(|| "-".to_string());
                let result = event
                    .result
                    .map(|r| signed_amount(r, currency))
                    .unwrap_or_default();
                let _ = writeln!(
                    out,
                    "  {}  {:<13} {:>6} @ {}  {}",
                    event.event_date(),
                    exit_label(summary.trade_type),
                    event.quantity,
                    price,
                    result
                );
            }
        }
    }

    if let Some(open) = details.open_trade {
        let _ = writeln!(out, "Open trade: #{} (accepts exit and increment)", open.id);
    }
    if details.partially_editable {
        let _ = writeln!(out, "Editing: quantity and entry price of #{} are locked", summary.id);
    }
    out
}

fn fail(e: JournalError) -> ExitCode {
    eprintln!("error: {e}");
    (&e).into()
}

fn run_list(journal: &Journal) -> ExitCode {
    let summaries = match list_positions(&journal.port) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    if summaries.is_empty() {
        eprintln!("No positions in {}", journal.port.path().display());
        return ExitCode::SUCCESS;
    }
    for summary in &summaries {
        println!("{}", format_position_line(summary, &journal.currency));
    }
    eprintln!("{} positions", summaries.len());
    ExitCode::SUCCESS
}

fn print_details(summary: &PositionSummary, currency: &str) {
    let details = PositionDetails::build(summary);
    print!("{}", format_details(&details, currency));
    for inconsistency in &details.inconsistencies {
        eprintln!("warning: {inconsistency}");
    }
}

fn run_show(journal: &Journal, position: u64) -> ExitCode {
    match load_summary(&journal.port, position) {
        Ok(summary) => {
            print_details(&summary, &journal.currency);
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

fn run_update(journal: &Journal, id: u64, patch: TradePatch) -> ExitCode {
    if patch.is_empty() {
        eprintln!("error: nothing to update, pass at least one field");
        return ExitCode::from(4);
    }
    match apply_update(&journal.port, id, &patch) {
        Ok(summary) => {
            eprintln!("Updated trade {id}");
            print_details(&summary, &journal.currency);
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

fn run_delete(journal: &Journal, id: u64) -> ExitCode {
    match apply_delete(&journal.port, id) {
        Ok(Some(summary)) => {
            eprintln!("Deleted trade {id}");
            print_details(&summary, &journal.currency);
            ExitCode::SUCCESS
        }
        Ok(None) => {
            eprintln!("Deleted trade {id}, position removed");
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

fn run_delete_position(journal: &Journal, id: u64) -> ExitCode {
    match apply_delete_position(&journal.port, id) {
        Ok(removed) => {
            eprintln!("Deleted position of trade {id} ({removed} records)");
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

fn run_exit(journal: &Journal, id: u64, request: &PartialExitRequest) -> ExitCode {
    match apply_partial_exit(&journal.port, id, request) {
        Ok(summary) => {
            eprintln!("Recorded partial exit of {} from trade {id}", request.quantity);
            print_details(&summary, &journal.currency);
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

fn run_increment(journal: &Journal, id: u64, request: &IncrementRequest) -> ExitCode {
    match apply_increment(&journal.port, id, request) {
        Ok(summary) => {
            eprintln!("Recorded increment of {} on trade {id}", request.quantity);
            print_details(&summary, &journal.currency);
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

fn run_check(journal: &Journal) -> ExitCode {
    let findings = match check_journal(&journal.port) {
        Ok(f) => f,
        Err(e) => return fail(e),
    };
    if findings.is_empty() {
        eprintln!("All positions consistent");
        return ExitCode::SUCCESS;
    }
    for (position, inconsistency) in &findings {
        println!("#{position}: {inconsistency}");
    }
    eprintln!("{} inconsistencies found", findings.len());
    ExitCode::from(EXIT_INCONSISTENT)
}
