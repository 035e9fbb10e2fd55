pub mod accounts;
pub mod balance;
pub mod init;
pub mod irregular;
pub mod ledger;
pub mod recurring;
pub mod transactions;

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand, ValueEnum};
use rusqlite::Connection;

use crate::config::{ForecastMode, ProjectionConfig};
use crate::db::{get_connection, init_db};
use crate::error::{Result, RunwayError};
use crate::settings::{load_settings, Settings};
use crate::store;

pub(crate) fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub(crate) fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| RunwayError::InvalidDate(s.to_string()))
}

/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM` and `YYYY-MM-DD HH:MM:SS` (or with `T`).
pub(crate) fn parse_timestamp(s: &str) -> Result<NaiveDateTime> {
    let s = s.trim();
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(ts);
        }
    }
    parse_date(s).map(store::day_start)
}

pub(crate) fn parse_date_opt(s: Option<&str>) -> Result<Option<NaiveDate>> {
    s.map(parse_date).transpose()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Deterministic,
    MonteCarlo,
}

impl From<ModeArg> for ForecastMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Deterministic => ForecastMode::Deterministic,
            ModeArg::MonteCarlo => ForecastMode::MonteCarlo,
        }
    }
}

/// Open database, resolved account and the projection settings for one command.
pub struct Context {
    pub conn: Connection,
    pub account_id: i64,
    pub account: String,
    pub config: ProjectionConfig,
}

impl Context {
    pub fn connect(db: Option<&Path>) -> Result<(Connection, Settings)> {
        let settings = load_settings();
        let path = db.map(Path::to_path_buf).unwrap_or_else(|| settings.db_path());
        if !path.exists() {
            return Err(RunwayError::Other(format!(
                "No database at {}. Run `runway init` first.",
                path.display()
            )));
        }
        let conn = get_connection(&path)?;
        init_db(&conn)?;
        Ok((conn, settings))
    }

    pub fn open(db: Option<&Path>, account: Option<&str>) -> Result<Self> {
        let (conn, settings) = Self::connect(db)?;
        let account = account.map(str::to_string).unwrap_or(settings.default_account);
        let account_id = store::account_id(&conn, &account)?;
        Ok(Self { conn, account_id, account, config: settings.projection })
    }

    /// The configured projection settings with command-line overrides applied.
    pub fn config_with(&self, mode: Option<ModeArg>, seed: Option<u64>, paths: Option<usize>) -> ProjectionConfig {
        let mut config = self.config;
        if let Some(mode) = mode {
            config = config.with_mode(mode.into());
        }
        if let Some(seed) = seed {
            config = config.with_seed(seed);
        }
        if let Some(paths) = paths {
            config.monte_carlo.paths = paths;
        }
        config
    }
}

#[derive(Parser)]
#[command(name = "runway", version, about = "Forward-looking ledger: see where your balance is heading.")]
pub struct Cli {
    /// Database file to use instead of the configured data directory
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,
    /// Account name (default: the account set in settings)
    #[arg(long, global = true)]
    pub account: Option<String>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the data directory and initialize the database.
    Init {
        /// Path for Runway data (default: the platform data dir)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Manage accounts.
    Accounts {
        #[command(subcommand)]
        command: AccountsCommands,
    },
    /// Record and inspect posted transactions.
    Txn {
        #[command(subcommand)]
        command: TxnCommands,
    },
    /// Manage recurring bills and income.
    Recurring {
        #[command(subcommand)]
        command: RecurringCommands,
    },
    /// Set or show the balance snapshot the ledger is anchored to.
    Balance {
        #[command(subcommand)]
        command: BalanceCommands,
    },
    /// Irregular spending categories, their rules and forecasts.
    Irregular {
        #[command(subcommand)]
        command: IrregularCommands,
    },
    /// Print the projected ledger with running balance.
    Ledger {
        /// First date to show: YYYY-MM-DD (default: today)
        #[arg(long = "from")]
        from_date: Option<String>,
        /// Number of rows to print
        #[arg(long, default_value = "25")]
        limit: usize,
        /// Forecast mode for irregular categories
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,
        /// Monte Carlo seed, for reproducible output
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[derive(Subcommand)]
pub enum AccountsCommands {
    /// Add a new account.
    Add {
        name: String,
        /// Account type, e.g. checking, savings
        #[arg(long = "type", default_value = "checking")]
        account_type: String,
    },
    /// List all accounts.
    List,
}

#[derive(Subcommand)]
pub enum TxnCommands {
    /// Record a posted transaction. Negative amounts are debits.
    Add {
        description: String,
        #[arg(allow_hyphen_values = true)]
        amount: f64,
        /// YYYY-MM-DD or YYYY-MM-DD HH:MM (default: now)
        #[arg(long)]
        date: Option<String>,
    },
    /// List posted transactions.
    List {
        #[arg(long = "from")]
        from_date: Option<String>,
        #[arg(long = "to")]
        to_date: Option<String>,
    },
    /// Delete a posted transaction by ID.
    Delete { id: i64 },
}

#[derive(Subcommand)]
pub enum RecurringCommands {
    /// Add a recurring schedule. The sign is set by --income.
    Add {
        description: String,
        #[arg(allow_hyphen_values = true)]
        amount: f64,
        /// First occurrence: YYYY-MM-DD
        #[arg(long)]
        start: String,
        /// weekly, biweekly, semi-monthly, monthly, quarterly, semi-annually, annually
        #[arg(long)]
        frequency: String,
        /// Treat as income (credit)
        #[arg(long)]
        income: bool,
    },
    /// List recurring schedules with their next due date.
    List,
    /// Delete a recurring schedule by ID.
    Delete { id: i64 },
}

#[derive(Subcommand)]
pub enum BalanceCommands {
    /// Replace the balance snapshot.
    Set {
        #[arg(allow_hyphen_values = true)]
        amount: f64,
        /// YYYY-MM-DD or YYYY-MM-DD HH:MM (default: now)
        #[arg(long)]
        at: Option<String>,
    },
    /// Show the current balance snapshot.
    Show,
}

#[derive(Subcommand)]
pub enum IrregularCommands {
    /// Create an irregular spending category.
    Category {
        name: String,
        /// Lookback horizon for learning, in days
        #[arg(long = "window-days", default_value = "120")]
        window_days: i64,
        /// Smoothing factor in (0, 1]
        #[arg(long, default_value = "0.3")]
        alpha: f64,
    },
    /// Route descriptions containing PATTERN to a category.
    Rule { category: String, pattern: String },
    /// List categories with their learned state.
    List,
    /// Re-learn a category from posted history.
    Learn {
        category: String,
        #[arg(long = "from")]
        from_date: Option<String>,
        #[arg(long = "to")]
        to_date: Option<String>,
    },
    /// Forecast a category's future spending.
    Forecast {
        category: String,
        #[arg(long = "from")]
        from_date: Option<String>,
        #[arg(long = "to")]
        to_date: Option<String>,
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,
        /// Number of simulated paths
        #[arg(long)]
        paths: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamp_forms() {
        let day = NaiveDate::from_ymd_opt(2023, 4, 2).unwrap();
        assert_eq!(parse_timestamp("2023-04-02").unwrap(), store::day_start(day));
        assert_eq!(parse_timestamp("2023-04-02 08:30").unwrap(), day.and_hms_opt(8, 30, 0).unwrap());
        assert_eq!(parse_timestamp("2023-04-02T08:30:15").unwrap(), day.and_hms_opt(8, 30, 15).unwrap());
        assert!(matches!(parse_timestamp("04/02/2023"), Err(RunwayError::InvalidDate(_))));
    }

    #[test]
    fn test_cli_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["runway", "ledger", "--db", "/tmp/x.db", "--account", "Savings", "--limit", "5"]).unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/x.db")));
        assert_eq!(cli.account.as_deref(), Some("Savings"));
        assert!(matches!(cli.command, Commands::Ledger { limit: 5, .. }));
    }

    #[test]
    fn test_negative_amount_is_not_a_flag() {
        let cli = Cli::try_parse_from(["runway", "txn", "add", "Coffee", "-4.50"]).unwrap();
        match cli.command {
            Commands::Txn { command: TxnCommands::Add { amount, .. } } => assert_eq!(amount, -4.5),
            _ => panic!("expected txn add"),
        }
    }
}
