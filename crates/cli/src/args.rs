#![forbid(unsafe_code)]

use clap::{Args, Parser, Subcommand, ValueEnum};
use cl_storage::{PositionLock, PositionUpdatePolicy, StoreConfig};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(
    name = "charlist",
    version,
    about = "Positioned characteristic list with group rewrites",
    disable_help_subcommand = true
)]
pub struct Cli {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(
        long,
        value_enum,
        env = "CHARLIST_LOG_FORMAT",
        default_value = "text",
        global = true,
        help = "Log output format on stderr"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct StoreArgs {
    #[arg(
        long,
        env = "CHARLIST_STORAGE_DIR",
        default_value = ".charlist",
        global = true,
        value_name = "PATH",
        help = "Directory holding the store database"
    )]
    pub storage_dir: PathBuf,

    #[arg(
        long,
        env = "CHARLIST_BUSY_TIMEOUT_MS",
        default_value_t = 5_000,
        global = true,
        value_name = "MS",
        help = "How long a write waits for the database lock"
    )]
    pub busy_timeout_ms: u64,

    #[arg(
        long,
        env = "CHARLIST_POSITION_LOCK",
        default_value = "immediate",
        global = true,
        value_parser = parse_position_lock,
        help = "immediate | deferred"
    )]
    pub position_lock: PositionLock,

    #[arg(
        long,
        env = "CHARLIST_POSITION_UPDATE",
        default_value = "move",
        global = true,
        value_parser = parse_position_update,
        help = "What update does with a new position: move | overwrite"
    )]
    pub position_update: PositionUpdatePolicy,
}

impl StoreArgs {
    pub fn config(&self) -> StoreConfig {
        StoreConfig {
            busy_timeout: Duration::from_millis(self.busy_timeout_ms),
            position_lock: self.position_lock,
            position_update: self.position_update,
        }
    }
}

fn parse_position_lock(raw: &str) -> Result<PositionLock, String> {
    PositionLock::from_str(raw).ok_or_else(|| format!("unknown position lock `{raw}`"))
}

fn parse_position_update(raw: &str) -> Result<PositionUpdatePolicy, String> {
    PositionUpdatePolicy::from_str(raw)
        .ok_or_else(|| format!("unknown position update policy `{raw}`"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Insert one record, shifting the list when the slot is taken.
    Insert(InsertArgs),
    /// Print one record.
    Get { id: i64 },
    /// Print records in list order.
    List {
        #[arg(long, default_value_t = 100)]
        limit: usize,
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },
    /// Delete one record and close the gap it leaves.
    Delete { id: i64 },
    /// Move one record to a new position.
    Move { id: i64, position: i64 },
    /// Change fields of one record.
    Update {
        id: i64,
        #[arg(long = "set", value_name = "FIELD=VALUE", required = true)]
        assignments: Vec<String>,
    },
    /// Print the records grouped by normalized content.
    Groups,
    /// Replace the group containing a record with new members and content.
    RewriteGroup {
        #[arg(long, value_name = "ID")]
        from_record: i64,
        #[arg(long = "identifier", value_name = "IDENTIFIER", required = true)]
        identifiers: Vec<String>,
        #[arg(long = "set", value_name = "FIELD=VALUE")]
        assignments: Vec<String>,
    },
    /// Report positions held by more than one record.
    Audit,
    /// Print the change journal.
    Events {
        #[arg(long, value_name = "EVENT_ID", help = "Only events after this id")]
        since: Option<String>,
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
}

#[derive(Debug, Args)]
pub struct InsertArgs {
    #[arg(long)]
    pub identifier: String,
    #[arg(long)]
    pub characteristic: String,
    #[arg(long, default_value = "")]
    pub value: String,
    #[arg(long, default_value = "")]
    pub print_text: String,
    #[arg(long)]
    pub special_mark: Option<String>,
    #[arg(long)]
    pub department_code: Option<i64>,
    #[arg(long)]
    pub production_list: Option<i64>,
    #[arg(long, help = "Omit or pass 0 to insert unpositioned")]
    pub position: Option<i64>,
}
