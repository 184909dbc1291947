#![forbid(unsafe_code)]

//! `charlist` command line front end for the position store.
//!
//! Every command prints one pretty JSON document on stdout. Logs go to
//! stderr, filtered by `CHARLIST_LOG` (default `warn`).

mod args;
mod dto;
mod time;

use args::{Cli, Command, InsertArgs, LogFormat};
use cl_core::{ContentError, FieldError, RecordContent, RecordPatch};
use cl_storage::{
    InsertRecordRequest, ListRecordsRequest, RewriteGroupRequest, SqliteStore, StoreError,
    parse_event_id,
};
use clap::Parser;
use dto::{
    AuditDto, DeleteDto, ErrorDto, ErrorEnvelope, EventDto, GroupDto, RecordDto, RewriteDto,
};
use serde::Serialize;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_ENV: &str = "CHARLIST_LOG";

#[derive(Debug)]
enum CliError {
    Store(StoreError),
    Field(FieldError),
    Content(ContentError),
    Usage(&'static str),
    NotFound(i64),
    Output(serde_json::Error),
}

impl CliError {
    fn code(&self) -> &'static str {
        match self {
            Self::Store(err) => err.code(),
            Self::Field(_) | Self::Content(_) | Self::Usage(_) => "INVALID_INPUT",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Output(_) => "IO",
        }
    }

    fn exit_code(&self) -> u8 {
        match self.code() {
            "INVALID_INPUT" => 2,
            "NOT_FOUND" => 3,
            "CONFLICT" => 4,
            "TRANSACTION" | "TIMEOUT" => 5,
            _ => 1,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::Field(FieldError::TypeMismatch(field)) => {
                write!(f, "invalid value for {}", field.name())
            }
            Self::Field(err) => write!(f, "{}", err.message()),
            Self::Content(err) => write!(f, "{}", err.message()),
            Self::Usage(message) => write!(f, "{message}"),
            Self::NotFound(id) => write!(f, "record {id} not found"),
            Self::Output(err) => write!(f, "output: {err}"),
        }
    }
}

impl From<StoreError> for CliError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<FieldError> for CliError {
    fn from(value: FieldError) -> Self {
        Self::Field(value)
    }
}

impl From<ContentError> for CliError {
    fn from(value: ContentError) -> Self {
        Self::Content(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Output(value)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_format);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(code = err.code(), error = %err, "command failed");
            let envelope = ErrorEnvelope {
                error: ErrorDto {
                    code: err.code(),
                    message: err.to_string(),
                },
            };
            if let Ok(text) = serde_json::to_string_pretty(&envelope) {
                println!("{text}");
            }
            ExitCode::from(err.exit_code())
        }
    }
}

fn init_logging(format: LogFormat) {
    let env_filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_current_span(false)
                    .with_writer(std::io::stderr),
            )
            .init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let mut store = SqliteStore::open_with_config(&cli.store.storage_dir, cli.store.config())?;

    match cli.command {
        Command::Insert(args) => {
            let record = store.insert_record(insert_request(args))?;
            print_json(&RecordDto::from(record))
        }
        Command::Get { id } => {
            let record = store.get_record(id)?.ok_or(CliError::NotFound(id))?;
            print_json(&RecordDto::from(record))
        }
        Command::List { limit, offset } => {
            let records = store.list_records(ListRecordsRequest { limit, offset })?;
            let records: Vec<RecordDto> = records.into_iter().map(RecordDto::from).collect();
            print_json(&records)
        }
        Command::Delete { id } => {
            let outcome = store.delete_record(id)?;
            print_json(&DeleteDto::new(id, outcome))
        }
        Command::Move { id, position } => {
            let record = store.move_record(id, position)?;
            print_json(&RecordDto::from(record))
        }
        Command::Update { id, assignments } => {
            let patch = parse_patch(&assignments)?;
            let record = store.update_record(id, patch)?;
            print_json(&RecordDto::from(record))
        }
        Command::Groups => {
            let groups: Vec<GroupDto> = store
                .compute_groups()?
                .into_iter()
                .map(GroupDto::from)
                .collect();
            print_json(&groups)
        }
        Command::RewriteGroup {
            from_record,
            identifiers,
            assignments,
        } => {
            let request = rewrite_request(&store, from_record, identifiers, &assignments)?;
            let outcome = store.rewrite_group(request)?;
            print_json(&RewriteDto::from(outcome))
        }
        Command::Audit => print_json(&AuditDto::from(store.position_audit()?)),
        Command::Events { since, limit } => {
            let since_seq = match since.as_deref() {
                None => 0,
                Some(raw) => parse_event_id(raw)
                    .or_else(|| raw.parse::<i64>().ok())
                    .ok_or(CliError::Usage("--since expects evt_<seq> or a number"))?,
            };
            let events: Vec<EventDto> = store
                .list_events(since_seq, limit)?
                .into_iter()
                .map(EventDto::from)
                .collect();
            print_json(&events)
        }
    }
}

fn insert_request(args: InsertArgs) -> InsertRecordRequest {
    InsertRecordRequest {
        identifier: args.identifier,
        content: RecordContent {
            characteristic: args.characteristic,
            value: args.value,
            print_text: args.print_text,
            special_mark: args.special_mark,
            department_code: args.department_code,
            production_list: args.production_list,
        },
        position: args.position,
    }
}

fn parse_patch(assignments: &[String]) -> Result<RecordPatch, CliError> {
    let mut patch = RecordPatch::default();
    for assignment in assignments {
        patch.set_assignment(assignment)?;
    }
    Ok(patch)
}

/// Builds the rewrite from the group that currently holds `from_record`:
/// the group's content with `assignments` applied, kept at the group's
/// position unless `position=` is among them.
fn rewrite_request(
    store: &SqliteStore,
    from_record: i64,
    identifiers: Vec<String>,
    assignments: &[String],
) -> Result<RewriteGroupRequest, CliError> {
    let group = store
        .group_of_record(from_record)?
        .ok_or(CliError::NotFound(from_record))?;
    let patch = parse_patch(assignments)?;
    if patch.identifier.is_some() {
        return Err(CliError::Usage(
            "identifiers are given with --identifier, not --set",
        ));
    }

    let content = patch.apply_to_content(&group.content);
    content.validate()?;
    let position = patch.position.unwrap_or(group.position);
    tracing::debug!(
        from_record,
        members = group.member_count(),
        assignments = assignments.len(),
        "rewriting group"
    );

    Ok(RewriteGroupRequest {
        old_signature: group.signature,
        content,
        position,
        identifiers,
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
