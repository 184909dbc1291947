#![forbid(unsafe_code)]

mod audit;
mod config;
mod error;
mod events;
mod groups;
mod positions;
mod records;
mod requests;
mod txn;

pub use config::*;
pub use error::StoreError;
pub use events::parse_event_id;
pub use requests::*;

use cl_core::{ContentError, IdentifierError, Record, RecordContent};
use rusqlite::{Connection, OptionalExtension, Row, Transaction, params};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const SCHEMA_VERSION: i64 = 1;
const DB_FILE_NAME: &str = "charlist.db";

const RECORD_COLUMNS: &str = "id, identifier, characteristic, value, print_text, special_mark, \
     COALESCE(position, 0), department_code, production_list, created_at_ms, updated_at_ms";

#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    storage_dir: Option<PathBuf>,
    config: StoreConfig,
}

impl SqliteStore {
    pub fn open(storage_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::open_with_config(storage_dir, StoreConfig::default())
    }

    pub fn open_with_config(
        storage_dir: impl AsRef<Path>,
        config: StoreConfig,
    ) -> Result<Self, StoreError> {
        let storage_dir = storage_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&storage_dir)?;

        let conn = Connection::open(storage_dir.join(DB_FILE_NAME))?;
        Self::from_connection(conn, Some(storage_dir), config)
    }

    /// Private database that disappears with the store.
    pub fn open_in_memory(config: StoreConfig) -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, None, config)
    }

    fn from_connection(
        conn: Connection,
        storage_dir: Option<PathBuf>,
        config: StoreConfig,
    ) -> Result<Self, StoreError> {
        conn.busy_timeout(config.busy_timeout)?;
        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            "#,
        )?;

        preflight_gate(&conn)?;
        install_schema(&conn)?;

        debug!(
            storage_dir = ?storage_dir,
            position_lock = config.position_lock.as_str(),
            position_update = config.position_update.as_str(),
            "store opened"
        );
        Ok(Self {
            conn,
            storage_dir,
            config,
        })
    }

    /// `None` for in-memory stores.
    pub fn storage_dir(&self) -> Option<&Path> {
        self.storage_dir.as_deref()
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn db_file_name() -> &'static str {
        DB_FILE_NAME
    }
}

const REQUIRED_TABLES: [&str; 3] = ["store_state", "records", "record_events"];

fn existing_tables(conn: &Connection) -> Result<BTreeSet<String>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
    )?;
    let names = stmt.query_map([], |row| row.get::<_, String>(0))?;
    Ok(names.collect::<Result<_, rusqlite::Error>>()?)
}

/// Refuses to touch a database this build did not lay out. A fresh file passes.
fn preflight_gate(conn: &Connection) -> Result<(), StoreError> {
    let tables = existing_tables(conn)?;
    if tables.is_empty() {
        return Ok(());
    }

    if let Some(table) = tables
        .iter()
        .find(|table| !REQUIRED_TABLES.contains(&table.as_str()))
    {
        warn!(table = table.as_str(), "unexpected table in charlist database");
        return Err(StoreError::InvalidInput(
            "RESET_REQUIRED: unsupported tables detected",
        ));
    }
    if REQUIRED_TABLES.iter().any(|table| !tables.contains(*table)) {
        return Err(StoreError::InvalidInput(
            "RESET_REQUIRED: required table is missing",
        ));
    }

    let version: Option<i64> = conn
        .query_row(
            "SELECT schema_version FROM store_state WHERE singleton=1",
            [],
            |row| row.get(0),
        )
        .optional()?;
    match version {
        Some(SCHEMA_VERSION) => Ok(()),
        Some(found) => {
            warn!(found, expected = SCHEMA_VERSION, "charlist schema version mismatch");
            Err(StoreError::InvalidInput(
                "RESET_REQUIRED: schema version mismatch",
            ))
        }
        None => Err(StoreError::InvalidInput(
            "RESET_REQUIRED: schema state row is missing",
        )),
    }
}

fn install_schema(conn: &Connection) -> Result<(), StoreError> {
    let now_ms = now_ms();

    // No UNIQUE index on position: range shifts update many rows in one
    // statement and group members share a slot.
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS store_state (
          singleton INTEGER PRIMARY KEY CHECK(singleton = 1),
          schema_version INTEGER NOT NULL,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS records (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          identifier TEXT NOT NULL,
          characteristic TEXT NOT NULL,
          value TEXT NOT NULL,
          print_text TEXT NOT NULL,
          special_mark TEXT,
          position INTEGER NOT NULL DEFAULT 0 CHECK(position >= 0),
          department_code INTEGER,
          production_list INTEGER CHECK(production_list IS NULL OR production_list IN (0, 1)),
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_records_position
          ON records(position);

        CREATE INDEX IF NOT EXISTS idx_records_content
          ON records(characteristic, value, print_text, position);

        CREATE TABLE IF NOT EXISTS record_events (
          seq INTEGER PRIMARY KEY AUTOINCREMENT,
          ts_ms INTEGER NOT NULL,
          kind TEXT NOT NULL,
          record_id INTEGER,
          payload_json TEXT NOT NULL
        );
        "#,
    )?;

    conn.execute(
        "INSERT INTO store_state(singleton, schema_version, created_at_ms, updated_at_ms) \
         VALUES (1, ?1, ?2, ?2) \
         ON CONFLICT(singleton) DO UPDATE SET schema_version=excluded.schema_version, updated_at_ms=excluded.updated_at_ms",
        params![SCHEMA_VERSION, now_ms],
    )?;

    Ok(())
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<Record> {
    Ok(Record {
        id: row.get(0)?,
        identifier: row.get(1)?,
        content: RecordContent {
            characteristic: row.get(2)?,
            value: row.get(3)?,
            print_text: row.get(4)?,
            special_mark: row.get(5)?,
            department_code: row.get(7)?,
            production_list: row.get(8)?,
        },
        position: row.get(6)?,
        created_at_ms: row.get(9)?,
        updated_at_ms: row.get(10)?,
    })
}

fn load_record_tx(tx: &Transaction<'_>, id: i64) -> Result<Record, StoreError> {
    tx.query_row(
        &format!("SELECT {RECORD_COLUMNS} FROM records WHERE id=?1"),
        params![id],
        record_from_row,
    )
    .optional()?
    .ok_or(StoreError::UnknownId)
}

/// Writes one row verbatim. Position policy is the caller's business.
fn insert_record_row_tx(
    tx: &Transaction<'_>,
    identifier: &str,
    content: &RecordContent,
    position: i64,
    now_ms: i64,
) -> Result<i64, StoreError> {
    tx.execute(
        r#"
        INSERT INTO records(
            identifier, characteristic, value, print_text, special_mark,
            position, department_code, production_list, created_at_ms, updated_at_ms
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
        "#,
        params![
            identifier,
            content.characteristic,
            content.value,
            content.print_text,
            content.special_mark,
            position,
            content.department_code,
            content.production_list,
            now_ms
        ],
    )?;
    Ok(tx.last_insert_rowid())
}

fn invalid_content(err: ContentError) -> StoreError {
    StoreError::InvalidInput(err.message())
}

fn invalid_identifier(err: IdentifierError) -> StoreError {
    StoreError::InvalidInput(err.message())
}

fn to_sqlite_i64(value: usize) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|_| StoreError::InvalidInput("numeric overflow"))
}

fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(duration) => duration,
        Err(_) => return 0,
    };

    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}
