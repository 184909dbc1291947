#![forbid(unsafe_code)]

use super::*;
use rusqlite::params;

impl SqliteStore {
    /// Journal rows with `seq > since_seq`, oldest first.
    pub fn list_events(&self, since_seq: i64, limit: usize) -> Result<Vec<EventRow>, StoreError> {
        let limit = to_sqlite_i64(limit)?;
        let mut stmt = self.conn.prepare(
            r#"
            SELECT seq, ts_ms, kind, record_id, payload_json
            FROM record_events
            WHERE seq > ?1
            ORDER BY seq ASC
            LIMIT ?2
            "#,
        )?;
        let rows = stmt.query_map(params![since_seq, limit], |row| {
            Ok(EventRow {
                seq: row.get(0)?,
                ts_ms: row.get(1)?,
                kind: row.get(2)?,
                record_id: row.get(3)?,
                payload_json: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

pub(super) fn insert_event_tx(
    tx: &Transaction<'_>,
    ts_ms: i64,
    kind: &str,
    record_id: Option<i64>,
    payload: &serde_json::Value,
) -> Result<i64, StoreError> {
    tx.execute(
        r#"
        INSERT INTO record_events(ts_ms, kind, record_id, payload_json)
        VALUES (?1, ?2, ?3, ?4)
        "#,
        params![ts_ms, kind, record_id, payload.to_string()],
    )?;
    Ok(tx.last_insert_rowid())
}

/// Accepts `evt_<16-digit-seq>` as printed by [`EventRow::event_id`].
pub fn parse_event_id(event_id: &str) -> Option<i64> {
    let digits = event_id.strip_prefix("evt_")?;
    digits.parse::<i64>().ok()
}
