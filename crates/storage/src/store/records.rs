#![forbid(unsafe_code)]

use super::events::insert_event_tx;
use super::positions::{claim_position_tx, move_position_tx, position_taken_tx, shift_down_tx};
use super::*;
use cl_core::{FieldValue, Identifier, RecordPatch, check_position};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter};
use serde_json::json;
use tracing::warn;

impl SqliteStore {
    pub fn insert_record(&mut self, request: InsertRecordRequest) -> Result<Record, StoreError> {
        let InsertRecordRequest {
            identifier,
            content,
            position,
        } = request;

        let identifier = Identifier::try_new(identifier).map_err(invalid_identifier)?;
        content.validate().map_err(invalid_content)?;
        if let Some(position) = position {
            check_position(position).map_err(invalid_content)?;
        }

        let now_ms = now_ms();
        let tx = self.begin_write()?;

        let position = claim_position_tx(&tx, position)?;
        let id = insert_record_row_tx(&tx, identifier.as_str(), &content, position, now_ms)?;

        insert_event_tx(
            &tx,
            now_ms,
            "record_inserted",
            Some(id),
            &json!({
                "identifier": identifier.as_str(),
                "position": position,
                "content": &content,
            }),
        )?;

        tx.commit()?;
        Ok(Record {
            id,
            identifier: identifier.into_string(),
            content,
            position,
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
        })
    }

    pub fn get_record(&self, id: i64) -> Result<Option<Record>, StoreError> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {RECORD_COLUMNS} FROM records WHERE id=?1"),
                params![id],
                record_from_row,
            )
            .optional()?)
    }

    /// Positioned records in display order, then unpositioned ones.
    pub fn list_records(&self, request: ListRecordsRequest) -> Result<Vec<Record>, StoreError> {
        let limit = to_sqlite_i64(request.limit)?;
        let offset = to_sqlite_i64(request.offset)?;

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM records \
             ORDER BY position = 0 ASC, position ASC, id ASC \
             LIMIT ?1 OFFSET ?2"
        ))?;
        let rows = stmt.query_map(params![limit, offset], record_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub(super) fn all_records(&self) -> Result<Vec<Record>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {RECORD_COLUMNS} FROM records ORDER BY id ASC"))?;
        let rows = stmt.query_map([], record_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn delete_record(&mut self, id: i64) -> Result<DeleteOutcome, StoreError> {
        let now_ms = now_ms();
        let tx = self.begin_write()?;

        let record = load_record_tx(&tx, id)?;
        let deleted = tx.execute("DELETE FROM records WHERE id=?1", params![id])?;
        let shifted = shift_down_tx(&tx, record.position)?;

        insert_event_tx(
            &tx,
            now_ms,
            "record_deleted",
            Some(id),
            &json!({
                "identifier": record.identifier,
                "position": record.position,
                "shifted": shifted,
            }),
        )?;

        tx.commit()?;
        Ok(DeleteOutcome { deleted, shifted })
    }

    pub fn move_record(&mut self, id: i64, new_position: i64) -> Result<Record, StoreError> {
        check_position(new_position).map_err(invalid_content)?;

        let now_ms = now_ms();
        let tx = self.begin_write()?;

        let current = load_record_tx(&tx, id)?;
        if current.position == new_position {
            return Ok(current);
        }

        let shifted = move_position_tx(&tx, id, current.position, new_position)?;
        tx.execute(
            "UPDATE records SET updated_at_ms=?2 WHERE id=?1",
            params![id, now_ms],
        )?;

        insert_event_tx(
            &tx,
            now_ms,
            "record_moved",
            Some(id),
            &json!({
                "from": current.position,
                "to": new_position,
                "shifted": shifted,
            }),
        )?;

        let record = load_record_tx(&tx, id)?;
        tx.commit()?;
        Ok(record)
    }

    /// Applies a partial update. Content columns come from the static field
    /// table; a position change follows the configured update policy.
    pub fn update_record(&mut self, id: i64, patch: RecordPatch) -> Result<Record, StoreError> {
        if patch.is_empty() {
            return Err(StoreError::InvalidInput("no fields to update"));
        }

        let mut patch = patch;
        if let Some(raw) = patch.identifier.take() {
            let identifier = Identifier::try_new(raw).map_err(invalid_identifier)?;
            patch.identifier = Some(identifier.into_string());
        }
        if let Some(position) = patch.position {
            check_position(position).map_err(invalid_content)?;
        }

        let policy = self.config.position_update;
        let now_ms = now_ms();
        let tx = self.begin_write()?;

        let current = load_record_tx(&tx, id)?;
        patch
            .apply_to_content(&current.content)
            .validate()
            .map_err(invalid_content)?;

        let assignments = patch.column_assignments();
        let mut sql = String::from("UPDATE records SET ");
        let mut values: Vec<Value> = Vec::with_capacity(assignments.len() + 2);
        for (field, value) in &assignments {
            values.push(match value {
                FieldValue::Text(text) => Value::Text(text.clone()),
                FieldValue::Integer(number) => Value::Integer(*number),
                FieldValue::Null => Value::Null,
            });
            sql.push_str(&format!("{} = ?{}, ", field.column(), values.len()));
        }
        values.push(Value::Integer(now_ms));
        sql.push_str(&format!("updated_at_ms = ?{} ", values.len()));
        values.push(Value::Integer(id));
        sql.push_str(&format!("WHERE id = ?{}", values.len()));
        tx.execute(&sql, params_from_iter(values))?;

        let mut shifted = 0;
        if let Some(new_position) = patch.position
            && new_position != current.position
        {
            shifted = match policy {
                PositionUpdatePolicy::Move => {
                    move_position_tx(&tx, id, current.position, new_position)?
                }
                PositionUpdatePolicy::Overwrite => {
                    if new_position > 0 && position_taken_tx(&tx, new_position, Some(id))? {
                        warn!(
                            id,
                            position = new_position,
                            "overwriting position already held by another record"
                        );
                    }
                    tx.execute(
                        "UPDATE records SET position=?2 WHERE id=?1",
                        params![id, new_position],
                    )?;
                    0
                }
            };
        }

        let fields: Vec<&str> = assignments
            .iter()
            .map(|(field, _)| field.name())
            .chain(patch.position.map(|_| "position"))
            .collect();
        insert_event_tx(
            &tx,
            now_ms,
            "record_updated",
            Some(id),
            &json!({
                "fields": fields,
                "position_policy": policy.as_str(),
                "shifted": shifted,
            }),
        )?;

        let record = load_record_tx(&tx, id)?;
        tx.commit()?;
        Ok(record)
    }
}
