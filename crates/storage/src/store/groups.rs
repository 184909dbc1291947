#![forbid(unsafe_code)]

use super::events::insert_event_tx;
use super::*;
use cl_core::{ContentSignature, Group, check_position, unique_identifiers};
use rusqlite::params;
use serde_json::json;
use tracing::{info, warn};

impl SqliteStore {
    /// Recomputes every group from the full table.
    pub fn compute_groups(&self) -> Result<Vec<Group>, StoreError> {
        let records = self.all_records()?;
        Ok(cl_core::compute_groups(&records))
    }

    pub fn group_of_record(&self, id: i64) -> Result<Option<Group>, StoreError> {
        let Some(record) = self.get_record(id)? else {
            return Ok(None);
        };
        let signature = record.signature();
        Ok(self
            .compute_groups()?
            .into_iter()
            .find(|group| group.signature == signature))
    }

    /// Replaces every member of the group identified by `old_signature` with
    /// one record per identifier carrying the new content.
    ///
    /// Members are written at `position` as given, without allocation or
    /// shifting: a group shares a single slot. If nothing matches the old
    /// signature the new members are inserted anyway.
    pub fn rewrite_group(
        &mut self,
        request: RewriteGroupRequest,
    ) -> Result<RewriteOutcome, StoreError> {
        let RewriteGroupRequest {
            old_signature,
            content,
            position,
            identifiers,
        } = request;

        content.validate().map_err(invalid_content)?;
        check_position(position).map_err(invalid_content)?;
        let identifiers = unique_identifiers(&identifiers).map_err(invalid_identifier)?;
        if identifiers.is_empty() {
            return Err(StoreError::InvalidInput("identifiers must not be empty"));
        }

        let now_ms = now_ms();
        let tx = self.begin_write()?;

        let old_ids = matching_record_ids_tx(&tx, &old_signature)?;
        for id in &old_ids {
            tx.execute("DELETE FROM records WHERE id=?1", params![id])?;
        }
        if old_ids.is_empty() {
            warn!(
                characteristic = %old_signature.characteristic,
                position = old_signature.position,
                "group rewrite matched no records, inserting members without a predecessor"
            );
        }

        let mut record_ids = Vec::with_capacity(identifiers.len());
        for identifier in &identifiers {
            record_ids.push(insert_record_row_tx(
                &tx,
                identifier.as_str(),
                &content,
                position,
                now_ms,
            )?);
        }

        insert_event_tx(
            &tx,
            now_ms,
            "group_rewritten",
            None,
            &json!({
                "old_signature": &old_signature,
                "deleted_ids": &old_ids,
                "inserted_ids": &record_ids,
                "position": position,
                "content": &content,
            }),
        )?;

        tx.commit()?;
        info!(
            deleted = old_ids.len(),
            inserted = record_ids.len(),
            position,
            "group rewritten"
        );
        Ok(RewriteOutcome {
            deleted: old_ids.len(),
            inserted: record_ids.len(),
            record_ids,
        })
    }
}

/// Ids of every record whose normalized content equals `signature`. The SQL
/// narrows on the raw columns; normalization happens in one place, in core.
fn matching_record_ids_tx(
    tx: &Transaction<'_>,
    signature: &ContentSignature,
) -> Result<Vec<i64>, StoreError> {
    let mut stmt = tx.prepare(&format!(
        "SELECT {RECORD_COLUMNS} FROM records \
         WHERE characteristic=?1 AND value=?2 AND print_text=?3 AND position=?4 \
         ORDER BY id ASC"
    ))?;
    let rows = stmt.query_map(
        params![
            signature.characteristic,
            signature.value,
            signature.print_text,
            signature.position
        ],
        record_from_row,
    )?;

    let mut out = Vec::new();
    for row in rows {
        let record = row?;
        if signature.matches(&record.content, record.position) {
            out.push(record.id);
        }
    }
    Ok(out)
}
