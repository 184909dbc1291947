#![forbid(unsafe_code)]

//! Position allocation and range shifts.
//!
//! All functions take the caller's transaction and read position state fresh
//! from it. Nothing here commits; a failure anywhere leaves the caller to drop
//! the transaction, which discards every shift already applied.

use super::StoreError;
use cl_core::MAX_POSITION;
use rusqlite::{OptionalExtension, Transaction, params};
use tracing::{debug, warn};

/// Whether any record other than `exclude_id` sits at `position`.
pub(super) fn position_taken_tx(
    tx: &Transaction<'_>,
    position: i64,
    exclude_id: Option<i64>,
) -> Result<bool, StoreError> {
    Ok(tx
        .query_row(
            "SELECT 1 FROM records WHERE position=?1 AND id IS NOT ?2 LIMIT 1",
            params![position, exclude_id],
            |row| row.get::<_, i64>(0),
        )
        .optional()?
        .is_some())
}

/// First unoccupied slot at or after `from`.
pub(super) fn next_free_position_tx(tx: &Transaction<'_>, from: i64) -> Result<i64, StoreError> {
    let mut stmt = tx.prepare(
        "SELECT DISTINCT position FROM records WHERE position >= ?1 ORDER BY position ASC",
    )?;
    let mut rows = stmt.query(params![from])?;
    let mut candidate = from;
    while let Some(row) = rows.next()? {
        let taken = row.get::<_, i64>(0)?;
        if taken > candidate {
            break;
        }
        candidate = taken + 1;
    }

    if candidate > MAX_POSITION {
        return Err(StoreError::PositionConflict { requested: from });
    }
    Ok(candidate)
}

/// Resolves the position a new record will be written at. A requested slot
/// is always opened with a shift up, so the new record lands in front of
/// whatever sat at or after it.
pub(super) fn claim_position_tx(
    tx: &Transaction<'_>,
    requested: Option<i64>,
) -> Result<i64, StoreError> {
    let position = match requested {
        None | Some(0) => return Ok(0),
        Some(position) => position,
    };

    shift_up_tx(tx, position)?;
    if !position_taken_tx(tx, position, None)? {
        return Ok(position);
    }
    let fallback = next_free_position_tx(tx, position)?;
    warn!(
        requested = position,
        position = fallback,
        "slot still occupied after shift, using next free position"
    );
    Ok(fallback)
}

fn max_position_tx(tx: &Transaction<'_>) -> Result<i64, StoreError> {
    Ok(tx.query_row(
        "SELECT COALESCE(MAX(position), 0) FROM records",
        [],
        |row| row.get::<_, i64>(0),
    )?)
}

/// Increments every positioned record at or above `from`.
pub(super) fn shift_up_tx(tx: &Transaction<'_>, from: i64) -> Result<usize, StoreError> {
    let max = max_position_tx(tx)?;
    if max >= MAX_POSITION && max >= from {
        return Err(StoreError::PositionConflict { requested: from });
    }

    let shifted = tx.execute(
        "UPDATE records SET position = position + 1 WHERE position > 0 AND position >= ?1",
        params![from],
    )?;
    debug!(from, shifted, "shift up");
    Ok(shifted)
}

/// Decrements every record above a vacated `deleted` slot. No-op for 0.
pub(super) fn shift_down_tx(tx: &Transaction<'_>, deleted: i64) -> Result<usize, StoreError> {
    if deleted <= 0 {
        return Ok(0);
    }

    let shifted = tx.execute(
        "UPDATE records SET position = position - 1 WHERE position > ?1",
        params![deleted],
    )?;
    debug!(deleted, shifted, "shift down");
    Ok(shifted)
}

/// Relocates record `id` from `old` to `new`, shifting the records in between
/// by one slot. Returns how many other records moved.
pub(super) fn move_position_tx(
    tx: &Transaction<'_>,
    id: i64,
    old: i64,
    new: i64,
) -> Result<usize, StoreError> {
    if old == new {
        return Ok(0);
    }

    let mut shifted = match (old, new) {
        (0, new) if position_taken_tx(tx, new, Some(id))? => shift_up_tx(tx, new)?,
        (0, _) | (_, 0) => 0,
        (old, new) if new > old => tx.execute(
            "UPDATE records SET position = position - 1 \
             WHERE id <> ?1 AND position > ?2 AND position <= ?3",
            params![id, old, new],
        )?,
        (old, new) => tx.execute(
            "UPDATE records SET position = position + 1 \
             WHERE id <> ?1 AND position >= ?2 AND position < ?3",
            params![id, new, old],
        )?,
    };

    tx.execute(
        "UPDATE records SET position=?2 WHERE id=?1",
        params![id, new],
    )?;

    if new == 0 {
        shifted += shift_down_tx(tx, old)?;
    }

    debug!(id, old, new, shifted, "move");
    Ok(shifted)
}
