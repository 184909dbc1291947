#![forbid(unsafe_code)]

use super::{PositionLock, SqliteStore, StoreError};
use rusqlite::{Transaction, TransactionBehavior};

impl SqliteStore {
    /// Opens the unit of work for one logical write.
    ///
    /// Every sub-step of an operation runs on the returned transaction.
    /// Returning early with `?` drops it, which rolls back everything done so
    /// far; only an explicit `commit` makes the work visible.
    pub(super) fn begin_write(&mut self) -> Result<Transaction<'_>, StoreError> {
        let behavior = match self.config.position_lock {
            PositionLock::Immediate => TransactionBehavior::Immediate,
            PositionLock::Deferred => TransactionBehavior::Deferred,
        };
        Ok(self.conn.transaction_with_behavior(behavior)?)
    }
}
