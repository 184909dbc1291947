#![forbid(unsafe_code)]

use super::*;

impl SqliteStore {
    /// Reports positions held by more than one record. Members of one group
    /// share a slot by construction and show up here too.
    pub fn position_audit(&self) -> Result<PositionAudit, StoreError> {
        let (positioned, unpositioned, max_position) = self.conn.query_row(
            r#"
            SELECT
              COALESCE(SUM(CASE WHEN position > 0 THEN 1 ELSE 0 END), 0),
              COALESCE(SUM(CASE WHEN position > 0 THEN 0 ELSE 1 END), 0),
              COALESCE(MAX(position), 0)
            FROM records
            "#,
            [],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            },
        )?;

        let mut stmt = self.conn.prepare(
            r#"
            SELECT position, COUNT(1)
            FROM records
            WHERE position > 0
            GROUP BY position
            HAVING COUNT(1) > 1
            ORDER BY position ASC
            "#,
        )?;
        let mut rows = stmt.query([])?;
        let mut duplicates = Vec::new();
        while let Some(row) = rows.next()? {
            let holders = row.get::<_, i64>(1)?;
            duplicates.push((row.get::<_, i64>(0)?, holders.max(0) as usize));
        }

        Ok(PositionAudit {
            positioned: positioned.max(0) as usize,
            unpositioned: unpositioned.max(0) as usize,
            max_position,
            duplicates,
        })
    }
}
