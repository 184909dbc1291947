#![forbid(unsafe_code)]

use cl_core::{ContentSignature, RecordContent};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InsertRecordRequest {
    pub identifier: String,
    pub content: RecordContent,
    /// `None` or `Some(0)` inserts the record unpositioned.
    pub position: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListRecordsRequest {
    pub limit: usize,
    pub offset: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RewriteGroupRequest {
    pub old_signature: ContentSignature,
    pub content: RecordContent,
    pub position: i64,
    pub identifiers: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub deleted: usize,
    pub shifted: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RewriteOutcome {
    pub deleted: usize,
    pub inserted: usize,
    pub record_ids: Vec<i64>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PositionAudit {
    pub positioned: usize,
    pub unpositioned: usize,
    pub max_position: i64,
    /// `(position, holders)` for every position held by more than one record.
    pub duplicates: Vec<(i64, usize)>,
}

impl PositionAudit {
    pub fn is_consistent(&self) -> bool {
        self.duplicates.is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct EventRow {
    pub seq: i64,
    pub ts_ms: i64,
    pub kind: String,
    pub record_id: Option<i64>,
    pub payload_json: String,
}

impl EventRow {
    pub fn event_id(&self) -> String {
        format!("evt_{:016}", self.seq)
    }
}
