#![forbid(unsafe_code)]

use crate::time::ts_ms_to_rfc3339;
use cl_core::{ContentSignature, Group, Record};
use cl_storage::{DeleteOutcome, EventRow, PositionAudit, RewriteOutcome};
use serde::Serialize;

#[derive(Clone, Debug, Serialize)]
pub struct RecordDto {
    pub id: i64,
    pub identifier: String,
    pub characteristic: String,
    pub value: String,
    pub print_text: String,
    pub special_mark: Option<String>,
    pub position: i64,
    pub department_code: Option<i64>,
    pub production_list: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Record> for RecordDto {
    fn from(record: Record) -> Self {
        Self {
            id: record.id,
            identifier: record.identifier,
            characteristic: record.content.characteristic,
            value: record.content.value,
            print_text: record.content.print_text,
            special_mark: record.content.special_mark,
            position: record.position,
            department_code: record.content.department_code,
            production_list: record.content.production_list,
            created_at: ts_ms_to_rfc3339(record.created_at_ms),
            updated_at: ts_ms_to_rfc3339(record.updated_at_ms),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct GroupDto {
    pub representative_id: i64,
    pub position: i64,
    pub characteristic: String,
    pub value: String,
    pub print_text: String,
    pub member_count: usize,
    pub member_ids: Vec<i64>,
    pub identifiers: String,
    pub signature: ContentSignature,
}

impl From<Group> for GroupDto {
    fn from(group: Group) -> Self {
        Self {
            representative_id: group.representative_id,
            position: group.position,
            member_count: group.member_count(),
            identifiers: group.identifiers_joined(", "),
            characteristic: group.content.characteristic,
            value: group.content.value,
            print_text: group.content.print_text,
            member_ids: group.member_ids,
            signature: group.signature,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct DeleteDto {
    pub id: i64,
    pub deleted: usize,
    pub shifted: usize,
}

impl DeleteDto {
    pub fn new(id: i64, outcome: DeleteOutcome) -> Self {
        Self {
            id,
            deleted: outcome.deleted,
            shifted: outcome.shifted,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct RewriteDto {
    pub deleted: usize,
    pub inserted: usize,
    pub record_ids: Vec<i64>,
}

impl From<RewriteOutcome> for RewriteDto {
    fn from(outcome: RewriteOutcome) -> Self {
        Self {
            deleted: outcome.deleted,
            inserted: outcome.inserted,
            record_ids: outcome.record_ids,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct AuditDto {
    pub consistent: bool,
    pub positioned: usize,
    pub unpositioned: usize,
    pub max_position: i64,
    pub duplicates: Vec<DuplicateDto>,
}

#[derive(Clone, Debug, Serialize)]
pub struct DuplicateDto {
    pub position: i64,
    pub holders: usize,
}

impl From<PositionAudit> for AuditDto {
    fn from(audit: PositionAudit) -> Self {
        Self {
            consistent: audit.is_consistent(),
            positioned: audit.positioned,
            unpositioned: audit.unpositioned,
            max_position: audit.max_position,
            duplicates: audit
                .duplicates
                .into_iter()
                .map(|(position, holders)| DuplicateDto { position, holders })
                .collect(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct EventDto {
    pub event_id: String,
    pub ts: String,
    pub kind: String,
    pub record_id: Option<i64>,
    pub payload: serde_json::Value,
}

impl From<EventRow> for EventDto {
    fn from(row: EventRow) -> Self {
        let payload = serde_json::from_str(&row.payload_json)
            .unwrap_or_else(|_| serde_json::Value::String(row.payload_json.clone()));
        Self {
            event_id: row.event_id(),
            ts: ts_ms_to_rfc3339(row.ts_ms),
            kind: row.kind,
            record_id: row.record_id,
            payload,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ErrorDto {
    pub code: &'static str,
    pub message: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorDto,
}
