#![forbid(unsafe_code)]

use crate::content::{Record, RecordContent};
use crate::signature::ContentSignature;
use std::collections::BTreeMap;

/// Records sharing one content signature. Derived on every read, never stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Group {
    pub signature: ContentSignature,
    /// Raw content of the representative record.
    pub content: RecordContent,
    pub position: i64,
    pub representative_id: i64,
    /// Ascending.
    pub member_ids: Vec<i64>,
    /// Same order as `member_ids`.
    pub identifiers: Vec<String>,
}

impl Group {
    pub fn member_count(&self) -> usize {
        self.member_ids.len()
    }

    pub fn identifiers_joined(&self, separator: &str) -> String {
        self.identifiers.join(separator)
    }

    pub fn contains_identifier(&self, identifier: &str) -> bool {
        self.identifiers.iter().any(|value| value == identifier)
    }
}

/// Partitions `records` by content signature.
///
/// The result is ordered by position with unpositioned groups last, then by
/// representative id, so equal input sets give equal output regardless of
/// input order.
pub fn compute_groups<'a, I>(records: I) -> Vec<Group>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut partitions: BTreeMap<ContentSignature, Vec<&Record>> = BTreeMap::new();
    for record in records {
        partitions.entry(record.signature()).or_default().push(record);
    }

    let mut groups = Vec::with_capacity(partitions.len());
    for (signature, mut members) in partitions {
        members.sort_by_key(|record| record.id);
        let Some(representative) = members.first() else {
            continue;
        };
        groups.push(Group {
            content: representative.content.clone(),
            position: signature.position,
            representative_id: representative.id,
            member_ids: members.iter().map(|record| record.id).collect(),
            identifiers: members
                .iter()
                .map(|record| record.identifier.clone())
                .collect(),
            signature,
        });
    }

    groups.sort_by_key(|group| (group.position == 0, group.position, group.representative_id));
    groups
}
