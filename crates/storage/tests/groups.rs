#![forbid(unsafe_code)]

use cl_core::{ContentSignature, Group, RecordContent};
use cl_storage::{InsertRecordRequest, RewriteGroupRequest, SqliteStore, StoreError};
use std::path::PathBuf;

fn temp_dir(test_name: &str) -> PathBuf {
    let base = std::env::temp_dir();
    let pid = std::process::id();
    let nonce = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let dir = base.join(format!("cl_storage_{test_name}_{pid}_{nonce}"));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn thread_content(value: &str) -> RecordContent {
    RecordContent {
        characteristic: "Thread".to_string(),
        value: value.to_string(),
        print_text: format!("Thread {value}"),
        special_mark: Some(String::new()),
        department_code: Some(12),
        production_list: Some(0),
    }
}

fn identifiers(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

fn insert(store: &mut SqliteStore, identifier: &str, characteristic: &str, position: i64) -> i64 {
    store
        .insert_record(InsertRecordRequest {
            identifier: identifier.to_string(),
            content: RecordContent {
                characteristic: characteristic.to_string(),
                value: "-".to_string(),
                print_text: characteristic.to_string(),
                ..RecordContent::default()
            },
            position: Some(position),
        })
        .expect("insert record")
        .id
}

/// Creates a group at `position` through an orphan rewrite.
fn seed_group(store: &mut SqliteStore, content: &RecordContent, position: i64, members: &[&str]) {
    store
        .rewrite_group(RewriteGroupRequest {
            old_signature: ContentSignature::of(content, position),
            content: content.clone(),
            position,
            identifiers: identifiers(members),
        })
        .expect("seed group");
}

fn group_at(store: &SqliteStore, position: i64) -> Group {
    store
        .compute_groups()
        .expect("compute groups")
        .into_iter()
        .find(|group| group.position == position)
        .expect("group at position")
}

#[test]
fn rewrite_replaces_members_and_content() {
    let mut store = SqliteStore::open(temp_dir("rewrite_basic")).expect("open store");
    insert(&mut store, "X", "Length", 1);
    insert(&mut store, "X", "Width", 2);
    let old = thread_content("M6");
    seed_group(&mut store, &old, 3, &["A", "B"]);

    let group = group_at(&store, 3);
    assert_eq!(group.identifiers, vec!["A", "B"]);
    let old_ids = group.member_ids.clone();

    let new = thread_content("M8");
    let outcome = store
        .rewrite_group(RewriteGroupRequest {
            old_signature: group.signature.clone(),
            content: new.clone(),
            position: 3,
            identifiers: identifiers(&["A", "C"]),
        })
        .expect("rewrite");
    assert_eq!(outcome.deleted, 2);
    assert_eq!(outcome.inserted, 2);
    assert_eq!(outcome.record_ids.len(), 2);

    for id in old_ids {
        assert!(store.get_record(id).expect("get").is_none());
    }
    let rewritten = group_at(&store, 3);
    assert_eq!(rewritten.identifiers, vec!["A", "C"]);
    assert_eq!(rewritten.content.value, "M8");
    assert_eq!(rewritten.member_ids, outcome.record_ids);

    let groups = store.compute_groups().expect("groups");
    assert_eq!(groups.len(), 3);
    assert_eq!(
        groups.iter().map(|group| group.position).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
}

#[test]
fn rewrite_with_same_content_swaps_membership() {
    let mut store = SqliteStore::open(temp_dir("rewrite_same_signature")).expect("open store");
    let content = thread_content("M6");
    seed_group(&mut store, &content, 2, &["A", "B"]);
    let before = group_at(&store, 2);
    let (old_a, old_b) = (before.member_ids[0], before.member_ids[1]);

    let outcome = store
        .rewrite_group(RewriteGroupRequest {
            old_signature: before.signature.clone(),
            content: content.clone(),
            position: 2,
            identifiers: identifiers(&["A", "C"]),
        })
        .expect("rewrite");
    assert_eq!(outcome.deleted, 2);

    let groups = store.compute_groups().expect("groups");
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].identifiers, vec!["A", "C"]);
    assert_eq!(groups[0].signature, before.signature);

    let new_a = groups[0].member_ids[0];
    assert_ne!(new_a, old_a);
    assert!(store.get_record(old_a).expect("get").is_none());
    assert!(store.get_record(old_b).expect("get").is_none());
}

#[test]
fn rewrite_does_not_shift_other_records() {
    let mut store = SqliteStore::open(temp_dir("rewrite_no_shift")).expect("open store");
    let first = insert(&mut store, "X", "Length", 1);
    let second = insert(&mut store, "X", "Width", 2);
    let old = thread_content("M6");
    seed_group(&mut store, &old, 2, &["A"]);

    let at_two: Vec<Group> = store
        .compute_groups()
        .expect("groups")
        .into_iter()
        .filter(|group| group.position == 2)
        .collect();
    assert_eq!(at_two.len(), 2);
    assert!(at_two.iter().all(|group| group.member_count() == 1));

    let position_of = |store: &SqliteStore, id| {
        store
            .get_record(id)
            .expect("get")
            .expect("record")
            .position
    };
    assert_eq!(position_of(&store, first), 1);
    assert_eq!(position_of(&store, second), 2);
}

#[test]
fn rewrite_deduplicates_and_trims_identifiers() {
    let mut store = SqliteStore::open(temp_dir("rewrite_dedup")).expect("open store");
    let content = thread_content("M6");
    let outcome = store
        .rewrite_group(RewriteGroupRequest {
            old_signature: ContentSignature::of(&content, 1),
            content,
            position: 1,
            identifiers: identifiers(&[" B ", "A", "B"]),
        })
        .expect("rewrite");
    assert_eq!(outcome.inserted, 2);
    assert_eq!(group_at(&store, 1).identifiers, vec!["B", "A"]);
}

#[test]
fn rewrite_with_no_matching_members_still_inserts() {
    let mut store = SqliteStore::open(temp_dir("rewrite_orphan")).expect("open store");
    let unrelated = insert(&mut store, "X", "Length", 1);

    let stale = thread_content("M5");
    let outcome = store
        .rewrite_group(RewriteGroupRequest {
            old_signature: ContentSignature::of(&stale, 4),
            content: thread_content("M6"),
            position: 4,
            identifiers: identifiers(&["A", "B"]),
        })
        .expect("orphan rewrite");
    assert_eq!(outcome.deleted, 0);
    assert_eq!(outcome.inserted, 2);
    assert!(store.get_record(unrelated).expect("get").is_some());
    assert_eq!(group_at(&store, 4).identifiers, vec!["A", "B"]);
}

#[test]
fn rewrite_matches_normalized_signature_only() {
    let mut store = SqliteStore::open(temp_dir("rewrite_normalized")).expect("open store");
    let blank_mark = thread_content("M6");
    seed_group(&mut store, &blank_mark, 1, &["A"]);

    let mut marked = blank_mark.clone();
    marked.special_mark = Some("SC".to_string());
    seed_group(&mut store, &marked, 1, &["B"]);

    let mut absent_mark = blank_mark.clone();
    absent_mark.special_mark = None;
    absent_mark.production_list = None;
    let outcome = store
        .rewrite_group(RewriteGroupRequest {
            old_signature: ContentSignature::of(&absent_mark, 1),
            content: thread_content("M7"),
            position: 1,
            identifiers: identifiers(&["A"]),
        })
        .expect("rewrite");
    assert_eq!(outcome.deleted, 1);

    let mut values: Vec<String> = store
        .compute_groups()
        .expect("groups")
        .into_iter()
        .map(|group| group.content.value)
        .collect();
    values.sort();
    assert_eq!(values, vec!["M6", "M7"]);
}

#[test]
fn rewrite_rejects_invalid_input_without_writing() {
    let mut store = SqliteStore::open(temp_dir("rewrite_invalid")).expect("open store");
    let content = thread_content("M6");
    seed_group(&mut store, &content, 1, &["A"]);
    let signature = group_at(&store, 1).signature;

    let err = store
        .rewrite_group(RewriteGroupRequest {
            old_signature: signature.clone(),
            content: content.clone(),
            position: 1,
            identifiers: Vec::new(),
        })
        .expect_err("empty identifiers must fail");
    assert_eq!(err.code(), "INVALID_INPUT");

    let err = store
        .rewrite_group(RewriteGroupRequest {
            old_signature: signature.clone(),
            content: content.clone(),
            position: -1,
            identifiers: identifiers(&["A"]),
        })
        .expect_err("negative position must fail");
    assert_eq!(err.code(), "INVALID_INPUT");

    let err = store
        .rewrite_group(RewriteGroupRequest {
            old_signature: signature,
            content,
            position: 1,
            identifiers: identifiers(&["A", "   "]),
        })
        .expect_err("blank identifier must fail");
    assert!(matches!(
        err,
        StoreError::InvalidInput("identifier must not be empty")
    ));

    assert_eq!(group_at(&store, 1).identifiers, vec!["A"]);
}

#[test]
fn failed_rewrite_rolls_back_every_step() {
    let dir = temp_dir("rewrite_rollback");
    let mut store = SqliteStore::open(&dir).expect("open store");
    let content = thread_content("M6");
    seed_group(&mut store, &content, 2, &["A", "B"]);
    let before = group_at(&store, 2);
    let events_before = store.list_events(0, 100).expect("events").len();

    let sabotage =
        rusqlite::Connection::open(dir.join(SqliteStore::db_file_name())).expect("open sqlite");
    sabotage
        .execute_batch(
            r#"
            CREATE TRIGGER reject_boom BEFORE INSERT ON records
            WHEN NEW.identifier = 'BOOM'
            BEGIN
              SELECT RAISE(ABORT, 'boom');
            END;
            "#,
        )
        .expect("create trigger");
    drop(sabotage);

    let err = store
        .rewrite_group(RewriteGroupRequest {
            old_signature: before.signature.clone(),
            content: thread_content("M8"),
            position: 2,
            identifiers: identifiers(&["C", "BOOM"]),
        })
        .expect_err("trigger must abort the rewrite");
    assert_eq!(err.code(), "TRANSACTION");

    let after = group_at(&store, 2);
    assert_eq!(after, before);
    assert_eq!(store.compute_groups().expect("groups").len(), 1);
    assert_eq!(store.list_events(0, 100).expect("events").len(), events_before);
}

#[test]
fn group_of_record_finds_the_enclosing_group() {
    let mut store = SqliteStore::open(temp_dir("group_of_record")).expect("open store");
    let lone = insert(&mut store, "X", "Length", 1);
    let content = thread_content("M6");
    seed_group(&mut store, &content, 2, &["A", "B"]);
    let member = group_at(&store, 2).member_ids[1];

    let group = store
        .group_of_record(member)
        .expect("lookup")
        .expect("group");
    assert_eq!(group.identifiers_joined(", "), "A, B");
    assert!(group.contains_identifier("B"));

    let single = store.group_of_record(lone).expect("lookup").expect("group");
    assert_eq!(single.member_ids, vec![lone]);

    assert!(store.group_of_record(9999).expect("lookup").is_none());
}

#[test]
fn compute_groups_is_stable_across_reads() {
    let mut store = SqliteStore::open(temp_dir("groups_stable")).expect("open store");
    insert(&mut store, "X", "Length", 1);
    seed_group(&mut store, &thread_content("M6"), 2, &["A", "B"]);
    insert(&mut store, "Y", "Loose", 0);

    let first = store.compute_groups().expect("groups");
    let second = store.compute_groups().expect("groups");
    assert_eq!(first, second);
    assert_eq!(first.last().map(|group| group.position), Some(0));
}

#[test]
fn rewrite_is_journaled_with_both_id_sets() {
    let mut store = SqliteStore::open(temp_dir("rewrite_journal")).expect("open store");
    seed_group(&mut store, &thread_content("M6"), 1, &["A"]);
    let signature = group_at(&store, 1).signature;

    let outcome = store
        .rewrite_group(RewriteGroupRequest {
            old_signature: signature,
            content: thread_content("M6"),
            position: 1,
            identifiers: identifiers(&["A", "B"]),
        })
        .expect("rewrite");

    let events = store.list_events(0, 10).expect("events");
    let last = events.last().expect("event");
    assert_eq!(last.kind, "group_rewritten");
    assert_eq!(last.record_id, None);

    let payload: serde_json::Value =
        serde_json::from_str(&last.payload_json).expect("payload json");
    assert_eq!(payload["deleted_ids"].as_array().map(Vec::len), Some(1));
    assert_eq!(
        payload["inserted_ids"],
        serde_json::json!(outcome.record_ids)
    );
    assert_eq!(payload["old_signature"]["special_mark"], "empty");
}
