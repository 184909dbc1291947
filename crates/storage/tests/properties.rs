#![forbid(unsafe_code)]

use cl_core::RecordContent;
use cl_storage::{InsertRecordRequest, SqliteStore, StoreConfig};
use quickcheck::{Arbitrary, Gen};
use quickcheck_macros::quickcheck;
use std::collections::{BTreeMap, BTreeSet};

const MAX_TEST_POSITION: u8 = 8;

#[derive(Clone, Debug)]
enum Op {
    Insert { position: u8 },
    Delete { pick: u8 },
    Move { pick: u8, position: u8 },
}

impl Arbitrary for Op {
    fn arbitrary(g: &mut Gen) -> Self {
        let position = u8::arbitrary(g) % (MAX_TEST_POSITION + 1);
        let pick = u8::arbitrary(g);
        // Inserts dominate so sequences build up a list worth shifting.
        match g.choose(&[0u8, 0, 0, 1, 2, 2]).copied().unwrap_or(0) {
            0 => Op::Insert { position },
            1 => Op::Delete { pick },
            _ => Op::Move { pick, position },
        }
    }
}

/// Reference list: record id -> position, updated with plain loops.
#[derive(Default)]
struct Model {
    positions: BTreeMap<i64, i64>,
}

impl Model {
    fn pick(&self, pick: u8) -> Option<i64> {
        if self.positions.is_empty() {
            return None;
        }
        let index = usize::from(pick) % self.positions.len();
        self.positions.keys().nth(index).copied()
    }

    fn taken(&self, position: i64, exclude: Option<i64>) -> bool {
        self.positions
            .iter()
            .any(|(id, held)| *held == position && Some(*id) != exclude)
    }

    fn insert(&mut self, id: i64, position: i64) {
        if position > 0 {
            for held in self.positions.values_mut() {
                if *held >= position {
                    *held += 1;
                }
            }
        }
        self.positions.insert(id, position);
    }

    fn delete(&mut self, id: i64) {
        let Some(old) = self.positions.remove(&id) else {
            return;
        };
        if old > 0 {
            for held in self.positions.values_mut() {
                if *held > old {
                    *held -= 1;
                }
            }
        }
    }

    fn relocate(&mut self, id: i64, new: i64) {
        let Some(old) = self.positions.get(&id).copied() else {
            return;
        };
        if old == new {
            return;
        }
        if old == 0 {
            if self.taken(new, Some(id)) {
                for held in self.positions.values_mut() {
                    if *held >= new {
                        *held += 1;
                    }
                }
            }
        } else if new > 0 {
            for (other, held) in self.positions.iter_mut() {
                if *other == id {
                    continue;
                }
                if new > old && *held > old && *held <= new {
                    *held -= 1;
                } else if new < old && *held >= new && *held < old {
                    *held += 1;
                }
            }
        }
        self.positions.insert(id, new);
        if new == 0 {
            for held in self.positions.values_mut() {
                if *held > old {
                    *held -= 1;
                }
            }
        }
    }
}

fn content(n: usize) -> RecordContent {
    RecordContent {
        characteristic: format!("C{n}"),
        value: "v".to_string(),
        print_text: format!("C{n}"),
        ..RecordContent::default()
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[quickcheck]
fn shifts_keep_positions_unique_and_match_the_model(ops: Vec<Op>) -> bool {
    init_tracing();
    let mut store = SqliteStore::open_in_memory(StoreConfig::default()).expect("open store");
    let mut model = Model::default();

    for (n, op) in ops.iter().enumerate() {
        match op {
            Op::Insert { position } => {
                let position = i64::from(*position);
                let record = store
                    .insert_record(InsertRecordRequest {
                        identifier: "P".to_string(),
                        content: content(n),
                        position: Some(position),
                    })
                    .expect("insert");
                if record.position != position {
                    return false;
                }
                model.insert(record.id, position);
            }
            Op::Delete { pick } => {
                let Some(id) = model.pick(*pick) else {
                    continue;
                };
                store.delete_record(id).expect("delete");
                model.delete(id);
            }
            Op::Move { pick, position } => {
                let Some(id) = model.pick(*pick) else {
                    continue;
                };
                let position = i64::from(*position);
                store.move_record(id, position).expect("move");
                model.relocate(id, position);
            }
        }

        let mut seen = BTreeSet::new();
        for (id, expected) in &model.positions {
            let actual = match store.get_record(*id).expect("get") {
                Some(record) => record.position,
                None => return false,
            };
            if actual != *expected {
                return false;
            }
            if actual > 0 && !seen.insert(actual) {
                return false;
            }
        }
        if !store.position_audit().expect("audit").is_consistent() {
            return false;
        }
    }
    true
}

#[quickcheck]
fn deleting_everything_leaves_an_empty_list(positions: Vec<u8>) -> bool {
    let mut store = SqliteStore::open_in_memory(StoreConfig::default()).expect("open store");
    let mut ids = Vec::new();
    for (n, position) in positions.iter().enumerate() {
        let record = store
            .insert_record(InsertRecordRequest {
                identifier: "P".to_string(),
                content: content(n),
                position: Some(i64::from(*position % (MAX_TEST_POSITION + 1))),
            })
            .expect("insert");
        ids.push(record.id);
    }
    for id in ids.into_iter().rev() {
        store.delete_record(id).expect("delete");
    }

    let audit = store.position_audit().expect("audit");
    audit.positioned == 0 && audit.unpositioned == 0 && audit.max_position == 0
}
