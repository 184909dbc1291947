#![forbid(unsafe_code)]

use crate::content::RecordContent;
use serde::{Deserialize, Serialize};

/// A content field after normalization. `Empty` is the single bucket for every
/// absent or blank raw value and never equals an explicit value.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalized<T> {
    Empty,
    Value(T),
}

pub fn normalize_special_mark(raw: Option<&str>) -> Normalized<String> {
    match raw {
        Some(mark) if !mark.trim().is_empty() => Normalized::Value(mark.to_string()),
        _ => Normalized::Empty,
    }
}

pub fn normalize_production_list(raw: Option<i64>) -> Normalized<i64> {
    match raw {
        Some(flag) if flag != 0 => Normalized::Value(flag),
        _ => Normalized::Empty,
    }
}

/// Canonical key under which records count as "the same entry". The owner
/// identifier is deliberately not part of it.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContentSignature {
    pub characteristic: String,
    pub value: String,
    pub print_text: String,
    pub special_mark: Normalized<String>,
    pub position: i64,
    pub department_code: Option<i64>,
    pub production_list: Normalized<i64>,
}

impl ContentSignature {
    pub fn of(content: &RecordContent, position: i64) -> Self {
        Self {
            characteristic: content.characteristic.clone(),
            value: content.value.clone(),
            print_text: content.print_text.clone(),
            special_mark: normalize_special_mark(content.special_mark.as_deref()),
            position,
            department_code: content.department_code,
            production_list: normalize_production_list(content.production_list),
        }
    }

    pub fn matches(&self, content: &RecordContent, position: i64) -> bool {
        self.position == position
            && self.characteristic == content.characteristic
            && self.value == content.value
            && self.print_text == content.print_text
            && self.department_code == content.department_code
            && self.special_mark == normalize_special_mark(content.special_mark.as_deref())
            && self.production_list == normalize_production_list(content.production_list)
    }
}
