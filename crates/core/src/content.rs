#![forbid(unsafe_code)]

use crate::signature::ContentSignature;
use serde::{Deserialize, Serialize};

/// Largest position a record may hold. The ordinal column is read by other
/// consumers as a 32-bit value.
pub const MAX_POSITION: i64 = i32::MAX as i64;

const MAX_CHARACTERISTIC_LEN: usize = 256;
const MAX_VALUE_LEN: usize = 256;
const MAX_PRINT_TEXT_LEN: usize = 1024;
const MAX_SPECIAL_MARK_LEN: usize = 64;

/// The descriptive fields of a record. Everything except the owner identifier
/// and the position.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordContent {
    pub characteristic: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub print_text: String,
    #[serde(default)]
    pub special_mark: Option<String>,
    #[serde(default)]
    pub department_code: Option<i64>,
    #[serde(default)]
    pub production_list: Option<i64>,
}

impl RecordContent {
    pub fn validate(&self) -> Result<(), ContentError> {
        if self.characteristic.trim().is_empty() {
            return Err(ContentError::CharacteristicEmpty);
        }
        check_text("characteristic", &self.characteristic, MAX_CHARACTERISTIC_LEN, false)?;
        check_text("value", &self.value, MAX_VALUE_LEN, false)?;
        check_text("print_text", &self.print_text, MAX_PRINT_TEXT_LEN, true)?;
        if let Some(mark) = self.special_mark.as_deref() {
            check_text("special_mark", mark, MAX_SPECIAL_MARK_LEN, false)?;
        }
        if let Some(code) = self.department_code
            && code < 0
        {
            return Err(ContentError::NegativeDepartmentCode);
        }
        if let Some(flag) = self.production_list
            && !matches!(flag, 0 | 1)
        {
            return Err(ContentError::InvalidProductionList);
        }
        Ok(())
    }
}

fn check_text(
    field: &'static str,
    value: &str,
    max_len: usize,
    multiline: bool,
) -> Result<(), ContentError> {
    if value.chars().count() > max_len {
        return Err(ContentError::TooLong { field });
    }
    let allowed = |c: char| multiline && matches!(c, '\n' | '\t');
    if value.chars().any(|c| c.is_control() && !allowed(c)) {
        return Err(ContentError::ContainsControl { field });
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContentError {
    CharacteristicEmpty,
    TooLong { field: &'static str },
    ContainsControl { field: &'static str },
    NegativeDepartmentCode,
    InvalidProductionList,
    PositionOutOfRange,
}

impl ContentError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::CharacteristicEmpty => "characteristic must not be empty",
            Self::TooLong { field } => match *field {
                "characteristic" => "characteristic is too long",
                "value" => "value is too long",
                "print_text" => "print_text is too long",
                _ => "special_mark is too long",
            },
            Self::ContainsControl { field } => match *field {
                "characteristic" => "characteristic contains control characters",
                "value" => "value contains control characters",
                "print_text" => "print_text contains control characters",
                _ => "special_mark contains control characters",
            },
            Self::NegativeDepartmentCode => "department_code must not be negative",
            Self::InvalidProductionList => "production_list must be 0 or 1",
            Self::PositionOutOfRange => "position must be between 0 and 2147483647",
        }
    }
}

/// Positions are `0` (unpositioned) or `1..=MAX_POSITION`.
pub fn check_position(position: i64) -> Result<i64, ContentError> {
    if (0..=MAX_POSITION).contains(&position) {
        Ok(position)
    } else {
        Err(ContentError::PositionOutOfRange)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    pub id: i64,
    pub identifier: String,
    pub content: RecordContent,
    pub position: i64,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

impl Record {
    pub fn signature(&self) -> ContentSignature {
        ContentSignature::of(&self.content, self.position)
    }
}
