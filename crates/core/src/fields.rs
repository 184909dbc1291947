#![forbid(unsafe_code)]

use crate::content::RecordContent;

/// Every field a partial update may touch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecordField {
    Identifier,
    Characteristic,
    Value,
    PrintText,
    SpecialMark,
    DepartmentCode,
    ProductionList,
    Position,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Coercion {
    Text,
    NullableText,
    NullableInteger,
    Flag,
    Position,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldSpec {
    pub field: RecordField,
    pub name: &'static str,
    pub column: &'static str,
    pub coercion: Coercion,
}

pub const FIELD_TABLE: [FieldSpec; 8] = [
    FieldSpec {
        field: RecordField::Identifier,
        name: "identifier",
        column: "identifier",
        coercion: Coercion::Text,
    },
    FieldSpec {
        field: RecordField::Characteristic,
        name: "characteristic",
        column: "characteristic",
        coercion: Coercion::Text,
    },
    FieldSpec {
        field: RecordField::Value,
        name: "value",
        column: "value",
        coercion: Coercion::Text,
    },
    FieldSpec {
        field: RecordField::PrintText,
        name: "print_text",
        column: "print_text",
        coercion: Coercion::Text,
    },
    FieldSpec {
        field: RecordField::SpecialMark,
        name: "special_mark",
        column: "special_mark",
        coercion: Coercion::NullableText,
    },
    FieldSpec {
        field: RecordField::DepartmentCode,
        name: "department_code",
        column: "department_code",
        coercion: Coercion::NullableInteger,
    },
    FieldSpec {
        field: RecordField::ProductionList,
        name: "production_list",
        column: "production_list",
        coercion: Coercion::Flag,
    },
    FieldSpec {
        field: RecordField::Position,
        name: "position",
        column: "position",
        coercion: Coercion::Position,
    },
];

impl RecordField {
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        FIELD_TABLE
            .iter()
            .find(|spec| spec.name.eq_ignore_ascii_case(name))
            .map(|spec| spec.field)
    }

    pub fn spec(self) -> &'static FieldSpec {
        // FIELD_TABLE is declared in enum order.
        &FIELD_TABLE[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.spec().name
    }

    pub fn column(self) -> &'static str {
        self.spec().column
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Null,
}

impl Coercion {
    /// Converts user-supplied text into a column value. An empty string means
    /// NULL for nullable fields and "unpositioned" for the position.
    pub fn coerce(self, raw: &str) -> Result<FieldValue, FieldError> {
        let trimmed = raw.trim();
        match self {
            Self::Text => Ok(FieldValue::Text(raw.to_string())),
            Self::NullableText if trimmed.is_empty() => Ok(FieldValue::Null),
            Self::NullableText => Ok(FieldValue::Text(raw.to_string())),
            Self::NullableInteger if trimmed.is_empty() => Ok(FieldValue::Null),
            Self::NullableInteger => trimmed
                .parse::<i64>()
                .map(FieldValue::Integer)
                .map_err(|_| FieldError::NotAnInteger),
            Self::Flag => match trimmed.to_ascii_lowercase().as_str() {
                "" => Ok(FieldValue::Null),
                "0" | "false" | "no" => Ok(FieldValue::Integer(0)),
                "1" | "true" | "yes" => Ok(FieldValue::Integer(1)),
                _ => Err(FieldError::InvalidFlag),
            },
            Self::Position if trimmed.is_empty() => Ok(FieldValue::Integer(0)),
            Self::Position => trimmed
                .parse::<i64>()
                .map(FieldValue::Integer)
                .map_err(|_| FieldError::NotAnInteger),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldError {
    UnknownField,
    MissingAssignment,
    NotAnInteger,
    InvalidFlag,
    TypeMismatch(RecordField),
}

impl FieldError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::UnknownField => "unknown field",
            Self::MissingAssignment => "expected field=value",
            Self::NotAnInteger => "field value must be an integer",
            Self::InvalidFlag => "flag must be 0 or 1",
            Self::TypeMismatch(_) => "field value has the wrong type",
        }
    }
}

/// Partial update of one record. Outer `None` leaves a field untouched; for
/// nullable fields `Some(None)` clears the column.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecordPatch {
    pub identifier: Option<String>,
    pub characteristic: Option<String>,
    pub value: Option<String>,
    pub print_text: Option<String>,
    pub special_mark: Option<Option<String>>,
    pub department_code: Option<Option<i64>>,
    pub production_list: Option<Option<i64>>,
    pub position: Option<i64>,
}

impl RecordPatch {
    pub fn is_empty(&self) -> bool {
        self.identifier.is_none()
            && self.characteristic.is_none()
            && self.value.is_none()
            && self.print_text.is_none()
            && self.special_mark.is_none()
            && self.department_code.is_none()
            && self.production_list.is_none()
            && self.position.is_none()
    }

    pub fn set(&mut self, field: RecordField, value: FieldValue) -> Result<(), FieldError> {
        match (field, value) {
            (RecordField::Identifier, FieldValue::Text(text)) => self.identifier = Some(text),
            (RecordField::Characteristic, FieldValue::Text(text)) => {
                self.characteristic = Some(text)
            }
            (RecordField::Value, FieldValue::Text(text)) => self.value = Some(text),
            (RecordField::PrintText, FieldValue::Text(text)) => self.print_text = Some(text),
            (RecordField::SpecialMark, FieldValue::Text(text)) => {
                self.special_mark = Some(Some(text))
            }
            (RecordField::SpecialMark, FieldValue::Null) => self.special_mark = Some(None),
            (RecordField::DepartmentCode, FieldValue::Integer(code)) => {
                self.department_code = Some(Some(code))
            }
            (RecordField::DepartmentCode, FieldValue::Null) => self.department_code = Some(None),
            (RecordField::ProductionList, FieldValue::Integer(flag)) => {
                self.production_list = Some(Some(flag))
            }
            (RecordField::ProductionList, FieldValue::Null) => self.production_list = Some(None),
            (RecordField::Position, FieldValue::Integer(position)) => {
                self.position = Some(position)
            }
            (field, _) => return Err(FieldError::TypeMismatch(field)),
        }
        Ok(())
    }

    /// Parses `name` through the field table and coerces `raw` with the
    /// field's rule.
    pub fn set_raw(&mut self, name: &str, raw: &str) -> Result<RecordField, FieldError> {
        let field = RecordField::parse(name).ok_or(FieldError::UnknownField)?;
        let value = field.spec().coercion.coerce(raw)?;
        self.set(field, value)?;
        Ok(field)
    }

    /// Accepts `field=value`.
    pub fn set_assignment(&mut self, assignment: &str) -> Result<RecordField, FieldError> {
        let (name, raw) = assignment
            .split_once('=')
            .ok_or(FieldError::MissingAssignment)?;
        self.set_raw(name, raw)
    }

    pub fn apply_to_content(&self, content: &RecordContent) -> RecordContent {
        RecordContent {
            characteristic: self
                .characteristic
                .clone()
                .unwrap_or_else(|| content.characteristic.clone()),
            value: self.value.clone().unwrap_or_else(|| content.value.clone()),
            print_text: self
                .print_text
                .clone()
                .unwrap_or_else(|| content.print_text.clone()),
            special_mark: self
                .special_mark
                .clone()
                .unwrap_or_else(|| content.special_mark.clone()),
            department_code: self.department_code.unwrap_or(content.department_code),
            production_list: self.production_list.unwrap_or(content.production_list),
        }
    }

    /// Column assignments for every touched field except the position, in
    /// table order.
    pub fn column_assignments(&self) -> Vec<(RecordField, FieldValue)> {
        let text = |value: &Option<String>| value.clone().map(FieldValue::Text);
        let nullable_text = |value: &Option<Option<String>>| {
            value
                .clone()
                .map(|inner| inner.map(FieldValue::Text).unwrap_or(FieldValue::Null))
        };
        let nullable_integer = |value: &Option<Option<i64>>| {
            value.map(|inner| inner.map(FieldValue::Integer).unwrap_or(FieldValue::Null))
        };

        [
            (RecordField::Identifier, text(&self.identifier)),
            (RecordField::Characteristic, text(&self.characteristic)),
            (RecordField::Value, text(&self.value)),
            (RecordField::PrintText, text(&self.print_text)),
            (RecordField::SpecialMark, nullable_text(&self.special_mark)),
            (RecordField::DepartmentCode, nullable_integer(&self.department_code)),
            (RecordField::ProductionList, nullable_integer(&self.production_list)),
        ]
        .into_iter()
        .filter_map(|(field, value)| value.map(|value| (field, value)))
        .collect()
    }
}
