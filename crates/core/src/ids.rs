#![forbid(unsafe_code)]

use std::collections::BTreeSet;

const MAX_IDENTIFIER_LEN: usize = 128;

/// Owner key of a record. Two records with equal content and different
/// identifiers belong to the same group.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identifier(String);

impl Identifier {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn try_new(value: impl Into<String>) -> Result<Self, IdentifierError> {
        let value = value.into();
        let trimmed = value.trim();
        validate_identifier(trimmed)?;
        Ok(Self(trimmed.to_string()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IdentifierError {
    Empty,
    TooLong,
    ContainsControl,
}

impl IdentifierError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Empty => "identifier must not be empty",
            Self::TooLong => "identifier is too long",
            Self::ContainsControl => "identifier contains control characters",
        }
    }
}

fn validate_identifier(value: &str) -> Result<(), IdentifierError> {
    if value.is_empty() {
        return Err(IdentifierError::Empty);
    }
    if value.chars().count() > MAX_IDENTIFIER_LEN {
        return Err(IdentifierError::TooLong);
    }
    if value.chars().any(|c| c.is_control()) {
        return Err(IdentifierError::ContainsControl);
    }
    Ok(())
}

/// Validates every raw identifier and drops repeats, keeping the first
/// occurrence so insertion order follows the caller's order.
pub fn unique_identifiers<S: AsRef<str>>(values: &[S]) -> Result<Vec<Identifier>, IdentifierError> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::with_capacity(values.len());
    for raw in values {
        let identifier = Identifier::try_new(raw.as_ref())?;
        if seen.insert(identifier.clone()) {
            out.push(identifier);
        }
    }
    Ok(out)
}
