#![forbid(unsafe_code)]

use std::time::Duration;

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// How write transactions claim the position sequence.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PositionLock {
    /// Take the database write lock at BEGIN. Concurrent writers queue up
    /// behind each other, so the occupancy check and the shift cannot race.
    #[default]
    Immediate,
    /// Take the lock on first write. Two writers may both pass the occupancy
    /// check before either shifts.
    Deferred,
}

impl PositionLock {
    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "immediate" => Some(Self::Immediate),
            "deferred" => Some(Self::Deferred),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Immediate => "immediate",
            Self::Deferred => "deferred",
        }
    }
}

/// What `update_record` does with a new position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PositionUpdatePolicy {
    /// Reorder through the shift engine, same as `move_record`.
    #[default]
    Move,
    /// Write the column as given. Other records keep their positions, so the
    /// result may contain duplicates.
    Overwrite,
}

impl PositionUpdatePolicy {
    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "move" => Some(Self::Move),
            "overwrite" => Some(Self::Overwrite),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Move => "move",
            Self::Overwrite => "overwrite",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreConfig {
    pub busy_timeout: Duration,
    pub position_lock: PositionLock,
    pub position_update: PositionUpdatePolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            position_lock: PositionLock::default(),
            position_update: PositionUpdatePolicy::default(),
        }
    }
}
