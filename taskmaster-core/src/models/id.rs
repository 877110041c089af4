//! Canonical entity identifiers.
//!
//! Ids are client-generated from the wall clock (milliseconds since the Unix
//! epoch, rendered as a decimal string) and double as the remote document key.
//! Older exports stored them as JSON numbers; those are coerced to the string
//! form on deserialization so the rest of the crate only ever sees one type.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use thiserror::Error;

/// Longest id accepted as a remote document key.
pub const MAX_ID_LEN: usize = 128;

static LAST_ISSUED: AtomicI64 = AtomicI64::new(0);

/// Errors produced when validating an id.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EntityIdError {
    #[error("Entity id cannot be empty")]
    Empty,

    #[error("Entity id is longer than {MAX_ID_LEN} bytes")]
    TooLong,

    #[error("Entity id contains a path separator: {0}")]
    PathSeparator(String),

    #[error("Entity id is reserved: {0}")]
    Reserved(String),
}

/// Identifier shared by tasks, reminders and notes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Generates a new time-based id.
    ///
    /// Ids issued by one process are strictly increasing even when several
    /// are created within the same millisecond.
    pub fn generate() -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        let mut last = LAST_ISSUED.load(Ordering::Relaxed);
        loop {
            let next = if now > last { now } else { last + 1 };
            match LAST_ISSUED.compare_exchange_weak(last, next, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => return Self(next.to_string()),
                Err(actual) => last = actual,
            }
        }
    }

    /// Validates and wraps an existing id.
    pub fn parse(value: impl Into<String>) -> Result<Self, EntityIdError> {
        let value = value.into();
        if value.is_empty() {
            return Err(EntityIdError::Empty);
        }
        if value.len() > MAX_ID_LEN {
            return Err(EntityIdError::TooLong);
        }
        if value.contains('/') || value.contains('\\') {
            return Err(EntityIdError::PathSeparator(value));
        }
        if value == "." || value == ".." {
            return Err(EntityIdError::Reserved(value));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for EntityId {
    type Err = EntityIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl PartialEq<str> for EntityId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for EntityId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(u64),
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = match RawId::deserialize(deserializer)? {
            RawId::Text(s) => s,
            RawId::Number(n) => n.to_string(),
        };
        EntityId::parse(raw).map_err(serde::de::Error::custom)
    }
}
