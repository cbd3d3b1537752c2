//! Analysis record identifiers (`ANL-<ULID>`)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use ulid::Ulid;

/// Prefix carried by every analysis record id
pub const RECORD_PREFIX: &str = "ANL";

/// A unique, time-ordered analysis record identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId {
    ulid: Ulid,
}

impl RecordId {
    /// Generate a fresh id
    pub fn new() -> Self {
        Self { ulid: Ulid::new() }
    }

    /// Creation time encoded in the ULID (millisecond precision)
    pub fn timestamp(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from(self.ulid.datetime())
    }

    /// Parse a RecordId from a string
    pub fn parse(s: &str) -> Result<Self, IdParseError> {
        s.parse()
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", RECORD_PREFIX, self.ulid)
    }
}

impl FromStr for RecordId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix_str, ulid_str) = s
            .split_once('-')
            .ok_or_else(|| IdParseError::MissingDelimiter(s.to_string()))?;

        if !prefix_str.eq_ignore_ascii_case(RECORD_PREFIX) {
            return Err(IdParseError::InvalidPrefix(prefix_str.to_string()));
        }
        let ulid = Ulid::from_string(ulid_str)
            .map_err(|e| IdParseError::InvalidUlid(ulid_str.to_string(), e.to_string()))?;

        Ok(Self { ulid })
    }
}

impl Serialize for RecordId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Errors that can occur when parsing record IDs
#[derive(Debug, Error)]
pub enum IdParseError {
    #[error("invalid record prefix: '{0}' (expected ANL)")]
    InvalidPrefix(String),

    #[error("missing '-' delimiter in record ID: '{0}'")]
    MissingDelimiter(String),

    #[error("invalid ULID '{0}': {1}")]
    InvalidUlid(String, String),
}
