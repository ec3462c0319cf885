//! Job identity and the retry envelope that rides inside queue messages.
//!
//! The envelope is the only persisted state of an outstanding retry. It is
//! serialized as JSON into the queue message body, so every field must
//! round-trip losslessly.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{DelayqError, Result};

/// Opaque caller-supplied identity of a unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for JobId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<u64> for JobId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

/// Public view of a job handed to the work function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMessage {
    pub id: JobId,
    /// Number of attempts made so far, including the one about to run.
    pub attempted_count: u32,
}

/// Serializable retry state of one outstanding job.
///
/// Invariants: `attempted_count` and `next_attempt_at` never decrease. Only
/// the reconciler mutates them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobEnvelope {
    #[serde(flatten)]
    pub message: JobMessage,
    /// When the job was first submitted.
    pub submitted_at: DateTime<Utc>,
    /// Earliest instant at which the job may run again.
    pub next_attempt_at: DateTime<Utc>,
}

impl JobEnvelope {
    /// Fresh envelope for a newly submitted job, due immediately.
    pub fn new(id: impl Into<JobId>, now: DateTime<Utc>) -> Self {
        Self {
            message: JobMessage { id: id.into(), attempted_count: 0 },
            submitted_at: now,
            next_attempt_at: now,
        }
    }

    pub fn id(&self) -> &JobId {
        &self.message.id
    }

    pub fn attempted_count(&self) -> u32 {
        self.message.attempted_count
    }

    /// Encode as a queue message body.
    pub fn to_body(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a queue message body.
    ///
    /// # Errors
    /// `InvalidInput` for an empty body, `Serialization` for anything that is
    /// not a well-formed envelope.
    pub fn from_body(body: &str) -> Result<Self> {
        if body.trim().is_empty() {
            return Err(DelayqError::InvalidInput("queue message has no body".to_string()));
        }
        Ok(serde_json::from_str(body)?)
    }
}
