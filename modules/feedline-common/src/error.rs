use thiserror::Error;
use uuid::Uuid;

/// Projecting a raw platform payload into a canonical record failed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NormalizeError {
    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("Normalization error ({platform}): {reason}")]
    Normalization { platform: String, reason: String },
}

impl NormalizeError {
    pub fn invalid(platform: impl std::fmt::Display, reason: impl Into<String>) -> Self {
        NormalizeError::Normalization {
            platform: platform.to_string(),
            reason: reason.into(),
        }
    }
}

/// Primary selection was invoked incorrectly. Always a caller bug.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("Primary selection requires at least one candidate")]
    EmptyCandidateSet,
}

/// Duplicate-group state could not be read or written consistently.
#[derive(Error, Debug)]
pub enum DedupError {
    #[error("Deduplication store error: {0}")]
    Store(String),

    /// The store changed under a resolution between read and write.
    #[error("Stale resolution for content hash {content_hash}")]
    StaleResolution { content_hash: String },

    #[error("Record {record_id} is not a member of duplicate group {group_id}")]
    NotInGroup { record_id: Uuid, group_id: Uuid },

    #[error(transparent)]
    Selection(#[from] SelectionError),
}

impl DedupError {
    /// Wrap any underlying store failure, keeping its message as the cause.
    pub fn store(err: impl std::fmt::Display) -> Self {
        DedupError::Store(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration error: {0}")]
    Invalid(String),
}

/// Per-item failure surfaced in a batch summary.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error(transparent)]
    Dedup(#[from] DedupError),
}
