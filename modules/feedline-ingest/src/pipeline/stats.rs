use serde::Serialize;

use crate::resolver::{DedupOutcome, IngestResult, IngestStatus};

/// One item that could not be ingested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemError {
    /// Platform-native id, else URL, else `item[<index>]`.
    pub item_id: String,
    pub message: String,
}

/// Stats from one ingest batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub created: u32,
    pub updated: u32,
    /// Already stored with the same content hash.
    pub skipped: u32,
    /// Written items that landed in a duplicate group.
    pub duplicates: u32,
    pub errors: Vec<ItemError>,
}

impl BatchSummary {
    pub fn record(&mut self, result: &IngestResult) {
        match result.status {
            IngestStatus::Created => self.created += 1,
            IngestStatus::Updated => self.updated += 1,
            IngestStatus::Skipped => {
                self.skipped += 1;
                return;
            }
        }
        if result.outcome != DedupOutcome::NewPrimary {
            self.duplicates += 1;
        }
    }

    pub fn fail(&mut self, item_id: impl Into<String>, error: impl std::fmt::Display) {
        self.errors.push(ItemError {
            item_id: item_id.into(),
            message: error.to_string(),
        });
    }

    pub fn merge(&mut self, other: BatchSummary) {
        self.created += other.created;
        self.updated += other.updated;
        self.skipped += other.skipped;
        self.duplicates += other.duplicates;
        self.errors.extend(other.errors);
    }

    /// Items seen, including failures.
    pub fn total(&self) -> usize {
        (self.created + self.updated + self.skipped) as usize + self.errors.len()
    }
}

impl std::fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Ingest Batch Complete ===")?;
        writeln!(f, "Created:    {}", self.created)?;
        writeln!(f, "Updated:    {}", self.updated)?;
        writeln!(f, "Skipped:    {}", self.skipped)?;
        writeln!(f, "Duplicates: {}", self.duplicates)?;
        writeln!(f, "Errors:     {}", self.errors.len())?;
        for e in &self.errors {
            writeln!(f, "  {}: {}", e.item_id, e.message)?;
        }
        Ok(())
    }
}
