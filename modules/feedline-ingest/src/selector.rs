// Primary election for duplicate groups.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use feedline_common::{ContentRecord, Platform, PriorityTable, SelectionError};

/// The fields primary election looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub id: Uuid,
    pub platform: Platform,
    pub published_at: DateTime<Utc>,
}

impl From<&ContentRecord> for Candidate {
    fn from(record: &ContentRecord) -> Self {
        Self {
            id: record.id,
            platform: record.platform(),
            published_at: record.published_at(),
        }
    }
}

/// Pick the primary: highest platform priority, then most recent.
/// Exact ties keep input order.
pub fn select_primary(
    candidates: &[Candidate],
    priorities: &PriorityTable,
) -> Result<Uuid, SelectionError> {
    match candidates {
        [] => Err(SelectionError::EmptyCandidateSet),
        [only] => Ok(only.id),
        _ => {
            let mut ranked: Vec<&Candidate> = candidates.iter().collect();
            // sort_by is stable, so equal keys stay in input order.
            ranked.sort_by(|a, b| {
                priorities
                    .priority(b.platform)
                    .cmp(&priorities.priority(a.platform))
                    .then_with(|| b.published_at.cmp(&a.published_at))
            });
            Ok(ranked[0].id)
        }
    }
}
