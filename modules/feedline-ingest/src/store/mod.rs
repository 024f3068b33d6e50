// Storage boundary for duplicate resolution.
//
// The resolver only reads through this trait; every write that touches group
// state goes through one combined call (`upsert` with a `GroupPlan`, or
// `set_group_primary`) so no caller can leave a group with two primaries, or
// with none.

mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use feedline_common::{ContentRecord, DedupError, NormalizedContent, Platform};

pub use postgres::PgContentStore;

pub type Result<T> = std::result::Result<T, DedupError>;

/// A record about to be written, with its resolved dedup state.
#[derive(Debug, Clone, PartialEq)]
pub struct NewContentRecord {
    /// Id to insert under. Ignored when the `(platform, platform_content_id,
    /// creator_id)` key already exists; the existing id is kept.
    pub id: Uuid,
    pub content: NormalizedContent,
    pub content_hash: String,
    pub duplicate_group_id: Option<Uuid>,
    pub is_primary: bool,
    /// Successor for the group this record was primary of and is leaving.
    pub handover: Option<GroupHandover>,
}

/// The group a primary is leaving, and who takes over there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupHandover {
    pub group_id: Uuid,
    pub primary: Uuid,
}

/// Group membership to apply atomically with the upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupPlan {
    pub group_id: Uuid,
    /// Existing records that belong to the group after this write.
    pub members: Vec<Uuid>,
    /// The elected primary: one of `members`, or the incoming record's id.
    pub primary: Uuid,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpsertOutcome {
    pub record: ContentRecord,
    pub created: bool,
}

#[async_trait]
pub trait DuplicateStore: Send + Sync {
    /// All records carrying this content hash, oldest first.
    async fn find_by_hash(&self, content_hash: &str) -> Result<Vec<ContentRecord>>;

    /// Same-creator social records published at or after `since` that have a
    /// hash, most recent first.
    async fn find_recent_social(
        &self,
        creator_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<ContentRecord>>;

    /// Members of a duplicate group, oldest first.
    async fn find_group(&self, group_id: Uuid) -> Result<Vec<ContentRecord>>;

    async fn find_existing(
        &self,
        creator_id: &str,
        platform: Platform,
        platform_content_id: &str,
    ) -> Result<Option<ContentRecord>>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ContentRecord>>;

    /// Insert or update the record keyed by `(platform, platform_content_id,
    /// creator_id)`. With a plan, in the same operation: every plan member
    /// joins the group and exactly `plan.primary` ends up primary. With a
    /// handover, the group the record leaves gets `handover.primary` as its
    /// only primary in the same operation.
    ///
    /// Fails with `DedupError::StaleResolution` if another record with the
    /// same hash exists that the plan does not account for, or if the
    /// handover successor is no longer in the group being left.
    async fn upsert(
        &self,
        record: NewContentRecord,
        plan: Option<&GroupPlan>,
    ) -> Result<UpsertOutcome>;

    /// Make `record_id` the group's only primary, in one operation.
    async fn set_group_primary(&self, group_id: Uuid, record_id: Uuid) -> Result<()>;
}

/// Whether a plan misses records that share the incoming hash.
///
/// `others` holds `(id, duplicate_group_id)` for every stored record with the
/// same hash, except the one being written.
pub(crate) fn is_stale(others: &[(Uuid, Option<Uuid>)], plan: Option<&GroupPlan>) -> bool {
    match plan {
        None => !others.is_empty(),
        Some(plan) => others.iter().any(|(id, group)| {
            !plan.members.contains(id) && *group != Some(plan.group_id)
        }),
    }
}
