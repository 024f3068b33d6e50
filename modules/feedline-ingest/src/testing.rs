// Test support for the ingest pipeline.
//
// - MemoryStore (DuplicateStore): stateful in-memory table with the same
//   combined-write and stale-plan semantics as the Postgres store
// - fixture builders for NormalizedContent and stored records

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use feedline_common::{
    ContentRecord, DedupError, EngagementMetrics, NormalizedContent, Platform, ProcessingStatus,
};

use crate::store::{is_stale, DuplicateStore, GroupPlan, NewContentRecord, Result, UpsertOutcome};

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

struct MemoryStoreInner {
    /// Insertion order doubles as creation order.
    records: Vec<ContentRecord>,
    failure: Option<String>,
    /// Failure for `set_group_primary` only.
    primary_failure: Option<String>,
    /// Written just before the next upsert checks its plan, as if by another writer.
    interleaved: Vec<ContentRecord>,
    upserts: usize,
}

/// In-memory `DuplicateStore`. Every operation runs under one mutex, so each
/// call is atomic the way a Postgres transaction is.
pub struct MemoryStore {
    inner: Mutex<MemoryStoreInner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn same_key(record: &ContentRecord, content: &NormalizedContent) -> bool {
    record.content.platform == content.platform
        && record.content.platform_content_id == content.platform_content_id
        && record.content.creator_id == content.creator_id
}

fn primaries_in(records: &[ContentRecord], group_id: Uuid) -> usize {
    records
        .iter()
        .filter(|r| r.duplicate_group_id == Some(group_id) && r.is_primary)
        .count()
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MemoryStoreInner {
                records: Vec::new(),
                failure: None,
                primary_failure: None,
                interleaved: Vec::new(),
                upserts: 0,
            }),
        }
    }

    /// Make every operation fail with `DedupError::Store(message)`.
    pub fn failing(self, message: &str) -> Self {
        self.set_failure(Some(message));
        self
    }

    /// Make only `set_group_primary` fail with `DedupError::Store(message)`.
    pub fn failing_set_primary(self, message: &str) -> Self {
        self.inner.lock().unwrap().primary_failure = Some(message.to_string());
        self
    }

    pub fn set_failure(&self, message: Option<&str>) {
        self.inner.lock().unwrap().failure = message.map(str::to_string);
    }

    /// Pre-populate a stored record.
    pub fn seed(&self, record: ContentRecord) {
        self.inner.lock().unwrap().records.push(record);
    }

    /// Insert `record` right before the next upsert runs, simulating a
    /// concurrent writer that slipped in after resolution.
    pub fn interleave_before_next_upsert(&self, record: ContentRecord) {
        self.inner.lock().unwrap().interleaved.push(record);
    }

    // --- Assertion helpers ---

    pub fn records(&self) -> Vec<ContentRecord> {
        self.inner.lock().unwrap().records.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn upsert_calls(&self) -> usize {
        self.inner.lock().unwrap().upserts
    }

    pub fn record(&self, id: Uuid) -> Option<ContentRecord> {
        self.inner
            .lock()
            .unwrap()
            .records
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    /// Panics unless every duplicate group has exactly one primary.
    pub fn assert_group_invariant(&self) {
        let inner = self.inner.lock().unwrap();
        let mut primaries: HashMap<Uuid, usize> = HashMap::new();
        for r in &inner.records {
            if let Some(group) = r.duplicate_group_id {
                *primaries.entry(group).or_default() += usize::from(r.is_primary);
            }
        }
        for (group, count) in primaries {
            assert_eq!(count, 1, "group {group} has {count} primaries");
        }
    }

    fn check_failure(inner: &MemoryStoreInner) -> Result<()> {
        match &inner.failure {
            Some(message) => Err(DedupError::store(message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DuplicateStore for MemoryStore {
    async fn find_by_hash(&self, content_hash: &str) -> Result<Vec<ContentRecord>> {
        let inner = self.inner.lock().unwrap();
        Self::check_failure(&inner)?;
        Ok(inner
            .records
            .iter()
            .filter(|r| r.content_hash.as_deref() == Some(content_hash))
            .cloned()
            .collect())
    }

    async fn find_recent_social(
        &self,
        creator_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<ContentRecord>> {
        let inner = self.inner.lock().unwrap();
        Self::check_failure(&inner)?;
        let mut found: Vec<ContentRecord> = inner
            .records
            .iter()
            .rev()
            .filter(|r| {
                r.creator_id() == creator_id
                    && r.platform().is_social()
                    && r.content_hash.is_some()
                    && r.published_at() >= since
            })
            .cloned()
            .collect();
        found.sort_by(|a, b| b.published_at().cmp(&a.published_at()));
        Ok(found)
    }

    async fn find_group(&self, group_id: Uuid) -> Result<Vec<ContentRecord>> {
        let inner = self.inner.lock().unwrap();
        Self::check_failure(&inner)?;
        Ok(inner
            .records
            .iter()
            .filter(|r| r.duplicate_group_id == Some(group_id))
            .cloned()
            .collect())
    }

    async fn find_existing(
        &self,
        creator_id: &str,
        platform: Platform,
        platform_content_id: &str,
    ) -> Result<Option<ContentRecord>> {
        let inner = self.inner.lock().unwrap();
        Self::check_failure(&inner)?;
        Ok(inner
            .records
            .iter()
            .find(|r| {
                r.platform() == platform
                    && r.content.platform_content_id == platform_content_id
                    && r.creator_id() == creator_id
            })
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ContentRecord>> {
        let inner = self.inner.lock().unwrap();
        Self::check_failure(&inner)?;
        Ok(inner.records.iter().find(|r| r.id == id).cloned())
    }

    async fn upsert(
        &self,
        record: NewContentRecord,
        plan: Option<&GroupPlan>,
    ) -> Result<UpsertOutcome> {
        let mut inner = self.inner.lock().unwrap();
        Self::check_failure(&inner)?;
        inner.upserts += 1;
        let interleaved: Vec<ContentRecord> = inner.interleaved.drain(..).collect();
        inner.records.extend(interleaved);

        let others: Vec<(Uuid, Option<Uuid>)> = inner
            .records
            .iter()
            .filter(|r| {
                r.content_hash.as_deref() == Some(record.content_hash.as_str())
                    && !same_key(r, &record.content)
            })
            .map(|r| (r.id, r.duplicate_group_id))
            .collect();
        if is_stale(&others, plan) {
            return Err(DedupError::StaleResolution {
                content_hash: record.content_hash,
            });
        }

        // Work on a copy so a rejected write leaves nothing behind.
        let mut records = inner.records.clone();
        let now = Utc::now();
        let (id, created) = match records.iter_mut().find(|r| same_key(r, &record.content)) {
            Some(existing) => {
                existing.content = record.content.clone();
                existing.content_hash = Some(record.content_hash.clone());
                existing.duplicate_group_id = record.duplicate_group_id;
                existing.is_primary = record.is_primary;
                existing.updated_at = now;
                (existing.id, false)
            }
            None => {
                records.push(ContentRecord {
                    id: record.id,
                    content: record.content.clone(),
                    content_hash: Some(record.content_hash.clone()),
                    duplicate_group_id: record.duplicate_group_id,
                    is_primary: record.is_primary,
                    processing_status: ProcessingStatus::Pending,
                    created_at: now,
                    updated_at: now,
                });
                (record.id, true)
            }
        };

        if let Some(plan) = plan {
            let primary = if plan.primary == record.id { id } else { plan.primary };
            for r in records.iter_mut() {
                if r.id == id
                    || plan.members.contains(&r.id)
                    || r.duplicate_group_id == Some(plan.group_id)
                {
                    r.duplicate_group_id = Some(plan.group_id);
                    r.is_primary = r.id == primary;
                    r.updated_at = now;
                }
            }
            let count = primaries_in(&records, plan.group_id);
            if count != 1 {
                return Err(DedupError::store(format!(
                    "duplicate group {} would have {count} primaries",
                    plan.group_id
                )));
            }
        }

        if let Some(handover) = record.handover {
            let successor_stayed = records.iter().any(|r| {
                r.id == handover.primary && r.duplicate_group_id == Some(handover.group_id)
            });
            if !successor_stayed {
                return Err(DedupError::StaleResolution {
                    content_hash: record.content_hash,
                });
            }
            for r in records
                .iter_mut()
                .filter(|r| r.duplicate_group_id == Some(handover.group_id))
            {
                r.is_primary = r.id == handover.primary;
                r.updated_at = now;
            }
            let count = primaries_in(&records, handover.group_id);
            if count != 1 {
                return Err(DedupError::store(format!(
                    "duplicate group {} would have {count} primaries",
                    handover.group_id
                )));
            }
        }

        let stored = records
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| DedupError::store("upserted record vanished"))?;
        inner.records = records;

        Ok(UpsertOutcome {
            record: stored,
            created,
        })
    }

    async fn set_group_primary(&self, group_id: Uuid, record_id: Uuid) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        Self::check_failure(&inner)?;
        if let Some(message) = &inner.primary_failure {
            return Err(DedupError::store(message));
        }
        let is_member = inner
            .records
            .iter()
            .any(|r| r.id == record_id && r.duplicate_group_id == Some(group_id));
        if !is_member {
            return Err(DedupError::NotInGroup {
                record_id,
                group_id,
            });
        }
        let now = Utc::now();
        for r in inner
            .records
            .iter_mut()
            .filter(|r| r.duplicate_group_id == Some(group_id))
        {
            r.is_primary = r.id == record_id;
            r.updated_at = now;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Minimal normalized content whose identifying text is `text`.
pub fn content(platform: Platform, creator_id: &str, text: &str) -> NormalizedContent {
    NormalizedContent {
        creator_id: creator_id.to_string(),
        platform,
        platform_content_id: Uuid::new_v4().to_string(),
        url: None,
        title: None,
        description: Some(text.to_string()),
        content_body: None,
        author_name: None,
        thumbnail_url: None,
        media_urls: Vec::new(),
        engagement_metrics: EngagementMetrics::default(),
        word_count: feedline_common::text::word_count(text),
        reading_time_minutes: 1,
        published_at: Utc::now(),
    }
}

/// `content` published `minutes_ago` minutes before now.
pub fn content_at(
    platform: Platform,
    creator_id: &str,
    text: &str,
    minutes_ago: i64,
) -> NormalizedContent {
    let mut c = content(platform, creator_id, text);
    c.published_at = Utc::now() - Duration::minutes(minutes_ago);
    c
}

/// A stored record, as if written earlier.
pub fn stored(
    content: NormalizedContent,
    content_hash: &str,
    duplicate_group_id: Option<Uuid>,
    is_primary: bool,
) -> ContentRecord {
    let now = Utc::now();
    ContentRecord {
        id: Uuid::new_v4(),
        content,
        content_hash: Some(content_hash.to_string()),
        duplicate_group_id,
        is_primary,
        processing_status: ProcessingStatus::Pending,
        created_at: now,
        updated_at: now,
    }
}

/// A caption made of `n` distinct significant words, `word0 word1 ...`.
pub fn caption(prefix: &str, n: usize) -> String {
    (0..n)
        .map(|i| format!("{prefix}{i}"))
        .collect::<Vec<_>>()
        .join(" ")
}
