//! Duplicate resolution.
//!
//! An incoming record is matched against stored records first by exact content
//! hash, then (social platforms only) by caption similarity within a recent
//! window. A match places the record in a duplicate group whose primary is
//! re-elected over every member. Resolution only reads; the resulting
//! [`GroupPlan`] is applied by the store together with the record write.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use feedline_common::text::jaccard;
use feedline_common::{ContentRecord, DedupConfig, DedupError, NormalizedContent};

use crate::hash::{best_text, generate_content_hash_with};
use crate::selector::{select_primary, Candidate};
use crate::store::{DuplicateStore, GroupHandover, GroupPlan, NewContentRecord, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupOutcome {
    /// No duplicate found; the record stands alone.
    NewPrimary,
    /// Duplicate found and this record was elected primary.
    DuplicatePrimary,
    /// Duplicate found and an existing record stays primary.
    DuplicateSecondary,
}

impl DedupOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DedupOutcome::NewPrimary => "new_primary",
            DedupOutcome::DuplicatePrimary => "duplicate_primary",
            DedupOutcome::DuplicateSecondary => "duplicate_secondary",
        }
    }

    fn of(record: &ContentRecord) -> Self {
        match (record.duplicate_group_id, record.is_primary) {
            (None, _) => DedupOutcome::NewPrimary,
            (Some(_), true) => DedupOutcome::DuplicatePrimary,
            (Some(_), false) => DedupOutcome::DuplicateSecondary,
        }
    }
}

impl std::fmt::Display for DedupOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Similar,
}

/// What should happen to an incoming record.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Id the record is stored under. Fresh for new keys, the stored id otherwise.
    pub record_id: Uuid,
    pub content_hash: String,
    pub duplicate_group_id: Option<Uuid>,
    pub is_primary: bool,
    /// False only when the same item was already stored with the same hash.
    pub should_store: bool,
    pub outcome: DedupOutcome,
    /// Stored records that matched the incoming one.
    pub matched: Vec<Uuid>,
    pub match_kind: Option<MatchKind>,
    /// Group membership to apply with the write. `None` for standalone records.
    pub plan: Option<GroupPlan>,
    /// Successor for the group this record was primary of and is leaving.
    pub handover: Option<GroupHandover>,
    /// The stored version of this item, if it was ingested before.
    pub existing: Option<ContentRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestStatus {
    Created,
    Updated,
    Skipped,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IngestResult {
    pub record: ContentRecord,
    pub outcome: DedupOutcome,
    pub match_kind: Option<MatchKind>,
    pub status: IngestStatus,
}

pub struct DuplicateResolver {
    store: Arc<dyn DuplicateStore>,
    config: DedupConfig,
}

impl DuplicateResolver {
    pub fn new(store: Arc<dyn DuplicateStore>, config: DedupConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &DedupConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn DuplicateStore> {
        &self.store
    }

    /// Decide the dedup state of `content` without writing anything.
    pub async fn resolve(&self, content: &NormalizedContent) -> Result<Resolution> {
        let content_hash = generate_content_hash_with(content, self.config.fingerprint_tokens);

        let existing = self
            .store
            .find_existing(
                &content.creator_id,
                content.platform,
                &content.platform_content_id,
            )
            .await?;

        if let Some(stored) = &existing {
            if stored.content_hash.as_deref() == Some(content_hash.as_str()) {
                debug!(
                    creator_id = %content.creator_id,
                    platform = %content.platform,
                    id = %stored.id,
                    "Content unchanged since last ingest"
                );
                return Ok(Resolution {
                    record_id: stored.id,
                    content_hash,
                    duplicate_group_id: stored.duplicate_group_id,
                    is_primary: stored.is_primary,
                    should_store: false,
                    outcome: DedupOutcome::of(stored),
                    matched: Vec::new(),
                    match_kind: None,
                    plan: None,
                    handover: None,
                    existing,
                });
            }
        }

        let record_id = existing.as_ref().map(|r| r.id).unwrap_or_else(Uuid::new_v4);
        let is_self = |r: &ContentRecord| {
            r.id == record_id
                || (r.platform() == content.platform
                    && r.creator_id() == content.creator_id
                    && r.content.platform_content_id == content.platform_content_id)
        };

        let mut matched: Vec<ContentRecord> = self
            .store
            .find_by_hash(&content_hash)
            .await?
            .into_iter()
            .filter(|r| !is_self(r))
            .collect();
        let mut match_kind = (!matched.is_empty()).then_some(MatchKind::Exact);

        if matched.is_empty() && content.platform.is_social() {
            if let Some(similar) = self.find_similar(content, &is_self).await? {
                matched.push(similar);
                match_kind = Some(MatchKind::Similar);
            }
        }

        if matched.is_empty() {
            let handover = self.handover(existing.as_ref(), None, &[], &is_self).await?;
            debug!(
                creator_id = %content.creator_id,
                platform = %content.platform,
                "No duplicate found"
            );
            return Ok(Resolution {
                record_id,
                content_hash,
                duplicate_group_id: None,
                is_primary: true,
                should_store: true,
                outcome: DedupOutcome::NewPrimary,
                matched: Vec::new(),
                match_kind: None,
                plan: None,
                handover,
                existing,
            });
        }

        let group_id = matched
            .iter()
            .find_map(|r| r.duplicate_group_id)
            .unwrap_or_else(Uuid::new_v4);

        // Matched records first, then the rest of their groups, then the new
        // record, so exact ranking ties keep an existing primary.
        let mut members = matched.clone();
        let mut groups: Vec<Uuid> = Vec::new();
        for group in matched.iter().filter_map(|r| r.duplicate_group_id) {
            if !groups.contains(&group) {
                groups.push(group);
            }
        }
        for group in groups {
            for member in self.store.find_group(group).await? {
                if !is_self(&member) && !members.iter().any(|m| m.id == member.id) {
                    members.push(member);
                }
            }
        }

        let mut candidates: Vec<Candidate> = members.iter().map(Candidate::from).collect();
        candidates.push(Candidate {
            id: record_id,
            platform: content.platform,
            published_at: content.published_at,
        });
        let primary = select_primary(&candidates, &self.config.priorities)?;
        let is_primary = primary == record_id;
        let outcome = if is_primary {
            DedupOutcome::DuplicatePrimary
        } else {
            DedupOutcome::DuplicateSecondary
        };
        let member_ids: Vec<Uuid> = members.iter().map(|r| r.id).collect();
        let handover = self
            .handover(existing.as_ref(), Some(group_id), &member_ids, &is_self)
            .await?;

        info!(
            creator_id = %content.creator_id,
            platform = %content.platform,
            %group_id,
            %outcome,
            members = members.len() + 1,
            "Duplicate resolved"
        );

        Ok(Resolution {
            record_id,
            content_hash,
            duplicate_group_id: Some(group_id),
            is_primary,
            should_store: true,
            outcome,
            matched: matched.iter().map(|r| r.id).collect(),
            match_kind,
            plan: Some(GroupPlan {
                group_id,
                members: member_ids,
                primary,
            }),
            handover,
            existing,
        })
    }

    /// First recent same-creator social record whose caption overlaps enough.
    async fn find_similar(
        &self,
        content: &NormalizedContent,
        is_self: &(dyn Fn(&ContentRecord) -> bool + Send + Sync),
    ) -> Result<Option<ContentRecord>> {
        let text = best_text(content);
        if text.trim().is_empty() {
            return Ok(None);
        }

        let since = Utc::now() - Duration::days(self.config.similarity_window_days);
        let recent = self
            .store
            .find_recent_social(&content.creator_id, since)
            .await?;

        Ok(recent.into_iter().filter(|r| !is_self(r)).find(|r| {
            let score = jaccard(text, r.content.description.as_deref().unwrap_or(""));
            if score >= self.config.similarity_threshold {
                debug!(id = %r.id, score, "Similar content found");
                true
            } else {
                false
            }
        }))
    }

    /// An edited record that was primary and moves out of its group must hand
    /// that group to one of the members staying behind.
    async fn handover(
        &self,
        existing: Option<&ContentRecord>,
        new_group: Option<Uuid>,
        moving: &[Uuid],
        is_self: &(dyn Fn(&ContentRecord) -> bool + Send + Sync),
    ) -> Result<Option<GroupHandover>> {
        let Some(previous) = existing else {
            return Ok(None);
        };
        let Some(old_group) = previous.duplicate_group_id else {
            return Ok(None);
        };
        if !previous.is_primary || new_group == Some(old_group) {
            return Ok(None);
        }

        let staying: Vec<Candidate> = self
            .store
            .find_group(old_group)
            .await?
            .iter()
            .filter(|r| !is_self(*r) && !moving.contains(&r.id))
            .map(Candidate::from)
            .collect();
        if staying.is_empty() {
            return Ok(None);
        }
        let primary = select_primary(&staying, &self.config.priorities)?;
        debug!(group_id = %old_group, %primary, "Primary leaving group, successor chosen");
        Ok(Some(GroupHandover {
            group_id: old_group,
            primary,
        }))
    }

    /// Resolve and store `content`, retrying once if another writer changed
    /// its duplicates in between.
    pub async fn ingest(&self, content: &NormalizedContent) -> Result<IngestResult> {
        match self.try_ingest(content).await {
            Err(DedupError::StaleResolution { content_hash }) => {
                warn!(
                    creator_id = %content.creator_id,
                    hash = %content_hash,
                    "Resolution went stale, resolving again"
                );
                self.try_ingest(content).await
            }
            other => other,
        }
    }

    async fn try_ingest(&self, content: &NormalizedContent) -> Result<IngestResult> {
        let resolution = self.resolve(content).await?;

        if !resolution.should_store {
            if let Some(record) = resolution.existing {
                return Ok(IngestResult {
                    record,
                    outcome: resolution.outcome,
                    match_kind: None,
                    status: IngestStatus::Skipped,
                });
            }
        }

        let new = NewContentRecord {
            id: resolution.record_id,
            content: content.clone(),
            content_hash: resolution.content_hash.clone(),
            duplicate_group_id: resolution.duplicate_group_id,
            is_primary: resolution.is_primary,
            handover: resolution.handover,
        };
        let stored = self.store.upsert(new, resolution.plan.as_ref()).await?;

        if let Some(handover) = resolution.handover {
            info!(
                group_id = %handover.group_id,
                primary = %handover.primary,
                "Primary left group, re-elected"
            );
        }

        Ok(IngestResult {
            outcome: resolution.outcome,
            match_kind: resolution.match_kind,
            status: if stored.created {
                IngestStatus::Created
            } else {
                IngestStatus::Updated
            },
            record: stored.record,
        })
    }

    /// Manually make `record_id` the primary of `group_id`.
    pub async fn override_primary(&self, group_id: Uuid, record_id: Uuid) -> Result<()> {
        self.store.set_group_primary(group_id, record_id).await?;
        info!(%group_id, %record_id, "Primary overridden");
        Ok(())
    }

    /// Every record in a duplicate group, for audit.
    pub async fn group_members(&self, group_id: Uuid) -> Result<Vec<ContentRecord>> {
        self.store.find_group(group_id).await
    }
}
