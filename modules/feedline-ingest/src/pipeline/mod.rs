//! Batch ingestion: normalize every item, then resolve and store them.
//!
//! Items of one creator are resolved strictly in input order under that
//! creator's lock; different creators run concurrently. A failing item is
//! recorded in the summary and never stops its siblings.

pub mod stats;

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use feedline_common::{DedupConfig, NormalizedContent};

use crate::locks::CreatorLocks;
use crate::normalizer::{json_identifier, normalize, normalize_multiple, RawPayload};
use crate::resolver::DuplicateResolver;
use crate::store::DuplicateStore;

pub use stats::{BatchSummary, ItemError};

pub struct IngestPipeline {
    resolver: DuplicateResolver,
    locks: Arc<CreatorLocks>,
}

impl IngestPipeline {
    pub fn new(store: Arc<dyn DuplicateStore>, config: DedupConfig) -> Self {
        Self::with_locks(store, config, Arc::new(CreatorLocks::new()))
    }

    /// Share creator locks with other pipelines in the same process.
    pub fn with_locks(
        store: Arc<dyn DuplicateStore>,
        config: DedupConfig,
        locks: Arc<CreatorLocks>,
    ) -> Self {
        Self {
            resolver: DuplicateResolver::new(store, config),
            locks,
        }
    }

    pub fn resolver(&self) -> &DuplicateResolver {
        &self.resolver
    }

    /// Ingest raw items of one creator and platform.
    pub async fn run_batch(
        &self,
        creator_id: &str,
        platform: &str,
        raw_items: Vec<serde_json::Value>,
        source_url: Option<&str>,
    ) -> BatchSummary {
        let ids: Vec<String> = raw_items
            .iter()
            .enumerate()
            .map(|(i, item)| json_identifier(item).unwrap_or_else(|| format!("item[{i}]")))
            .collect();

        let mut summary = BatchSummary::default();
        let mut ready = Vec::new();
        let normalized = normalize_multiple(creator_id, platform, raw_items, source_url);
        for (item_id, result) in ids.into_iter().zip(normalized) {
            match result {
                Ok(content) => ready.push((item_id, content)),
                Err(e) => summary.fail(item_id, e),
            }
        }

        summary.merge(self.resolve_creator(creator_id, ready).await);
        self.locks.prune().await;
        info!(
            creator_id,
            platform,
            created = summary.created,
            updated = summary.updated,
            skipped = summary.skipped,
            duplicates = summary.duplicates,
            errors = summary.errors.len(),
            "Ingest batch complete"
        );
        summary
    }

    /// Ingest typed payloads that may span creators.
    pub async fn run_items(&self, items: Vec<(String, RawPayload)>) -> BatchSummary {
        let mut summary = BatchSummary::default();
        let mut by_creator: Vec<(String, Vec<(String, NormalizedContent)>)> = Vec::new();

        for (index, (creator_id, payload)) in items.into_iter().enumerate() {
            let item_id = payload
                .identifier()
                .unwrap_or_else(|| format!("item[{index}]"));
            match normalize(payload, &creator_id, None) {
                Ok(content) => match by_creator.iter_mut().find(|(c, _)| *c == creator_id) {
                    Some((_, queue)) => queue.push((item_id, content)),
                    None => by_creator.push((creator_id, vec![(item_id, content)])),
                },
                Err(e) => {
                    warn!(%creator_id, %item_id, error = %e, "Failed to normalize item");
                    summary.fail(item_id, e);
                }
            }
        }

        let creators = by_creator.len();
        let max_concurrent = self.resolver.config().max_concurrent_creators.max(1);
        let per_creator: Vec<BatchSummary> =
            stream::iter(by_creator.into_iter().map(|(creator_id, queue)| async move {
                self.resolve_creator(&creator_id, queue).await
            }))
            .buffer_unordered(max_concurrent)
            .collect()
            .await;

        for s in per_creator {
            summary.merge(s);
        }
        self.locks.prune().await;

        info!(
            creators,
            created = summary.created,
            updated = summary.updated,
            skipped = summary.skipped,
            duplicates = summary.duplicates,
            errors = summary.errors.len(),
            "Ingest run complete"
        );
        summary
    }

    async fn resolve_creator(
        &self,
        creator_id: &str,
        queue: Vec<(String, NormalizedContent)>,
    ) -> BatchSummary {
        let mut summary = BatchSummary::default();
        if queue.is_empty() {
            return summary;
        }

        let _guard = self.locks.acquire(creator_id).await;
        for (item_id, content) in queue {
            match self.resolver.ingest(&content).await {
                Ok(result) => summary.record(&result),
                Err(e) => {
                    warn!(creator_id, %item_id, error = %e, "Failed to ingest item");
                    summary.fail(item_id, e);
                }
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;
    use serde_json::json;

    fn pipeline(store: &Arc<MemoryStore>) -> IngestPipeline {
        IngestPipeline::new(store.clone(), DedupConfig::default())
    }

    #[tokio::test]
    async fn bad_items_are_reported_without_stopping_the_batch() {
        let store = Arc::new(MemoryStore::new());
        let p = pipeline(&store);

        let summary = p
            .run_batch(
                "c1",
                "twitter",
                vec![
                    json!({"id": "1", "text": "first tweet about the market"}),
                    json!({"text": "no id at all"}),
                    json!({"id": "3", "text": "third tweet about parking"}),
                    json!("not an object"),
                ],
                None,
            )
            .await;

        assert_eq!(summary.created, 2);
        assert_eq!(summary.errors.len(), 2);
        assert_eq!(summary.errors[0].item_id, "item[1]");
        assert_eq!(summary.errors[1].item_id, "item[3]");
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn unsupported_platform_fails_every_item() {
        let store = Arc::new(MemoryStore::new());
        let p = pipeline(&store);

        let summary = p
            .run_batch("c1", "carrier-pigeon", vec![json!({"id": "a"}), json!({})], None)
            .await;

        assert_eq!(summary.total(), 2);
        assert_eq!(summary.errors[0].item_id, "a");
        assert_eq!(summary.errors[1].item_id, "item[1]");
        assert!(summary.errors[0].message.contains("carrier-pigeon"));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn store_failures_become_item_errors() {
        let store = Arc::new(MemoryStore::new().failing("db down"));
        let p = pipeline(&store);

        let summary = p
            .run_batch("c1", "rss", vec![json!({"guid": "g1", "title": "Hi"})], None)
            .await;

        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].item_id, "g1");
        assert!(summary.errors[0].message.contains("db down"));
    }

    #[tokio::test]
    async fn rerunning_a_batch_skips_unchanged_items() {
        let store = Arc::new(MemoryStore::new());
        let p = pipeline(&store);
        let items = vec![
            json!({"guid": "g1", "title": "Post one"}),
            json!({"guid": "g2", "title": "Post two"}),
        ];

        let first = p.run_batch("c1", "rss", items.clone(), None).await;
        let second = p.run_batch("c1", "rss", items, None).await;

        assert_eq!(first.created, 2);
        assert_eq!(second.skipped, 2);
        assert_eq!(second.created + second.updated, 0);
    }

    #[tokio::test]
    async fn batches_release_their_creator_locks() {
        let store = Arc::new(MemoryStore::new());
        let locks = Arc::new(CreatorLocks::new());
        let p = IngestPipeline::with_locks(store.clone(), DedupConfig::default(), locks.clone());

        for creator in ["c1", "c2", "c3"] {
            p.run_batch(creator, "rss", vec![json!({"guid": "g1", "title": "Hi"})], None)
                .await;
        }

        assert_eq!(store.len(), 3);
        assert_eq!(locks.len().await, 0);
    }

    #[test]
    fn summary_display_lists_errors() {
        let mut s = BatchSummary::default();
        s.created = 3;
        s.fail("item[2]", "Unsupported platform: fax");
        let text = s.to_string();
        assert!(text.contains("Created:    3"));
        assert!(text.contains("item[2]: Unsupported platform: fax"));
    }
}
