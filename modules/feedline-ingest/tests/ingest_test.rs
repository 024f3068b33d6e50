//! End-to-end ingestion against the in-memory store.

use std::sync::Arc;

use serde_json::json;

use feedline_common::{DedupConfig, NormalizeError, Platform};
use feedline_ingest::normalizer::{LinkedInPost, RawPayload, Tweet};
use feedline_ingest::testing::{caption, MemoryStore};
use feedline_ingest::{normalize_json, DedupOutcome, IngestPipeline};

fn pipeline(store: &Arc<MemoryStore>) -> IngestPipeline {
    IngestPipeline::new(store.clone(), DedupConfig::default())
}

// =========================================================================
// Acceptance scenarios
// =========================================================================

#[tokio::test]
async fn same_titled_rss_posts_group_with_one_secondary() {
    let store = Arc::new(MemoryStore::new());
    let p = pipeline(&store);

    let summary = p
        .run_batch(
            "creator-1",
            "rss",
            vec![
                json!({
                    "guid": "post-a",
                    "link": "https://blog.example/a",
                    "title": "Hello World",
                    "pubDate": "Tue, 02 Jan 2024 10:00:00 +0000"
                }),
                json!({
                    "guid": "post-b",
                    "link": "https://blog.example/b",
                    "title": "Hello World",
                    "pubDate": "Mon, 01 Jan 2024 10:00:00 +0000"
                }),
            ],
            None,
        )
        .await;

    assert_eq!(summary.created, 2);
    assert_eq!(summary.duplicates, 1);
    assert!(summary.errors.is_empty());

    let records = store.records();
    let a = records.iter().find(|r| r.content.platform_content_id == "post-a").unwrap();
    let b = records.iter().find(|r| r.content.platform_content_id == "post-b").unwrap();
    assert_eq!(a.content_hash, b.content_hash);
    assert!(a.duplicate_group_id.is_some());
    assert_eq!(a.duplicate_group_id, b.duplicate_group_id);
    assert!(a.is_primary);
    assert!(!b.is_primary);
    store.assert_group_invariant();
}

#[tokio::test]
async fn newer_same_titled_rss_post_takes_over_primary() {
    let store = Arc::new(MemoryStore::new());
    let p = pipeline(&store);

    let summary = p
        .run_batch(
            "creator-1",
            "rss",
            vec![
                json!({
                    "guid": "post-a",
                    "link": "https://blog.example/a",
                    "title": "Hello World",
                    "pubDate": "Mon, 01 Jan 2024 10:00:00 +0000"
                }),
                json!({
                    "guid": "post-b",
                    "link": "https://blog.example/b",
                    "title": "Hello World",
                    "pubDate": "Tue, 02 Jan 2024 10:00:00 +0000"
                }),
            ],
            None,
        )
        .await;

    assert_eq!(summary.created, 2);
    assert_eq!(summary.duplicates, 1);

    let records = store.records();
    let a = records.iter().find(|r| r.content.platform_content_id == "post-a").unwrap();
    let b = records.iter().find(|r| r.content.platform_content_id == "post-b").unwrap();
    assert_eq!(a.duplicate_group_id, b.duplicate_group_id);
    assert!(b.is_primary);
    assert!(!a.is_primary, "older post is demoted");
    store.assert_group_invariant();
}

#[tokio::test]
async fn newer_rss_duplicate_resolves_as_duplicate_primary() {
    let store = Arc::new(MemoryStore::new());
    let p = pipeline(&store);
    let resolver = p.resolver();

    let older = normalize_json(
        "rss",
        json!({"guid": "post-a", "title": "Hello World", "pubDate": "Mon, 01 Jan 2024 10:00:00 +0000"}),
        "creator-1",
        None,
    )
    .unwrap();
    let newer = normalize_json(
        "rss",
        json!({"guid": "post-b", "title": "Hello World", "pubDate": "Tue, 02 Jan 2024 10:00:00 +0000"}),
        "creator-1",
        None,
    )
    .unwrap();

    let first = resolver.ingest(&older).await.unwrap();
    let second = resolver.ingest(&newer).await.unwrap();

    assert_eq!(first.outcome, DedupOutcome::NewPrimary);
    assert_eq!(second.outcome, DedupOutcome::DuplicatePrimary);
    assert!(!store.record(first.record.id).unwrap().is_primary);
    store.assert_group_invariant();
}

#[tokio::test]
async fn cross_posted_caption_elects_twitter_over_linkedin() {
    let store = Arc::new(MemoryStore::new());
    let p = pipeline(&store);
    let base = caption("harvest", 20);

    let linkedin = LinkedInPost {
        urn: Some("urn:li:activity:1".into()),
        commentary: Some(format!("{base} linkedinonly1 linkedinonly2")),
        ..Default::default()
    };
    let tweet = Tweet {
        id: Some("1800000000000000000".into()),
        full_text: Some(base.clone()),
        ..Default::default()
    };

    let summary = p
        .run_items(vec![
            ("creator-1".into(), RawPayload::Linkedin(linkedin)),
            ("creator-1".into(), RawPayload::Twitter(tweet)),
        ])
        .await;

    assert_eq!(summary.created, 2);
    assert_eq!(summary.duplicates, 1);

    let records = store.records();
    let li = records.iter().find(|r| r.platform() == Platform::Linkedin).unwrap();
    let tw = records.iter().find(|r| r.platform() == Platform::Twitter).unwrap();
    assert_ne!(li.content_hash, tw.content_hash, "matched by similarity, not hash");
    assert_eq!(li.duplicate_group_id, tw.duplicate_group_id);
    assert!(tw.is_primary);
    assert!(!li.is_primary);
    store.assert_group_invariant();
}

#[test]
fn rss_item_without_text_has_zero_reading_time() {
    let content = normalize_json(
        "rss",
        json!({"guid": "g-empty", "title": "Only a title"}),
        "creator-1",
        None,
    )
    .unwrap();

    assert_eq!(content.word_count, 0);
    assert_eq!(content.reading_time_minutes, 0);
}

#[test]
fn unknown_platform_is_rejected() {
    let err = normalize_json("carrier-pigeon", json!({"id": "1"}), "creator-1", None).unwrap_err();
    assert_eq!(err, NormalizeError::UnsupportedPlatform("carrier-pigeon".into()));
}

// =========================================================================
// Concurrency
// =========================================================================

#[tokio::test]
async fn creators_resolve_independently_and_in_order() {
    let store = Arc::new(MemoryStore::new());
    let p = pipeline(&store);

    let mut items = Vec::new();
    for creator in ["alice", "bob", "carol"] {
        let text = format!("{creator} announces the spring open studio weekend");
        for (i, platform) in ["threads", "linkedin", "twitter"].into_iter().enumerate() {
            let payload = match platform {
                "threads" => json!({"id": format!("{creator}-th-{i}"), "text": text}),
                "linkedin" => json!({"urn": format!("{creator}-li-{i}"), "commentary": text}),
                _ => json!({"id": format!("{creator}-tw-{i}"), "full_text": text}),
            };
            items.push((
                creator.to_string(),
                RawPayload::from_json(platform, payload).unwrap(),
            ));
        }
    }

    let summary = p.run_items(items).await;

    assert_eq!(summary.created, 9);
    assert_eq!(summary.duplicates, 6);
    assert!(summary.errors.is_empty());

    let records = store.records();
    for creator in ["alice", "bob", "carol"] {
        let own: Vec<_> = records.iter().filter(|r| r.creator_id() == creator).collect();
        assert_eq!(own.len(), 3);
        let group = own[0].duplicate_group_id;
        assert!(group.is_some());
        assert!(own.iter().all(|r| r.duplicate_group_id == group));
        let primary: Vec<_> = own.iter().filter(|r| r.is_primary).collect();
        assert_eq!(primary.len(), 1);
        assert_eq!(primary[0].platform(), Platform::Twitter);
    }
    store.assert_group_invariant();
}

#[tokio::test]
async fn concurrent_batches_for_one_creator_keep_one_primary() {
    let store = Arc::new(MemoryStore::new());
    let p = Arc::new(pipeline(&store));
    let text = "Shared caption that every platform receives at once";

    let tasks: Vec<_> = ["twitter", "linkedin", "threads"]
        .into_iter()
        .map(|platform| {
            let p = p.clone();
            let item = match platform {
                "linkedin" => json!({"urn": "li-1", "commentary": text}),
                _ => json!({"id": format!("{platform}-1"), "text": text}),
            };
            tokio::spawn(async move { p.run_batch("creator-1", platform, vec![item], None).await })
        })
        .collect();

    let mut created = 0;
    for t in tasks {
        created += t.await.unwrap().created;
    }

    assert_eq!(created, 3);
    let records = store.records();
    let group = records[0].duplicate_group_id;
    assert!(group.is_some());
    assert!(records.iter().all(|r| r.duplicate_group_id == group));
    store.assert_group_invariant();
}
