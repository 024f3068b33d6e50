//! Content normalizer: projects raw platform payloads into `NormalizedContent`.
//!
//! Each platform has one adapter producing a `ContentDraft`; the draft is then
//! finished uniformly (word count, reading time, default timestamp).

mod feed;
mod linkedin;
pub mod payloads;
mod rss;
mod threads;
mod twitter;
mod website;
mod youtube;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use feedline_common::text;
use feedline_common::{EngagementMetrics, MediaItem, NormalizeError, NormalizedContent, Platform};

pub use feed::parse_feed;
pub use payloads::*;

/// A raw item tagged with the platform it came from.
#[derive(Debug, Clone, PartialEq)]
pub enum RawPayload {
    Youtube(YoutubeVideo),
    Twitter(Tweet),
    Linkedin(LinkedInPost),
    Threads(ThreadsPost),
    Rss(RssItem),
    Website(WebPage),
}

impl RawPayload {
    pub fn platform(&self) -> Platform {
        match self {
            RawPayload::Youtube(_) => Platform::Youtube,
            RawPayload::Twitter(_) => Platform::Twitter,
            RawPayload::Linkedin(_) => Platform::Linkedin,
            RawPayload::Threads(_) => Platform::Threads,
            RawPayload::Rss(_) => Platform::Rss,
            RawPayload::Website(_) => Platform::Website,
        }
    }

    /// Parse an untyped payload for a platform named by string.
    pub fn from_json(platform: &str, value: serde_json::Value) -> Result<Self, NormalizeError> {
        let platform: Platform = platform.parse()?;
        Self::from_json_for(platform, value)
    }

    pub fn from_json_for(
        platform: Platform,
        value: serde_json::Value,
    ) -> Result<Self, NormalizeError> {
        let invalid = |e: serde_json::Error| NormalizeError::invalid(platform, e.to_string());
        Ok(match platform {
            Platform::Youtube => RawPayload::Youtube(serde_json::from_value(value).map_err(invalid)?),
            Platform::Twitter => RawPayload::Twitter(serde_json::from_value(value).map_err(invalid)?),
            Platform::Linkedin => {
                RawPayload::Linkedin(serde_json::from_value(value).map_err(invalid)?)
            }
            Platform::Threads => RawPayload::Threads(serde_json::from_value(value).map_err(invalid)?),
            Platform::Rss => RawPayload::Rss(serde_json::from_value(value).map_err(invalid)?),
            Platform::Website => RawPayload::Website(serde_json::from_value(value).map_err(invalid)?),
        })
    }

    /// Best-effort identifier for error reporting, before normalization.
    pub fn identifier(&self) -> Option<String> {
        match self {
            RawPayload::Youtube(v) => v.video_id.clone().or_else(|| v.url.clone()),
            RawPayload::Twitter(t) => t.id.clone().or_else(|| t.url.clone()),
            RawPayload::Linkedin(p) => p.urn.clone().or_else(|| p.url.clone()),
            RawPayload::Threads(p) => p.id.clone().or_else(|| p.permalink.clone()),
            RawPayload::Rss(i) => i.guid.clone().or_else(|| i.link.clone()),
            RawPayload::Website(w) => w.canonical_url.clone().or_else(|| w.url.clone()),
        }
    }
}

/// Best-effort identifier of an untyped payload, for error reporting.
pub fn json_identifier(value: &serde_json::Value) -> Option<String> {
    ["id", "videoId", "urn", "guid", "permalink", "url", "link"]
        .iter()
        .find_map(|key| match value.get(*key)? {
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}

/// What an adapter extracts before the shared finishing step.
#[derive(Debug, Default)]
pub(crate) struct ContentDraft {
    pub platform_content_id: String,
    pub url: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub content_body: Option<String>,
    pub author_name: Option<String>,
    pub thumbnail_url: Option<String>,
    pub media_urls: Vec<MediaItem>,
    pub engagement_metrics: EngagementMetrics,
    pub word_count: Option<u32>,
    pub reading_time_minutes: Option<u32>,
    pub published_at: Option<DateTime<Utc>>,
}

impl ContentDraft {
    fn finish(self, creator_id: &str, platform: Platform) -> NormalizedContent {
        let word_count = self.word_count.unwrap_or_else(|| {
            self.content_body
                .as_deref()
                .or(self.description.as_deref())
                .map(text::word_count)
                .unwrap_or(0)
        });
        let reading_time_minutes = self
            .reading_time_minutes
            .unwrap_or_else(|| text::reading_time_minutes(word_count));

        NormalizedContent {
            creator_id: creator_id.to_string(),
            platform,
            platform_content_id: self.platform_content_id,
            url: self.url,
            title: self.title,
            description: self.description,
            content_body: self.content_body,
            author_name: self.author_name,
            thumbnail_url: self.thumbnail_url,
            media_urls: self.media_urls,
            engagement_metrics: self.engagement_metrics,
            word_count,
            reading_time_minutes,
            published_at: self.published_at.unwrap_or_else(Utc::now),
        }
    }
}

/// Normalize a single typed payload.
pub fn normalize(
    payload: RawPayload,
    creator_id: &str,
    source_url: Option<&str>,
) -> Result<NormalizedContent, NormalizeError> {
    let platform = payload.platform();
    let draft = match payload {
        RawPayload::Youtube(v) => youtube::normalize(v)?,
        RawPayload::Twitter(t) => twitter::normalize(t)?,
        RawPayload::Linkedin(p) => linkedin::normalize(p)?,
        RawPayload::Threads(p) => threads::normalize(p)?,
        RawPayload::Rss(i) => rss::normalize(i, source_url)?,
        RawPayload::Website(w) => website::normalize(w, source_url)?,
    };
    let content = draft.finish(creator_id, platform);
    debug!(
        creator_id,
        platform = %platform,
        platform_content_id = %content.platform_content_id,
        word_count = content.word_count,
        "normalizer: item normalized"
    );
    Ok(content)
}

/// Normalize an untyped payload for a platform named by string.
pub fn normalize_json(
    platform: &str,
    value: serde_json::Value,
    creator_id: &str,
    source_url: Option<&str>,
) -> Result<NormalizedContent, NormalizeError> {
    normalize(RawPayload::from_json(platform, value)?, creator_id, source_url)
}

/// Normalize a batch of untyped payloads from one creator and platform.
///
/// Output order matches input order and every input yields exactly one result;
/// a failing item never stops the rest.
pub fn normalize_multiple(
    creator_id: &str,
    platform: &str,
    raw_items: Vec<serde_json::Value>,
    source_url: Option<&str>,
) -> Vec<Result<NormalizedContent, NormalizeError>> {
    let parsed: Result<Platform, NormalizeError> = platform.parse();
    let results: Vec<_> = raw_items
        .into_iter()
        .map(|value| {
            let platform = parsed.clone()?;
            let payload = RawPayload::from_json_for(platform, value)?;
            normalize(payload, creator_id, source_url)
        })
        .collect();

    let failed = results.iter().filter(|r| r.is_err()).count();
    if failed > 0 {
        warn!(creator_id, platform, failed, total = results.len(), "normalizer: batch had failures");
    }
    results
}

// --- helpers shared by adapters ---

/// Trimmed, non-empty copy of an optional string.
pub(crate) fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Parse the timestamp formats platforms actually emit: RFC 3339, RFC 2822
/// (RSS), Twitter's `Wed Oct 10 20:19:24 +0000 2018`, and unix seconds.
pub(crate) fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%a %b %d %H:%M:%S %z %Y") {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(secs) = raw.parse::<i64>() {
        return DateTime::from_timestamp(secs, 0);
    }
    warn!(raw, "normalizer: unparseable timestamp, defaulting to now");
    None
}

/// Resolve a possibly-relative link against the source URL.
pub(crate) fn absolute_url(link: &str, source_url: Option<&str>) -> String {
    if url::Url::parse(link).is_ok() {
        return link.to_string();
    }
    source_url
        .and_then(|base| url::Url::parse(base).ok())
        .and_then(|base| base.join(link).ok())
        .map(|u| u.to_string())
        .unwrap_or_else(|| link.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_platform_is_unsupported() {
        let err = normalize_json("carrier-pigeon", json!({"id": "1"}), "creator-1", None)
            .unwrap_err();
        assert_eq!(err, NormalizeError::UnsupportedPlatform("carrier-pigeon".into()));
    }

    #[test]
    fn malformed_payload_is_a_normalization_error() {
        let err = normalize_json("twitter", json!({"id": 42, "media": "nope"}), "c", None)
            .unwrap_err();
        assert!(matches!(err, NormalizeError::Normalization { .. }), "{err:?}");
    }

    #[test]
    fn batch_preserves_order_and_keeps_going_after_failures() {
        let items = vec![
            json!({"id": "1", "full_text": "first post"}),
            json!({"full_text": "no id and no url"}),
            json!({"id": "3", "full_text": "third post"}),
        ];
        let results = normalize_multiple("creator-1", "twitter", items, None);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().platform_content_id, "1");
        assert!(results[1].is_err());
        assert_eq!(results[2].as_ref().unwrap().platform_content_id, "3");
    }

    #[test]
    fn batch_with_unknown_platform_fails_every_item() {
        let items = vec![json!({"id": "1"}), json!({"id": "2"})];
        let results = normalize_multiple("creator-1", "myspace", items, None);
        assert_eq!(results.len(), 2);
        assert!(results
            .iter()
            .all(|r| matches!(r, Err(NormalizeError::UnsupportedPlatform(_)))));
    }

    #[test]
    fn normalizing_twice_is_identical() {
        let payload = RawPayload::Twitter(Tweet {
            id: Some("99".into()),
            full_text: Some("Launching our new community garden today".into()),
            created_at: Some("2024-05-01T12:00:00Z".into()),
            like_count: Some(10),
            ..Default::default()
        });
        let a = normalize(payload.clone(), "creator-1", None).unwrap();
        let b = normalize(payload, "creator-1", None).unwrap();
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn missing_timestamp_defaults_to_now() {
        let before = Utc::now();
        let content = normalize(
            RawPayload::Twitter(Tweet {
                id: Some("1".into()),
                text: Some("hello".into()),
                ..Default::default()
            }),
            "c",
            None,
        )
        .unwrap();
        assert!(content.published_at >= before);
    }

    #[test]
    fn parses_platform_timestamp_formats() {
        let expected = DateTime::parse_from_rfc3339("2018-10-10T20:19:24Z")
            .unwrap()
            .with_timezone(&Utc);
        for raw in [
            "2018-10-10T20:19:24Z",
            "Wed, 10 Oct 2018 20:19:24 +0000",
            "Wed Oct 10 20:19:24 +0000 2018",
            "1539202764",
        ] {
            assert_eq!(parse_timestamp(Some(raw)), Some(expected), "{raw}");
        }
        assert_eq!(parse_timestamp(Some("last tuesday")), None);
        assert_eq!(parse_timestamp(None), None);
    }

    #[test]
    fn relative_links_resolve_against_source() {
        assert_eq!(
            absolute_url("/posts/1", Some("https://blog.example.com/feed.xml")),
            "https://blog.example.com/posts/1"
        );
        assert_eq!(
            absolute_url("https://other.example.com/a", Some("https://blog.example.com")),
            "https://other.example.com/a"
        );
        assert_eq!(absolute_url("/posts/1", None), "/posts/1");
    }

    #[test]
    fn json_identifier_prefers_native_ids() {
        assert_eq!(
            json_identifier(&serde_json::json!({"id": "abc", "url": "https://x"})),
            Some("abc".into())
        );
        assert_eq!(
            json_identifier(&serde_json::json!({"link": "https://x/1"})),
            Some("https://x/1".into())
        );
        assert_eq!(json_identifier(&serde_json::json!({})), None);
    }
}
