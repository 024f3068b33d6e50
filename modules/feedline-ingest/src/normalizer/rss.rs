use feedline_common::{EngagementMetrics, MediaItem, MediaType, NormalizeError, Platform};

use super::{absolute_url, non_empty, parse_timestamp, ContentDraft, RssItem};

pub(crate) fn normalize(
    item: RssItem,
    source_url: Option<&str>,
) -> Result<ContentDraft, NormalizeError> {
    let guid = non_empty(item.guid.as_deref());
    let link = non_empty(item.link.as_deref())
        .map(|l| absolute_url(&l, source_url))
        .or_else(|| guid.clone().filter(|g| g.starts_with("http")));

    let platform_content_id = guid
        .or_else(|| link.clone())
        .ok_or_else(|| NormalizeError::invalid(Platform::Rss, "item has neither guid nor link"))?;

    let media_urls: Vec<MediaItem> = item
        .enclosures
        .iter()
        .filter(|e| !e.url.trim().is_empty())
        .map(|e| {
            let kind = e
                .mime_type
                .as_deref()
                .map(MediaType::from_hint)
                .unwrap_or(MediaType::Document);
            MediaItem::new(absolute_url(&e.url, source_url), kind)
                .with_dimensions(e.width, e.height)
                .with_size(e.length)
        })
        .collect();

    let thumbnail_url = media_urls
        .iter()
        .find(|m| m.media_type == MediaType::Image)
        .map(|m| m.url.clone());

    Ok(ContentDraft {
        platform_content_id,
        url: link,
        title: non_empty(item.title.as_deref()),
        description: non_empty(item.description.as_deref()),
        content_body: non_empty(item.content.as_deref()),
        author_name: non_empty(item.author.as_deref()),
        thumbnail_url,
        media_urls,
        engagement_metrics: EngagementMetrics::default(),
        published_at: parse_timestamp(item.pub_date.as_deref()),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::RssEnclosure;

    #[test]
    fn guid_is_preferred_id() {
        let draft = normalize(
            RssItem {
                guid: Some("post-17".into()),
                link: Some("https://blog.example.com/17".into()),
                ..Default::default()
            },
            None,
        )
        .unwrap();
        assert_eq!(draft.platform_content_id, "post-17");
        assert_eq!(draft.url.as_deref(), Some("https://blog.example.com/17"));
    }

    #[test]
    fn link_is_fallback_id() {
        let draft = normalize(
            RssItem {
                link: Some("/17".into()),
                ..Default::default()
            },
            Some("https://blog.example.com/feed.xml"),
        )
        .unwrap();
        assert_eq!(draft.platform_content_id, "https://blog.example.com/17");
    }

    #[test]
    fn item_without_guid_or_link_fails() {
        let err = normalize(
            RssItem {
                title: Some("orphan".into()),
                ..Default::default()
            },
            None,
        )
        .unwrap_err();
        assert!(matches!(err, NormalizeError::Normalization { .. }));
    }

    #[test]
    fn enclosures_map_mime_types() {
        let draft = normalize(
            RssItem {
                guid: Some("ep-1".into()),
                enclosures: vec![
                    RssEnclosure {
                        url: "https://cdn.example.com/ep1.mp3".into(),
                        mime_type: Some("audio/mpeg".into()),
                        length: Some(1_234_567),
                        ..Default::default()
                    },
                    RssEnclosure {
                        url: "https://cdn.example.com/cover.png".into(),
                        mime_type: Some("image/png".into()),
                        ..Default::default()
                    },
                ],
                ..Default::default()
            },
            None,
        )
        .unwrap();
        assert_eq!(draft.media_urls[0].media_type, MediaType::Audio);
        assert_eq!(draft.media_urls[0].size, Some(1_234_567));
        assert_eq!(
            draft.thumbnail_url.as_deref(),
            Some("https://cdn.example.com/cover.png")
        );
    }
}
