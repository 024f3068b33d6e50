use feedline_common::{EngagementMetrics, MediaItem, MediaType, NormalizeError, Platform};

use super::{non_empty, parse_timestamp, ContentDraft, ThreadsPost};

/// Threads reports media kinds as TEXT_POST, IMAGE, VIDEO, CAROUSEL_ALBUM, AUDIO.
fn media_kind(raw: Option<&str>) -> MediaType {
    match raw.map(|s| s.to_uppercase()).as_deref() {
        Some("VIDEO") => MediaType::Video,
        Some("AUDIO") => MediaType::Audio,
        _ => MediaType::Image,
    }
}

pub(crate) fn normalize(post: ThreadsPost) -> Result<ContentDraft, NormalizeError> {
    let url = non_empty(post.permalink.as_deref());
    let platform_content_id = non_empty(post.id.as_deref())
        .or_else(|| url.clone())
        .ok_or_else(|| NormalizeError::invalid(Platform::Threads, "post has neither id nor permalink"))?;

    let is_text_post = post
        .media_type
        .as_deref()
        .is_some_and(|t| t.eq_ignore_ascii_case("TEXT_POST"));

    let media_urls = match non_empty(post.media_url.as_deref()) {
        Some(media_url) if !is_text_post => {
            vec![MediaItem::new(media_url, media_kind(post.media_type.as_deref()))]
        }
        _ => Vec::new(),
    };

    Ok(ContentDraft {
        platform_content_id,
        url,
        title: None,
        description: non_empty(post.caption.as_deref()).or_else(|| non_empty(post.text.as_deref())),
        author_name: non_empty(post.username.as_deref()),
        thumbnail_url: non_empty(post.thumbnail_url.as_deref()),
        media_urls,
        engagement_metrics: EngagementMetrics {
            views: post.views,
            likes: post.likes,
            comments: post.replies,
            shares: match (post.reposts, post.quotes) {
                (None, None) => None,
                (r, q) => Some(r.unwrap_or(0) + q.unwrap_or(0)),
            },
            bookmarks: None,
        },
        published_at: parse_timestamp(post.timestamp.as_deref()),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caption_preferred_over_text() {
        let draft = normalize(ThreadsPost {
            id: Some("t1".into()),
            caption: Some("caption wins".into()),
            text: Some("text loses".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(draft.description.as_deref(), Some("caption wins"));
    }

    #[test]
    fn text_posts_carry_no_media() {
        let draft = normalize(ThreadsPost {
            id: Some("t2".into()),
            media_type: Some("TEXT_POST".into()),
            media_url: Some("https://cdn.threads.net/ignored.jpg".into()),
            ..Default::default()
        })
        .unwrap();
        assert!(draft.media_urls.is_empty());
    }

    #[test]
    fn reposts_and_quotes_count_as_shares() {
        let draft = normalize(ThreadsPost {
            id: Some("t3".into()),
            reposts: Some(2),
            quotes: Some(1),
            media_type: Some("VIDEO".into()),
            media_url: Some("https://cdn.threads.net/v.mp4".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(draft.engagement_metrics.shares, Some(3));
        assert_eq!(draft.engagement_metrics.likes, None);
        assert_eq!(draft.media_urls[0].media_type, MediaType::Video);
    }
}
