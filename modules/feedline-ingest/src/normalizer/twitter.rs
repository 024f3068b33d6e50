use feedline_common::{EngagementMetrics, MediaItem, MediaType, NormalizeError, Platform};

use super::{non_empty, parse_timestamp, ContentDraft, Tweet};

pub(crate) fn normalize(tweet: Tweet) -> Result<ContentDraft, NormalizeError> {
    let id = non_empty(tweet.id.as_deref());
    let handle = tweet
        .author
        .as_ref()
        .and_then(|a| non_empty(a.user_name.as_deref()));

    let url = non_empty(tweet.url.as_deref()).or_else(|| {
        let id = id.as_ref()?;
        let handle = handle.as_deref().unwrap_or("i/web");
        Some(format!("https://x.com/{handle}/status/{id}"))
    });

    let platform_content_id = id
        .or_else(|| url.clone())
        .ok_or_else(|| NormalizeError::invalid(Platform::Twitter, "tweet has neither id nor url"))?;

    let media_urls = tweet
        .media
        .iter()
        .filter(|m| !m.url.trim().is_empty())
        .map(|m| {
            let kind = m
                .media_type
                .as_deref()
                .map(MediaType::from_hint)
                .unwrap_or(MediaType::Image);
            MediaItem::new(&m.url, kind).with_dimensions(m.width, m.height)
        })
        .collect();

    Ok(ContentDraft {
        platform_content_id,
        url,
        // Tweets have no title; the caption is the content.
        title: None,
        description: non_empty(tweet.content()),
        author_name: tweet
            .author
            .as_ref()
            .and_then(|a| non_empty(a.name.as_deref()))
            .or(handle),
        media_urls,
        engagement_metrics: EngagementMetrics {
            views: tweet.view_count,
            likes: tweet.like_count,
            comments: tweet.reply_count,
            shares: tweet.retweet_count,
            bookmarks: tweet.bookmark_count,
        },
        published_at: parse_timestamp(tweet.created_at.as_deref()),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::{TweetAuthor, TweetMedia};

    #[test]
    fn prefers_full_text_over_text() {
        let draft = normalize(Tweet {
            id: Some("1".into()),
            text: Some("truncated…".into()),
            full_text: Some("the whole thing".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(draft.description.as_deref(), Some("the whole thing"));
        assert_eq!(draft.title, None);
    }

    #[test]
    fn builds_status_url_from_handle() {
        let draft = normalize(Tweet {
            id: Some("123".into()),
            text: Some("hi".into()),
            author: Some(TweetAuthor {
                user_name: Some("someone".into()),
                name: Some("Some One".into()),
            }),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            draft.url.as_deref(),
            Some("https://x.com/someone/status/123")
        );
        assert_eq!(draft.author_name.as_deref(), Some("Some One"));
    }

    #[test]
    fn absent_counters_stay_absent() {
        let draft = normalize(Tweet {
            id: Some("1".into()),
            like_count: Some(5),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(draft.engagement_metrics.likes, Some(5));
        assert_eq!(draft.engagement_metrics.shares, None);
        assert_eq!(draft.engagement_metrics.views, None);
    }

    #[test]
    fn media_types_follow_hints() {
        let draft = normalize(Tweet {
            id: Some("1".into()),
            media: vec![
                TweetMedia {
                    url: "https://pbs.twimg.com/a.jpg".into(),
                    media_type: Some("photo".into()),
                    ..Default::default()
                },
                TweetMedia {
                    url: "https://video.twimg.com/b.mp4".into(),
                    media_type: Some("video".into()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        })
        .unwrap();
        let kinds: Vec<_> = draft.media_urls.iter().map(|m| m.media_type).collect();
        assert_eq!(kinds, vec![MediaType::Image, MediaType::Video]);
    }
}
