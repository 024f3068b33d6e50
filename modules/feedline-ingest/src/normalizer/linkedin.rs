use feedline_common::{EngagementMetrics, MediaItem, MediaType, NormalizeError, Platform};

use super::{non_empty, parse_timestamp, ContentDraft, LinkedInMedia, LinkedInPost};

fn media_item(media: &LinkedInMedia, default_kind: MediaType) -> MediaItem {
    let kind = media
        .mime_type
        .as_deref()
        .map(MediaType::from_hint)
        .unwrap_or(default_kind);
    MediaItem::new(&media.url, kind).with_dimensions(media.width, media.height)
}

pub(crate) fn normalize(post: LinkedInPost) -> Result<ContentDraft, NormalizeError> {
    let url = non_empty(post.url.as_deref());
    let platform_content_id = non_empty(post.urn.as_deref())
        .or_else(|| url.clone())
        .ok_or_else(|| NormalizeError::invalid(Platform::Linkedin, "post has neither urn nor url"))?;

    let mut media_urls: Vec<MediaItem> = post
        .images
        .iter()
        .map(|m| media_item(m, MediaType::Image))
        .collect();
    if let Some(video) = &post.video {
        media_urls.push(media_item(video, MediaType::Video));
    }
    if let Some(document) = &post.document {
        media_urls.push(media_item(document, MediaType::Document));
    }
    media_urls.retain(|m| !m.url.trim().is_empty());

    let article = post.article.as_ref();

    Ok(ContentDraft {
        platform_content_id,
        url,
        // Only a shared article gives a LinkedIn post a meaningful title.
        title: article.and_then(|a| non_empty(a.title.as_deref())),
        description: non_empty(post.commentary.as_deref()).or_else(|| non_empty(post.text.as_deref())),
        content_body: article.and_then(|a| non_empty(a.description.as_deref())),
        author_name: post.author.as_ref().and_then(|a| {
            non_empty(a.name.as_deref()).or_else(|| non_empty(a.public_identifier.as_deref()))
        }),
        thumbnail_url: post.images.first().map(|m| m.url.clone()),
        media_urls,
        engagement_metrics: EngagementMetrics {
            views: post.num_impressions,
            likes: post.num_likes,
            comments: post.num_comments,
            shares: post.num_shares,
            bookmarks: None,
        },
        published_at: parse_timestamp(post.posted_at.as_deref()),
        ..Default::default()
    })
}
