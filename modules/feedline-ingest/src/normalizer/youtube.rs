use feedline_common::{EngagementMetrics, MediaItem, MediaType, NormalizeError, Platform};

use super::{non_empty, parse_timestamp, ContentDraft, YoutubeVideo};
use crate::hash::extract_video_id;

pub(crate) fn normalize(video: YoutubeVideo) -> Result<ContentDraft, NormalizeError> {
    let url = non_empty(video.url.as_deref());
    let video_id = non_empty(video.video_id.as_deref())
        .or_else(|| url.as_deref().and_then(extract_video_id));

    let platform_content_id = video_id
        .clone()
        .or_else(|| url.clone())
        .ok_or_else(|| NormalizeError::invalid(Platform::Youtube, "video has neither id nor url"))?;

    let url = url.or_else(|| {
        video_id
            .as_ref()
            .map(|id| format!("https://www.youtube.com/watch?v={id}"))
    });

    let media_urls: Vec<MediaItem> = video
        .thumbnails
        .iter()
        .filter(|t| !t.url.trim().is_empty())
        .map(|t| MediaItem::new(&t.url, MediaType::Image).with_dimensions(t.width, t.height))
        .collect();

    // Largest thumbnail wins; thumbnails without a width sort last.
    let thumbnail_url = video
        .thumbnails
        .iter()
        .filter(|t| !t.url.trim().is_empty())
        .max_by_key(|t| t.width.unwrap_or(0))
        .map(|t| t.url.clone());

    Ok(ContentDraft {
        platform_content_id,
        url,
        title: non_empty(video.title.as_deref()),
        description: non_empty(video.description.as_deref()),
        content_body: None,
        author_name: non_empty(video.channel_title.as_deref()),
        thumbnail_url,
        media_urls,
        engagement_metrics: EngagementMetrics {
            views: video.view_count,
            likes: video.like_count,
            comments: video.comment_count,
            ..Default::default()
        },
        published_at: parse_timestamp(video.published_at.as_deref()),
        ..Default::default()
    })
}
