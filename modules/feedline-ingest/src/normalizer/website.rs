use feedline_common::{EngagementMetrics, MediaItem, MediaType, NormalizeError, Platform};

use super::{absolute_url, non_empty, parse_timestamp, ContentDraft, WebPage};

pub(crate) fn normalize(
    page: WebPage,
    source_url: Option<&str>,
) -> Result<ContentDraft, NormalizeError> {
    let url = non_empty(page.canonical_url.as_deref())
        .or_else(|| non_empty(page.url.as_deref()))
        .map(|u| absolute_url(&u, source_url))
        .or_else(|| non_empty(source_url));

    let platform_content_id = url
        .clone()
        .ok_or_else(|| NormalizeError::invalid(Platform::Website, "page has no url"))?;

    let media_urls: Vec<MediaItem> = page
        .images
        .iter()
        .filter(|i| !i.url.trim().is_empty())
        .map(|i| {
            MediaItem::new(absolute_url(&i.url, url.as_deref()), MediaType::Image)
                .with_dimensions(i.width, i.height)
        })
        .collect();

    Ok(ContentDraft {
        platform_content_id,
        url,
        title: non_empty(page.title.as_deref()),
        description: non_empty(page.description.as_deref()),
        content_body: non_empty(page.content.as_deref()),
        author_name: non_empty(page.author.as_deref()),
        thumbnail_url: media_urls.first().map(|m| m.url.clone()),
        media_urls,
        engagement_metrics: EngagementMetrics::default(),
        word_count: page.word_count,
        reading_time_minutes: page.reading_time_minutes,
        published_at: parse_timestamp(page.published_at.as_deref()),
    })
}
