// RSS/Atom/JSON feed parsing into `RssItem` payloads.

use anyhow::{Context, Result};
use tracing::info;

use super::{RssEnclosure, RssItem};

/// Parse a feed document into one `RssItem` per entry, in document order.
pub fn parse_feed(bytes: &[u8]) -> Result<Vec<RssItem>> {
    let feed = feed_rs::parser::parse(bytes).context("Failed to parse RSS/Atom feed")?;

    let items: Vec<RssItem> = feed
        .entries
        .into_iter()
        .map(|entry| {
            let link = entry
                .links
                .first()
                .map(|l| l.href.clone())
                .or_else(|| entry.id.starts_with("http").then(|| entry.id.clone()));

            let enclosures = entry
                .media
                .iter()
                .flat_map(|m| m.content.iter())
                .filter_map(|c| {
                    Some(RssEnclosure {
                        url: c.url.as_ref()?.to_string(),
                        mime_type: c.content_type.as_ref().map(|m| m.to_string()),
                        length: c.size,
                        width: c.width,
                        height: c.height,
                    })
                })
                .collect();

            RssItem {
                guid: (!entry.id.trim().is_empty()).then(|| entry.id.clone()),
                link,
                title: entry.title.map(|t| t.content),
                description: entry.summary.map(|t| t.content),
                content: entry.content.and_then(|c| c.body),
                author: entry.authors.first().map(|a| a.name.clone()),
                pub_date: entry.published.or(entry.updated).map(|dt| dt.to_rfc3339()),
                enclosures,
            }
        })
        .collect();

    let title = feed.title.map(|t| t.content).unwrap_or_default();
    info!(feed_title = %title, items = items.len(), "feed: parsed successfully");
    Ok(items)
}
