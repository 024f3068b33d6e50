// Raw platform payloads as the fetchers hand them over.
// Field names follow each platform's (or scraper actor's) JSON.

use serde::{Deserialize, Serialize};

// --- YouTube ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct YoutubeThumbnail {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// A single video from the YouTube Data API (flattened `snippet` + `statistics`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct YoutubeVideo {
    #[serde(rename = "videoId", alias = "id")]
    pub video_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    #[serde(rename = "channelTitle")]
    pub channel_title: Option<String>,
    #[serde(rename = "publishedAt")]
    pub published_at: Option<String>,
    #[serde(default)]
    pub thumbnails: Vec<YoutubeThumbnail>,
    #[serde(rename = "viewCount")]
    pub view_count: Option<i64>,
    #[serde(rename = "likeCount")]
    pub like_count: Option<i64>,
    #[serde(rename = "commentCount")]
    pub comment_count: Option<i64>,
}

// --- Twitter / X ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TweetAuthor {
    #[serde(rename = "userName")]
    pub user_name: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TweetMedia {
    #[serde(alias = "media_url_https")]
    pub url: String,
    #[serde(rename = "type")]
    pub media_type: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// A single tweet as returned by the tweet-scraper actor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tweet {
    pub id: Option<String>,
    pub text: Option<String>,
    pub full_text: Option<String>,
    pub url: Option<String>,
    #[serde(alias = "createdAt")]
    pub created_at: Option<String>,
    pub author: Option<TweetAuthor>,
    #[serde(default)]
    pub media: Vec<TweetMedia>,
    #[serde(rename = "likeCount")]
    pub like_count: Option<i64>,
    #[serde(rename = "retweetCount")]
    pub retweet_count: Option<i64>,
    #[serde(rename = "replyCount")]
    pub reply_count: Option<i64>,
    #[serde(rename = "viewCount")]
    pub view_count: Option<i64>,
    #[serde(rename = "bookmarkCount")]
    pub bookmark_count: Option<i64>,
}

impl Tweet {
    /// Returns whichever text field is populated, preferring `full_text`.
    pub fn content(&self) -> Option<&str> {
        self.full_text.as_deref().or(self.text.as_deref())
    }
}

// --- LinkedIn ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkedInAuthor {
    pub name: Option<String>,
    #[serde(rename = "publicIdentifier")]
    pub public_identifier: Option<String>,
}

/// A link shared inside a LinkedIn post.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkedInArticle {
    pub title: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkedInMedia {
    pub url: String,
    #[serde(rename = "mimeType")]
    pub mime_type: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkedInPost {
    #[serde(alias = "id")]
    pub urn: Option<String>,
    pub commentary: Option<String>,
    pub text: Option<String>,
    pub url: Option<String>,
    #[serde(rename = "postedAt")]
    pub posted_at: Option<String>,
    pub author: Option<LinkedInAuthor>,
    pub article: Option<LinkedInArticle>,
    #[serde(default)]
    pub images: Vec<LinkedInMedia>,
    pub video: Option<LinkedInMedia>,
    pub document: Option<LinkedInMedia>,
    #[serde(rename = "numLikes")]
    pub num_likes: Option<i64>,
    #[serde(rename = "numComments")]
    pub num_comments: Option<i64>,
    #[serde(rename = "numShares")]
    pub num_shares: Option<i64>,
    #[serde(rename = "numImpressions")]
    pub num_impressions: Option<i64>,
}

// --- Threads ---

/// A Threads media object from the Threads Graph API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreadsPost {
    pub id: Option<String>,
    pub caption: Option<String>,
    pub text: Option<String>,
    pub permalink: Option<String>,
    pub timestamp: Option<String>,
    pub username: Option<String>,
    /// TEXT_POST, IMAGE, VIDEO, CAROUSEL_ALBUM, AUDIO, REPOST_FACADE
    pub media_type: Option<String>,
    pub media_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub views: Option<i64>,
    pub likes: Option<i64>,
    pub replies: Option<i64>,
    pub reposts: Option<i64>,
    pub quotes: Option<i64>,
}

// --- RSS / Atom ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RssEnclosure {
    pub url: String,
    #[serde(rename = "type")]
    pub mime_type: Option<String>,
    pub length: Option<u64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// One feed entry. `parse_feed` produces these from RSS/Atom/JSON feeds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RssItem {
    pub guid: Option<String>,
    pub link: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    #[serde(rename = "pubDate", alias = "published")]
    pub pub_date: Option<String>,
    #[serde(default)]
    pub enclosures: Vec<RssEnclosure>,
}

// --- Generic website ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebImage {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// A crawled article page. Crawlers that already counted words can say so.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebPage {
    pub url: Option<String>,
    #[serde(rename = "canonicalUrl")]
    pub canonical_url: Option<String>,
    pub title: Option<String>,
    /// `<meta name="description">` or og:description.
    pub description: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    #[serde(rename = "publishedAt")]
    pub published_at: Option<String>,
    #[serde(default)]
    pub images: Vec<WebImage>,
    #[serde(rename = "wordCount")]
    pub word_count: Option<u32>,
    #[serde(rename = "readingTimeMinutes")]
    pub reading_time_minutes: Option<u32>,
}
