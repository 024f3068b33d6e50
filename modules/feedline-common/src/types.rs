use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::NormalizeError;

// --- Platform ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Youtube,
    Twitter,
    Linkedin,
    Threads,
    Rss,
    Website,
}

impl Platform {
    pub const ALL: [Platform; 6] = [
        Platform::Youtube,
        Platform::Twitter,
        Platform::Linkedin,
        Platform::Threads,
        Platform::Rss,
        Platform::Website,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Youtube => "youtube",
            Platform::Twitter => "twitter",
            Platform::Linkedin => "linkedin",
            Platform::Threads => "threads",
            Platform::Rss => "rss",
            Platform::Website => "website",
        }
    }

    /// Short-form social platforms. Their captions get re-flowed and truncated
    /// when cross-posted, so identity is fuzzy and similarity matching applies.
    pub fn is_social(&self) -> bool {
        matches!(
            self,
            Platform::Twitter | Platform::Linkedin | Platform::Threads
        )
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Platform {
    type Err = NormalizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Platform::ALL
            .into_iter()
            .find(|p| p.as_str() == lower)
            .ok_or_else(|| NormalizeError::UnsupportedPlatform(s.to_string()))
    }
}

// --- Media ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Image,
    Video,
    Audio,
    Document,
}

impl MediaType {
    /// Map a raw MIME type or platform type hint ("photo", "animated_gif",
    /// "video/mp4", ...) onto the four canonical media kinds.
    /// Anything unrecognized is treated as a document.
    pub fn from_hint(hint: &str) -> Self {
        let lower = hint.trim().to_lowercase();
        if lower.starts_with("image/") || matches!(lower.as_str(), "image" | "photo" | "gif" | "thumbnail")
        {
            return MediaType::Image;
        }
        if lower.starts_with("video/")
            || matches!(lower.as_str(), "video" | "animated_gif" | "reel" | "clip")
        {
            return MediaType::Video;
        }
        if lower.starts_with("audio/") || matches!(lower.as_str(), "audio" | "podcast") {
            return MediaType::Audio;
        }
        MediaType::Document
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
            MediaType::Audio => "audio",
            MediaType::Document => "document",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    pub url: String,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl MediaItem {
    pub fn new(url: impl Into<String>, media_type: MediaType) -> Self {
        Self {
            url: url.into(),
            media_type,
            width: None,
            height: None,
            size: None,
        }
    }

    pub fn with_dimensions(mut self, width: Option<u32>, height: Option<u32>) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_size(mut self, size: Option<u64>) -> Self {
        self.size = size;
        self
    }
}

// --- Engagement ---

/// Named engagement counters. Platforms report different subsets; a counter
/// the platform did not report stays `None` rather than zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementMetrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub views: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub likes: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shares: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bookmarks: Option<i64>,
}

impl EngagementMetrics {
    pub fn is_empty(&self) -> bool {
        self.views.is_none()
            && self.likes.is_none()
            && self.comments.is_none()
            && self.shares.is_none()
            && self.bookmarks.is_none()
    }
}

// --- Canonical record ---

/// The platform-agnostic shape every ingested item is projected into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedContent {
    pub creator_id: String,
    pub platform: Platform,
    pub platform_content_id: String,
    pub url: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub content_body: Option<String>,
    pub author_name: Option<String>,
    pub thumbnail_url: Option<String>,
    pub media_urls: Vec<MediaItem>,
    pub engagement_metrics: EngagementMetrics,
    pub word_count: u32,
    pub reading_time_minutes: u32,
    pub published_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    Pending,
    Processed,
    Failed,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Pending => "pending",
            ProcessingStatus::Processed => "processed",
            ProcessingStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ProcessingStatus::Pending),
            "processed" => Some(ProcessingStatus::Processed),
            "failed" => Some(ProcessingStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A persisted content record: the canonical fields plus dedup state.
///
/// Invariant: within one non-null `duplicate_group_id`, exactly one record
/// has `is_primary == true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub id: Uuid,
    pub content: NormalizedContent,
    pub content_hash: Option<String>,
    pub duplicate_group_id: Option<Uuid>,
    pub is_primary: bool,
    pub processing_status: ProcessingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContentRecord {
    pub fn creator_id(&self) -> &str {
        &self.content.creator_id
    }

    pub fn platform(&self) -> Platform {
        self.content.platform
    }

    pub fn published_at(&self) -> DateTime<Utc> {
        self.content.published_at
    }
}
