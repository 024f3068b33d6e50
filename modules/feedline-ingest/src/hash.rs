//! Content identity hashing.
//!
//! Social posts hash a fuzzy fingerprint of their caption so that re-flowed or
//! truncated cross-posts converge. Everything else hashes the full normalized
//! text plus an exact secondary key (YouTube video id, or the URL's domain).

use std::sync::LazyLock;

use regex::Regex;
use sha2::{Digest, Sha256};

use feedline_common::text::{self, FINGERPRINT_TOKENS};
use feedline_common::{NormalizedContent, Platform};

static VIDEO_ID_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?:youtube\.com|youtube-nocookie\.com)/watch\?(?:.*&)?v=([A-Za-z0-9_-]{11})",
        r"youtu\.be/([A-Za-z0-9_-]{11})",
        r"(?:youtube\.com|youtube-nocookie\.com)/(?:embed|shorts|live|v)/([A-Za-z0-9_-]{11})",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

/// The text a record is identified by: the caption for social posts,
/// the title for everything else.
pub fn best_text(content: &NormalizedContent) -> &str {
    let fields = if content.platform.is_social() {
        [&content.description, &content.content_body, &content.title]
    } else {
        [&content.title, &content.description, &content.content_body]
    };
    fields
        .into_iter()
        .filter_map(|f| f.as_deref())
        .find(|s| !s.trim().is_empty())
        .unwrap_or("")
}

/// Extract an 11-character YouTube video id from any of the usual URL shapes.
pub fn extract_video_id(url: &str) -> Option<String> {
    VIDEO_ID_PATTERNS
        .iter()
        .find_map(|re| re.captures(url))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Host of a parseable URL, lowercased, without a leading `www.`.
pub fn domain_of(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    Some(host.strip_prefix("www.").unwrap_or(&host).to_string())
}

fn sha256_hex(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

/// Identity hash with the default fingerprint length.
pub fn generate_content_hash(content: &NormalizedContent) -> String {
    generate_content_hash_with(content, FINGERPRINT_TOKENS)
}

pub fn generate_content_hash_with(content: &NormalizedContent, fingerprint_tokens: usize) -> String {
    let best = best_text(content);
    let url = content.url.as_deref();

    let key = match content.platform {
        Platform::Twitter | Platform::Linkedin | Platform::Threads => {
            format!(
                "{}:{}",
                content.creator_id,
                text::fingerprint(best, fingerprint_tokens)
            )
        }
        Platform::Youtube => {
            let mut key = format!("{}:{}", content.creator_id, text::normalize(best));
            if let Some(id) = url.and_then(extract_video_id) {
                key.push(':');
                key.push_str(&id);
            }
            key
        }
        Platform::Rss | Platform::Website => {
            let mut key = format!("{}:{}", content.creator_id, text::normalize(best));
            if let Some(domain) = url.and_then(domain_of) {
                key.push(':');
                key.push_str(&domain);
            }
            key
        }
    };

    sha256_hex(&key)
}
