//! Text utilities for fuzzy content identity.
//!
//! Pure functions: normalization, significant-token extraction, Jaccard
//! similarity, leading-token fingerprints and reading-time estimates.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// Default number of significant tokens kept in a fingerprint.
pub const FINGERPRINT_TOKENS: usize = 100;

/// Reading speed used for `reading_time_minutes`.
pub const WORDS_PER_MINUTE: u32 = 200;

static NON_WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\W+").expect("valid regex"));
static SCRIPT_STYLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)>").expect("valid regex")
});
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

/// Lowercase, replace non-word characters with spaces, collapse whitespace, trim.
pub fn normalize(text: &str) -> String {
    let lower = text.to_lowercase();
    let spaced = NON_WORD_RE.replace_all(&lower, " ");
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Tokens of the normalized text longer than two characters.
pub fn significant_tokens(text: &str) -> Vec<String> {
    normalize(text)
        .split(' ')
        .filter(|t| t.chars().count() > 2)
        .map(str::to_string)
        .collect()
}

/// Token-set Jaccard similarity over significant tokens.
///
/// Two texts with no significant tokens score 0.0, never NaN.
pub fn jaccard(a: &str, b: &str) -> f64 {
    let set_a: HashSet<String> = significant_tokens(a).into_iter().collect();
    let set_b: HashSet<String> = significant_tokens(b).into_iter().collect();

    let union = set_a.union(&set_b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = set_a.intersection(&set_b).count();
    intersection as f64 / union as f64
}

/// The first `max_tokens` significant tokens, in order, joined by single spaces.
pub fn fingerprint(text: &str, max_tokens: usize) -> String {
    significant_tokens(text)
        .into_iter()
        .take(max_tokens)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Remove HTML markup and decode the handful of entities feeds commonly carry.
pub fn strip_markup(text: &str) -> String {
    let without_blocks = SCRIPT_STYLE_RE.replace_all(text, " ");
    let without_tags = TAG_RE.replace_all(&without_blocks, " ");
    let decoded = without_tags
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whitespace-delimited tokens after markup is stripped.
pub fn word_count(text: &str) -> u32 {
    strip_markup(text).split_whitespace().count() as u32
}

pub fn reading_time_minutes(words: u32) -> u32 {
    words.div_ceil(WORDS_PER_MINUTE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_lowercases_and_collapses() {
        assert_eq!(normalize("  Hello,   World!!! "), "hello world");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("!!!"), "");
    }

    #[test]
    fn significant_tokens_drop_short_words() {
        assert_eq!(
            significant_tokens("A cat is on the mat, ok?"),
            vec!["cat", "the", "mat"]
        );
    }

    #[test]
    fn fingerprint_ignores_case_and_punctuation() {
        assert_eq!(fingerprint("Hello, World!!!", 100), fingerprint("hello world", 100));
    }

    #[test]
    fn fingerprint_keeps_leading_tokens_in_order() {
        let text = "alpha beta gamma delta epsilon";
        assert_eq!(fingerprint(text, 3), "alpha beta gamma");
    }

    #[test]
    fn fingerprint_converges_for_truncated_copies() {
        let long: String = (0..150).map(|i| format!("word{i} ")).collect();
        let truncated: String = (0..120).map(|i| format!("word{i} ")).collect();
        assert_eq!(fingerprint(&long, 100), fingerprint(&truncated, 100));
    }

    #[test]
    fn jaccard_identical_is_one() {
        assert_eq!(jaccard("community garden opens", "Community garden OPENS!"), 1.0);
    }

    #[test]
    fn jaccard_empty_is_zero() {
        assert_eq!(jaccard("", ""), 0.0);
        assert_eq!(jaccard("a b", "c d"), 0.0);
        assert_eq!(jaccard("", "something here"), 0.0);
    }

    #[test]
    fn jaccard_is_bounded() {
        let pairs = [
            ("the quick brown fox", "the lazy brown dog"),
            ("one two three", "four five six"),
            ("repeat repeat repeat", "repeat"),
        ];
        for (a, b) in pairs {
            let s = jaccard(a, b);
            assert!((0.0..=1.0).contains(&s), "{a} / {b} -> {s}");
        }
    }

    #[test]
    fn jaccard_partial_overlap() {
        // {quick, brown, fox} vs {lazy, brown, dog}: 1 / 5
        let s = jaccard("quick brown fox", "lazy brown dog");
        assert!((s - 0.2).abs() < 1e-9);
    }

    #[test]
    fn strip_markup_removes_tags_and_entities() {
        let html = "<p>Hello <b>there</b> &amp; welcome</p><script>var x = 1;</script>";
        assert_eq!(strip_markup(html), "Hello there & welcome");
    }

    #[test]
    fn word_count_ignores_markup() {
        assert_eq!(word_count("<p>one two</p> <br/>three"), 3);
        assert_eq!(word_count(""), 0);
    }

    #[test]
    fn reading_time_rounds_up() {
        assert_eq!(reading_time_minutes(0), 0);
        assert_eq!(reading_time_minutes(1), 1);
        assert_eq!(reading_time_minutes(200), 1);
        assert_eq!(reading_time_minutes(201), 2);
    }
}
