use std::collections::HashMap;
use std::env;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::{ConfigError, NormalizeError};
use crate::types::Platform;

pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.85;
pub const DEFAULT_SIMILARITY_WINDOW_DAYS: i64 = 30;
pub const DEFAULT_MAX_CONCURRENT_CREATORS: usize = 8;

/// Platform ranking used when electing a duplicate group's primary.
/// Platforms missing from the table rank 0.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "HashMap<String, u8>")]
pub struct PriorityTable {
    weights: HashMap<Platform, u8>,
}

impl TryFrom<HashMap<String, u8>> for PriorityTable {
    type Error = NormalizeError;

    fn try_from(raw: HashMap<String, u8>) -> std::result::Result<Self, Self::Error> {
        let weights = raw
            .into_iter()
            .map(|(name, weight)| Ok((name.parse::<Platform>()?, weight)))
            .collect::<std::result::Result<_, NormalizeError>>()?;
        Ok(Self { weights })
    }
}

impl PriorityTable {
    pub fn new(weights: HashMap<Platform, u8>) -> Self {
        Self { weights }
    }

    pub fn priority(&self, platform: Platform) -> u8 {
        self.weights.get(&platform).copied().unwrap_or(0)
    }
}

impl Default for PriorityTable {
    fn default() -> Self {
        Self::new(HashMap::from([
            (Platform::Youtube, 10),
            (Platform::Twitter, 8),
            (Platform::Linkedin, 7),
            (Platform::Threads, 6),
            (Platform::Rss, 5),
            (Platform::Website, 4),
        ]))
    }
}

/// Tuning for the dedup pipeline. Everything here has a working default;
/// `from_env` and `load_config` only override what they find.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DedupConfig {
    /// Minimum Jaccard score for a social post to join an existing group.
    pub similarity_threshold: f64,
    /// How far back similarity matching looks for same-creator posts.
    pub similarity_window_days: i64,
    pub fingerprint_tokens: usize,
    /// Creators resolved concurrently within one batch.
    pub max_concurrent_creators: usize,
    pub priorities: PriorityTable,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            similarity_window_days: DEFAULT_SIMILARITY_WINDOW_DAYS,
            fingerprint_tokens: crate::text::FINGERPRINT_TOKENS,
            max_concurrent_creators: DEFAULT_MAX_CONCURRENT_CREATORS,
            priorities: PriorityTable::default(),
        }
    }
}

impl DedupConfig {
    /// Load overrides from `FEEDLINE_*` environment variables (and `.env` if present).
    pub fn from_env() -> std::result::Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let mut config = Self::default();
        if let Some(v) = optional_env("FEEDLINE_SIMILARITY_THRESHOLD")? {
            config.similarity_threshold = v;
        }
        if let Some(v) = optional_env("FEEDLINE_SIMILARITY_WINDOW_DAYS")? {
            config.similarity_window_days = v;
        }
        if let Some(v) = optional_env("FEEDLINE_FINGERPRINT_TOKENS")? {
            config.fingerprint_tokens = v;
        }
        if let Some(v) = optional_env("FEEDLINE_MAX_CONCURRENT_CREATORS")? {
            config.max_concurrent_creators = v;
        }
        config.validate()?;
        tracing::debug!(
            similarity_threshold = config.similarity_threshold,
            similarity_window_days = config.similarity_window_days,
            fingerprint_tokens = config.fingerprint_tokens,
            max_concurrent_creators = config.max_concurrent_creators,
            "Dedup config loaded"
        );
        Ok(config)
    }

    /// Pool size: one connection per concurrently resolved creator, plus two.
    pub fn max_connections(&self) -> u32 {
        u32::try_from(self.max_concurrent_creators)
            .unwrap_or(u32::MAX)
            .saturating_add(2)
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if !(self.similarity_threshold > 0.0 && self.similarity_threshold <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "similarity_threshold must be in (0, 1], got {}",
                self.similarity_threshold
            )));
        }
        if self.similarity_window_days <= 0 {
            return Err(ConfigError::Invalid(format!(
                "similarity_window_days must be positive, got {}",
                self.similarity_window_days
            )));
        }
        if self.fingerprint_tokens == 0 {
            return Err(ConfigError::Invalid(
                "fingerprint_tokens must be positive".to_string(),
            ));
        }
        if self.max_concurrent_creators == 0 {
            return Err(ConfigError::Invalid(
                "max_concurrent_creators must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load and validate a TOML config file.
pub fn load_config(path: &Path) -> Result<DedupConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

pub fn parse_config(content: &str) -> Result<DedupConfig> {
    let config: DedupConfig = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

fn optional_env<T: std::str::FromStr>(key: &str) -> std::result::Result<Option<T>, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw,
            }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = DedupConfig::default();
        assert_eq!(config.similarity_threshold, 0.85);
        assert_eq!(config.similarity_window_days, 30);
        assert_eq!(config.fingerprint_tokens, 100);
        assert_eq!(config.priorities.priority(Platform::Youtube), 10);
        assert_eq!(config.priorities.priority(Platform::Website), 4);
    }

    #[test]
    fn toml_overrides_only_given_fields() {
        let config = parse_config(
            r#"
            similarity_threshold = 0.9

            [priorities]
            rss = 9
            "#,
        )
        .unwrap();
        assert_eq!(config.similarity_threshold, 0.9);
        assert_eq!(config.similarity_window_days, 30);
        assert_eq!(config.priorities.priority(Platform::Rss), 9);
        // A priorities table replaces the defaults wholesale.
        assert_eq!(config.priorities.priority(Platform::Youtube), 0);
    }

    #[test]
    fn max_connections_saturates() {
        let mut config = DedupConfig::default();
        assert_eq!(config.max_connections(), 10);
        config.max_concurrent_creators = u32::MAX as usize;
        assert_eq!(config.max_connections(), u32::MAX);
        config.max_concurrent_creators = usize::MAX;
        assert_eq!(config.max_connections(), u32::MAX);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(parse_config("similarity_treshold = 0.9").is_err());
        assert!(parse_config("[priorities]\nmyspace = 3").is_err());
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        assert!(parse_config("similarity_threshold = 1.5").is_err());
        assert!(parse_config("similarity_window_days = 0").is_err());
    }
}
