use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::feed::DEFAULT_FEED_LIMIT;

/// Default per-call store timeout when NEXUS_TIMEOUT_MS is unset.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Central configuration loaded from environment variables.
///
/// The .env file is loaded automatically at startup via dotenvy.
pub struct Config {
    /// URL of the site this user owns (NEXUS_SITE_URL). Needed for
    /// anything that reads or writes "my" profile or feed.
    pub site_url: String,
    /// Where local sites live (NEXUS_DATA_DIR). Each site is a directory
    /// under `<data_dir>/sites/`.
    pub data_dir: PathBuf,
    /// Budget for each individual store call (NEXUS_TIMEOUT_MS, 0 disables).
    pub timeout: Option<Duration>,
    /// Page size for feed commands (NEXUS_FEED_LIMIT).
    pub feed_limit: usize,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Everything has a default except the site URL, which is only
    /// required by commands that act as "me".
    pub fn load() -> Result<Self> {
        let timeout_ms = match env::var("NEXUS_TIMEOUT_MS") {
            Ok(raw) => raw
                .parse::<u64>()
                .with_context(|| format!("NEXUS_TIMEOUT_MS is not a number: {raw:?}"))?,
            Err(_) => DEFAULT_TIMEOUT_MS,
        };

        let feed_limit = match env::var("NEXUS_FEED_LIMIT") {
            Ok(raw) => raw
                .parse::<usize>()
                .with_context(|| format!("NEXUS_FEED_LIMIT is not a number: {raw:?}"))?,
            Err(_) => DEFAULT_FEED_LIMIT,
        };

        let data_dir = env::var("NEXUS_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_data_dir());

        Ok(Self {
            site_url: env::var("NEXUS_SITE_URL").unwrap_or_default(),
            data_dir,
            timeout: (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms)),
            feed_limit,
        })
    }

    /// Check that the user's own site is configured.
    /// Call this before any operation that acts on "my" site.
    pub fn require_site(&self) -> Result<()> {
        if self.site_url.is_empty() {
            anyhow::bail!(
                "NEXUS_SITE_URL not set. Add it to your .env file,\n\
                 or run `nexus init <url>` to create a site first."
            );
        }
        crate::site::url::normalize_url(&self.site_url)
            .with_context(|| format!("NEXUS_SITE_URL is not a site URL: {}", self.site_url))?;
        Ok(())
    }
}

/// Platform data directory, e.g. `~/.local/share/nexus` on Linux.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("nexus")
}
