//! Runtime configuration
//!
//! Loaded from an optional TOML file; every field has a default so an empty
//! or missing file is a valid configuration.

use anyhow::{Context, Result};
use namehist_core::{CyclePolicy, NameSource};
use namehist_sync::{LedgerSettings, DEFAULT_RESYNC_CONCURRENCY};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Ledger configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct LedgerConfig {
    /// JSON file holding records and the destination
    pub(crate) data_file: PathBuf,
    /// Which member name is tracked
    pub(crate) name_source: NameSource,
    /// Treatment of a past name that becomes current again
    pub(crate) cycle_policy: CyclePolicy,
    /// Users reconciled concurrently during a sweep
    pub(crate) resync_concurrency: usize,
    pub(crate) discord: DiscordConfig,
}

impl LedgerConfig {
    /// Load from `path`, falling back to defaults when the file is absent
    pub(crate) fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("failed to parse {}", path.display()))
    }

    #[inline]
    #[must_use]
    pub(crate) fn with_data_file(mut self, data_file: impl Into<PathBuf>) -> Self {
        self.data_file = data_file.into();
        self
    }

    /// Settings handed to the ledger
    #[must_use]
    pub(crate) fn ledger_settings(&self) -> LedgerSettings {
        LedgerSettings::new()
            .with_cycle_policy(self.cycle_policy)
            .with_name_source(self.name_source)
            .with_resync_concurrency(self.resync_concurrency)
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from("namehist.json"),
            name_source: NameSource::default(),
            cycle_policy: CyclePolicy::default(),
            resync_concurrency: DEFAULT_RESYNC_CONCURRENCY,
            discord: DiscordConfig::default(),
        }
    }
}

/// Discord REST settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct DiscordConfig {
    pub(crate) api_base: String,
    /// Environment variable holding the bot token
    pub(crate) token_env: String,
    pub(crate) request_timeout_secs: u64,
}

impl DiscordConfig {
    #[inline]
    #[must_use]
    pub(crate) fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Read the bot token from the configured environment variable
    pub(crate) fn token(&self) -> Result<String> {
        let token = std::env::var(&self.token_env)
            .with_context(|| format!("bot token not set (export {})", self.token_env))?;
        if token.trim().is_empty() {
            anyhow::bail!("bot token in {} is empty", self.token_env);
        }
        Ok(token.trim().to_string())
    }
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            api_base: "https://discord.com/api/v10".to_string(),
            token_env: "DISCORD_TOKEN".to_string(),
            request_timeout_secs: 15,
        }
    }
}
