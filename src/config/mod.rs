//! Configuration loading and validation.
//!
//! Loads relay configuration from `./relay.toml` (or `$RELAY_CONFIG_PATH`).
//! Environment variables override file values; file values override defaults.
//!
//! Precedence: env vars > config file > defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::relay::{RelayRule, DEFAULT_WEBHOOK_NAME};
use crate::supervisor::RetryPolicy;

/// Config file used when `$RELAY_CONFIG_PATH` is unset.
pub const DEFAULT_CONFIG_FILE: &str = "relay.toml";

/// Errors that make the configuration unusable. Fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// No bot token in the file or the environment.
    #[error("bot token is not set (set TOKEN or RELAY_DISCORD_TOKEN)")]
    MissingToken,
    /// A channel id was not configured.
    #[error("{0} is not set")]
    MissingChannel(&'static str),
    /// Source and target are the same channel, which would relay forever.
    #[error("source and target channel are both {0}")]
    SelfReferential(u64),
    /// Any other invalid value.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ── Top-level config ────────────────────────────────────────────

/// Top-level relay configuration loaded from TOML.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Discord credentials.
    pub discord: DiscordConfig,
    /// Channel pair and delivery options.
    pub relay: RelayConfig,
    /// Reconnect policy.
    pub supervisor: SupervisorConfig,
    /// Log output settings.
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration with precedence: env vars > TOML file > defaults.
    ///
    /// `path` overrides the config file location; otherwise
    /// `$RELAY_CONFIG_PATH` or `./relay.toml` is used. A missing file yields
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env = |key: &str| std::env::var(key).ok();
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path_with(env),
        };
        let mut config = Self::load_from_file(&path)?;
        config.apply_overrides(env);
        Ok(config)
    }

    /// Load from a TOML file only, no env overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                tracing::debug!(path = %path.display(), "loading config from file");
                Self::from_toml(&contents)
                    .with_context(|| format!("failed to parse config at {}", path.display()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "failed to read config at {}: {e}",
                path.display()
            )),
        }
    }

    /// Resolve the config path using a custom env resolver.
    pub fn config_path_with(env: impl Fn(&str) -> Option<String>) -> PathBuf {
        env("RELAY_CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    /// Apply environment variable overrides (env > config > defaults).
    ///
    /// Takes a resolver function so tests do not need to mutate the process
    /// environment.
    pub fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        // Discord. `TOKEN` is accepted for compatibility; the prefixed name wins.
        if let Some(v) = env("TOKEN") {
            self.discord.token = Some(v);
        }
        if let Some(v) = env("RELAY_DISCORD_TOKEN") {
            self.discord.token = Some(v);
        }

        // Relay.
        if let Some(v) = parse_var(&env, "RELAY_SOURCE_CHANNEL_ID") {
            self.relay.source_channel_id = Some(v);
        }
        if let Some(v) = parse_var(&env, "RELAY_TARGET_CHANNEL_ID") {
            self.relay.target_channel_id = Some(v);
        }
        if let Some(v) = env("RELAY_WEBHOOK_NAME") {
            self.relay.webhook_name = v;
        }
        if let Some(v) = parse_var(&env, "RELAY_IMPERSONATE") {
            self.relay.impersonate = v;
        }

        // Supervisor.
        if let Some(v) = parse_var(&env, "RELAY_RETRY_DELAY_SECS") {
            self.supervisor.retry_delay_secs = v;
        }
        if let Some(v) = parse_var(&env, "RELAY_MAX_ATTEMPTS") {
            self.supervisor.max_attempts = Some(v);
        }

        // Logging.
        if let Some(v) = env("RELAY_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = env("RELAY_LOGS_DIR") {
            self.logging.logs_dir = Some(PathBuf::from(v));
        }
    }

    /// Parse a TOML string into config.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not valid TOML for this schema.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(toml_str).context("failed to parse config TOML")?;
        Ok(config)
    }

    /// Check the configuration and produce the settings the relay runs with.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for a missing or blank token, a missing
    /// channel id, identical source and target channels, a blank webhook
    /// name, or a zero queue capacity.
    pub fn validate(&self) -> Result<RelaySettings, ConfigError> {
        let token = self
            .discord
            .token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::MissingToken)?
            .to_owned();

        let source = self
            .relay
            .source_channel_id
            .ok_or(ConfigError::MissingChannel("relay.source_channel_id"))?;
        let target = self
            .relay
            .target_channel_id
            .ok_or(ConfigError::MissingChannel("relay.target_channel_id"))?;
        if source == target {
            return Err(ConfigError::SelfReferential(source));
        }

        let webhook_name = self.relay.webhook_name.trim();
        if webhook_name.is_empty() {
            return Err(ConfigError::Invalid(
                "relay.webhook_name must not be empty".to_owned(),
            ));
        }
        if self.relay.queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "relay.queue_capacity must be at least 1".to_owned(),
            ));
        }

        Ok(RelaySettings {
            token,
            rule: RelayRule { source, target },
            webhook_name: webhook_name.to_owned(),
            impersonate: self.relay.impersonate,
            queue_capacity: self.relay.queue_capacity,
            retry: self.supervisor.retry_policy(),
        })
    }
}

fn parse_var<T: std::str::FromStr>(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = env(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(var = key, value = %raw, "ignoring invalid env override");
            None
        }
    }
}

// ── Validated settings ──────────────────────────────────────────

/// Validated settings the relay runs with.
#[derive(Clone)]
pub struct RelaySettings {
    /// Bot token.
    pub token: String,
    /// Source/target channel pair.
    pub rule: RelayRule,
    /// Label of the relay webhook.
    pub webhook_name: String,
    /// Whether to post through a webhook at all.
    pub impersonate: bool,
    /// Capacity of the handler → worker queue.
    pub queue_capacity: usize,
    /// Reconnect policy.
    pub retry: RetryPolicy,
}

impl std::fmt::Debug for RelaySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelaySettings")
            .field("token", &"__REDACTED__")
            .field("rule", &self.rule)
            .field("webhook_name", &self.webhook_name)
            .field("impersonate", &self.impersonate)
            .field("queue_capacity", &self.queue_capacity)
            .field("retry", &self.retry)
            .finish()
    }
}

// ── Discord config ──────────────────────────────────────────────

/// Discord credentials.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    /// Bot token. Usually supplied through the environment.
    pub token: Option<String>,
}

impl std::fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("token", &self.token.as_ref().map(|_| "__REDACTED__"))
            .finish()
    }
}

// ── Relay config ────────────────────────────────────────────────

/// Channel pair and delivery options.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Channel whose messages are relayed.
    pub source_channel_id: Option<u64>,
    /// Channel the messages are posted into.
    pub target_channel_id: Option<u64>,
    /// Label of the webhook the relay posts through.
    pub webhook_name: String,
    /// Post through a webhook under the author's name and avatar.
    pub impersonate: bool,
    /// Capacity of the handler → worker queue.
    pub queue_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            source_channel_id: None,
            target_channel_id: None,
            webhook_name: DEFAULT_WEBHOOK_NAME.to_owned(),
            impersonate: true,
            queue_capacity: 100,
        }
    }
}

// ── Supervisor config ───────────────────────────────────────────

/// Reconnect policy.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Fixed delay between connection attempts, in seconds.
    pub retry_delay_secs: u64,
    /// Maximum connection attempts; unlimited when absent.
    pub max_attempts: Option<u32>,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            retry_delay_secs: 5,
            max_attempts: None,
        }
    }
}

impl SupervisorConfig {
    /// Build the runtime retry policy.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            delay: Duration::from_secs(self.retry_delay_secs),
            max_attempts: self.max_attempts,
        }
    }
}

// ── Logging config ──────────────────────────────────────────────

/// Log output settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    /// Directory for rotated JSON logs; platform data dir when absent.
    pub logs_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            logs_dir: None,
        }
    }
}

impl LoggingConfig {
    /// Resolve the logs directory, falling back to `<data dir>/logs`.
    ///
    /// # Errors
    ///
    /// Returns an error if no directory is configured and the platform data
    /// directory cannot be determined.
    pub fn resolve_logs_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.logs_dir {
            return Ok(dir.clone());
        }
        let dirs = directories::ProjectDirs::from("", "", "channel-relay")
            .ok_or_else(|| anyhow::anyhow!("cannot determine data directory"))?;
        Ok(dirs.data_dir().join("logs"))
    }
}

// ── Tests ───────────────────────────────────────────────────────
