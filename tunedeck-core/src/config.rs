use crate::backend::BackendId;
use crate::error::{CoreError, Result};
use crate::lyric::{ParseOptions, DEFAULT_WORD_DURATION_MS};
use crate::quality::QualityPreference;
use const_format::concatcp;
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Per-provider budget for one fallback lookup
pub const DEFAULT_FALLBACK_TIMEOUT_MS: u64 = 5000;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub fallback: FallbackConfig,
    #[serde(default)]
    pub lyrics: LyricsConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Unknown values fall back to `auto`
    #[serde(default, deserialize_with = "lenient_quality")]
    pub quality: QualityPreference,
}

fn lenient_quality<'de, D>(deserializer: D) -> std::result::Result<QualityPreference, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(QualityPreference::from_setting(raw.as_deref()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Provider priority: earlier entries win when several providers match
    #[serde(default = "default_fallback_providers")]
    pub providers: Vec<BackendId>,
    #[serde(default = "default_fallback_timeout")]
    pub timeout_ms: u64,
}

fn default_fallback_providers() -> Vec<BackendId> {
    vec![BackendId::Netease, BackendId::Lrclib]
}

const fn default_fallback_timeout() -> u64 {
    DEFAULT_FALLBACK_TIMEOUT_MS
}

const fn default_true() -> bool {
    true
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            providers: default_fallback_providers(),
            timeout_ms: default_fallback_timeout(),
        }
    }
}

impl FallbackConfig {
    /// Rank of a provider in the configured priority, unlisted providers last.
    #[must_use]
    pub fn priority(&self, backend: BackendId) -> usize {
        self.providers
            .iter()
            .position(|&b| b == backend)
            .unwrap_or(self.providers.len())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LyricsConfig {
    /// Ask backends for word-by-word timing when they have it
    #[serde(default = "default_true")]
    pub word_synced: bool,
    #[serde(default = "default_word_duration")]
    pub default_word_duration_ms: u32,
}

const fn default_word_duration() -> u32 {
    DEFAULT_WORD_DURATION_MS
}

impl Default for LyricsConfig {
    fn default() -> Self {
        Self {
            word_synced: true,
            default_word_duration_ms: default_word_duration(),
        }
    }
}

impl Config {
    /// Get the config file path (~/.config/tunedeck/config.toml)
    #[must_use]
    pub fn config_path() -> PathBuf {
        crate::paths::config_path()
    }

    /// Load config from file or create template on first run
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigNotFound`] after writing the template on first
    /// run, or an error if the file cannot be read, parsed or validated.
    pub fn load_or_create() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            if let Some(parent) = config_path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&config_path, CONFIG_TEMPLATE)?;
            info!("Wrote config template to {}", config_path.display());

            return Err(CoreError::ConfigNotFound { path: config_path });
        }

        Self::load_from(&config_path)
    }

    /// Load and validate a config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate config text.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or a value is out of range.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigInvalid`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.fallback.timeout_ms == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "fallback.timeout_ms must be greater than 0".into(),
            });
        }
        if self.lyrics.default_word_duration_ms == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "lyrics.default_word_duration_ms must be greater than 0".into(),
            });
        }
        Ok(())
    }

    #[must_use]
    pub const fn fallback_timeout(&self) -> Duration {
        Duration::from_millis(self.fallback.timeout_ms)
    }

    #[must_use]
    pub const fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            default_word_duration_ms: self.lyrics.default_word_duration_ms,
        }
    }
}

pub const CONFIG_TEMPLATE: &str = concatcp!(
    r#"# Tunedeck Configuration
# ~/.config/tunedeck/config.toml

[playback]
# "auto", "high", "balanced" or "compat"
# high needs a signed-in account, otherwise balanced is used
quality = "auto"

[fallback]
# Look for the same track on other backends when the primary one fails
enabled = true
# Provider priority: "qqmusic", "netease", "spotify", "lrclib"
providers = ["netease", "lrclib"]
timeout_ms = "#,
    DEFAULT_FALLBACK_TIMEOUT_MS,
    r#"

[lyrics]
word_synced = true
# Used for words whose timing is missing or malformed
default_word_duration_ms = "#,
    DEFAULT_WORD_DURATION_MS,
    "\n"
);
