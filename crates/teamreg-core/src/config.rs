// Configuration loading and parsing (registration.toml).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },
}

// ---------------------------------------------------------------------------
// Policies
// ---------------------------------------------------------------------------

/// Whether a roster must designate a captain before it can be submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CaptainPolicy {
    /// A non-empty roster without a captain fails validation.
    Required,
    /// The captain designation is never checked.
    #[default]
    Optional,
}

/// Which roster slots must carry a photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PhotoRequirement {
    /// Only slots without a saved player behind them need a photo.
    #[default]
    NewSlotsOnly,
    /// Every slot needs a photo; a saved player's server-side picture counts.
    AllSlots,
    /// Photos are always optional.
    Never,
}

// ---------------------------------------------------------------------------
// registration.toml structs
// ---------------------------------------------------------------------------

/// Roster rules consumed by the builder and the validator.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RosterRules {
    pub max_players: usize,
    pub jersey_min: i32,
    pub jersey_max: i32,
    pub captain_policy: CaptainPolicy,
    pub photo_requirement: PhotoRequirement,
    /// When set, the first slot added to an empty roster becomes captain.
    pub captain_on_first_slot: bool,
}

impl Default for RosterRules {
    fn default() -> Self {
        RosterRules {
            max_players: 12,
            jersey_min: 1,
            jersey_max: 99,
            captain_policy: CaptainPolicy::default(),
            photo_requirement: PhotoRequirement::default(),
            captain_on_first_slot: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InvitationConfig {
    pub redirect_delay_ms: u64,
    pub min_code_length: usize,
}

impl Default for InvitationConfig {
    fn default() -> Self {
        InvitationConfig {
            redirect_delay_ms: 2000,
            min_code_length: 4,
        }
    }
}

impl InvitationConfig {
    pub fn redirect_delay(&self) -> Duration {
        Duration::from_millis(self.redirect_delay_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    /// No timeout is applied when omitted.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            base_url: "http://localhost:3000/api".to_string(),
            request_timeout_secs: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level assembled config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistrationConfig {
    #[serde(default)]
    pub roster: RosterRules,
    #[serde(default)]
    pub invitation: InvitationConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate `config/registration.toml` relative to `base_dir`.
pub fn load_config_from(base_dir: &Path) -> Result<RegistrationConfig, ConfigError> {
    let path = base_dir.join("config").join("registration.toml");
    let text = read_file(&path)?;
    let config = parse_config(&text, &path)?;
    validate(&config)?;
    Ok(config)
}

/// Load from the current working directory, falling back to the bundled
/// `defaults/registration.toml` when no `config/` copy exists yet.
pub fn load_config() -> anyhow::Result<RegistrationConfig> {
    use anyhow::Context;

    let cwd = std::env::current_dir().context("failed to resolve working directory")?;
    if cwd.join("config").join("registration.toml").exists() {
        return Ok(load_config_from(&cwd)?);
    }

    let defaults = cwd.join("defaults").join("registration.toml");
    let text = read_file(&defaults)?;
    let config = parse_config(&text, &defaults)?;
    validate(&config)?;
    Ok(config)
}

/// Parse TOML text into a config without validating it.
pub fn parse_config(text: &str, path: &Path) -> Result<RegistrationConfig, ConfigError> {
    toml::from_str(text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

/// Validate semantic constraints that serde cannot express.
pub fn validate(config: &RegistrationConfig) -> Result<(), ConfigError> {
    let roster = &config.roster;

    if roster.max_players == 0 {
        return Err(ConfigError::ValidationError {
            field: "roster.max_players".into(),
            message: "must be at least 1".into(),
        });
    }

    if roster.jersey_min < 0 {
        return Err(ConfigError::ValidationError {
            field: "roster.jersey_min".into(),
            message: format!("must not be negative, got {}", roster.jersey_min),
        });
    }

    if roster.jersey_min > roster.jersey_max {
        return Err(ConfigError::ValidationError {
            field: "roster.jersey_max".into(),
            message: format!(
                "must be >= jersey_min ({}), got {}",
                roster.jersey_min, roster.jersey_max
            ),
        });
    }

    if config.api.base_url.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "api.base_url".into(),
            message: "must not be empty".into(),
        });
    }

    if config.api.request_timeout_secs == Some(0) {
        return Err(ConfigError::ValidationError {
            field: "api.request_timeout_secs".into(),
            message: "must be positive when set".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
