//! Configuration management and environment variable loading

use crate::completion::{ApiStyle, CompletionSettings};
use crate::persona::{PersonaPrompt, PersonaTable};
use crate::router::RouterConfig;
use crate::{Result, YebotError};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default location of the optional settings file
pub const DEFAULT_SETTINGS_FILE: &str = "config.json";

/// Load environment variables from the nearest .env file
///
/// Safe to call when no .env file exists; the system environment is used
/// as-is. Returns the file that was loaded. Variables already set in the
/// process environment are never overwritten.
pub fn load_env() -> Result<Option<PathBuf>> {
    dotenv_result(dotenvy::dotenv())
}

/// Load environment variables from the .env file at `path`
pub fn load_env_from_path(path: impl AsRef<Path>) -> Result<Option<PathBuf>> {
    let path = path.as_ref();
    dotenv_result(dotenvy::from_path(path).map(|()| path.to_path_buf()))
}

fn dotenv_result(result: std::result::Result<PathBuf, dotenvy::Error>) -> Result<Option<PathBuf>> {
    match result {
        Ok(path) => {
            tracing::info!("Loaded environment from: {}", path.display());
            Ok(Some(path))
        }
        Err(dotenvy::Error::LineParse(line, pos)) => Err(YebotError::config(format!(
            "Failed to parse .env file at line {}, position {}",
            line, pos
        ))),
        Err(dotenvy::Error::Io(_)) => {
            tracing::debug!("No .env file found - using system environment variables only");
            Ok(None)
        }
        Err(e) => Err(YebotError::config(format!(
            "Failed to load .env file: {}",
            e
        ))),
    }
}

/// Get required environment variable
///
/// Returns an error if the variable is not set
pub fn get_required_env(key: &str) -> Result<String> {
    env::var(key).map_err(|_| {
        YebotError::config(format!(
            "Required environment variable '{}' is not set. \
             Check your .env file or system environment.",
            key
        ))
    })
}

/// Get optional environment variable with default
pub fn get_env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get environment variable as integer
pub fn get_env_int<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

/// Get environment variable as float
pub fn get_env_float(key: &str, default: f32) -> f32 {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<f32>().ok())
        .unwrap_or(default)
}

/// Validate that required environment variables are set
pub fn validate_env(required_vars: &[&str]) -> Result<()> {
    let missing: Vec<&str> = required_vars
        .iter()
        .copied()
        .filter(|var| env::var(var).is_err())
        .collect();

    if !missing.is_empty() {
        return Err(YebotError::config(format!(
            "Missing required environment variables: {}\n\
             Put them in a .env file next to the binary or export them",
            missing.join(", ")
        )));
    }

    Ok(())
}

/// Model names from the settings file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelSettings {
    /// Completion model override
    #[serde(default)]
    pub gpt: Option<String>,
}

/// Optional JSON settings file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsFile {
    /// Model overrides
    #[serde(default)]
    pub models: ModelSettings,
    /// Trigger word override
    #[serde(default)]
    pub triggers: Option<Vec<String>>,
    /// Extra or replacement personas keyed by author display name
    #[serde(default)]
    pub personas: HashMap<String, PersonaPrompt>,
}

impl SettingsFile {
    /// Parse settings from a JSON string
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Load settings from `path`; a missing file is not an error
    pub fn load(path: impl AsRef<Path>) -> Result<Option<Self>> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(raw) => {
                let settings = Self::from_json(&raw).map_err(|e| {
                    YebotError::config(format!("Invalid settings file {}: {}", path.display(), e))
                })?;
                tracing::info!(path = %path.display(), "Loaded settings file");
                Ok(Some(settings))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No settings file, using defaults");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Everything the bot needs at start-up
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Discord bot token
    pub discord_token: String,
    /// Completion API settings
    pub completion: CompletionSettings,
    /// Message router settings
    pub router: RouterConfig,
    /// Persona prompts keyed by author display name
    pub personas: PersonaTable,
    /// How long to wait for a voice connection to become ready
    pub join_timeout: Duration,
}

impl BotConfig {
    /// Build the configuration from defaults, then the settings file, then the environment
    pub fn from_env(settings: Option<SettingsFile>) -> Result<Self> {
        validate_env(&["DISCORD_KEY", "OPENAI_KEY"])?;
        let settings = settings.unwrap_or_default();

        let api_style: ApiStyle = get_env_or("OPENAI_API_STYLE", "chat").parse()?;
        let model = env::var("OPENAI_MODEL")
            .ok()
            .filter(|m| !m.trim().is_empty())
            .or(settings.models.gpt)
            .unwrap_or_else(|| api_style.default_model().to_string());

        let completion = CompletionSettings {
            api_key: get_required_env("OPENAI_KEY")?,
            api_style,
            model,
            max_tokens: get_env_int("OPENAI_MAX_TOKENS", 1000u32),
            temperature: get_env_float("OPENAI_TEMPERATURE", 1.0),
            api_base: env::var("OPENAI_API_BASE").ok().filter(|b| !b.trim().is_empty()),
        };

        let mut router = RouterConfig::default();
        if let Some(triggers) = settings.triggers {
            router.triggers = triggers;
        }
        if let Ok(raw) = env::var("YEBOT_TRIGGERS") {
            router.triggers = parse_triggers(&raw);
        }
        router.prompt_offset = get_env_int("YEBOT_PROMPT_OFFSET", router.prompt_offset);
        if router.triggers.is_empty() {
            return Err(YebotError::config("At least one trigger word is required"));
        }

        let mut personas = PersonaTable::default();
        personas.extend(settings.personas);

        Ok(Self {
            discord_token: get_required_env("DISCORD_KEY")?,
            completion,
            router,
            personas,
            join_timeout: Duration::from_secs(get_env_int("YEBOT_JOIN_TIMEOUT_SECS", 60u64)),
        })
    }
}

/// Split a comma separated trigger list, dropping blanks
pub fn parse_triggers(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
