use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::{OmniPilotError, OmniPilotResult};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub agent: AgentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Chat-completions endpoint of an OpenAI-compatible service.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Model used for planning (strict-JSON replies).
    #[serde(default = "default_model")]
    pub model: String,
    /// Model used for the vision fallback. Falls back to `model` when unset.
    #[serde(default)]
    pub vision_model: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Optional API key stored in config.toml
    /// (falls back to OMNIPILOT_API_KEY, then OPENAI_API_KEY).
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            model: default_model(),
            vision_model: None,
            temperature: default_temperature(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Safety valve: stop after this many iterations. Off by default —
    /// an unconfigured planner emitting errors forever is intentional.
    #[serde(default)]
    pub max_iterations: Option<u64>,
    /// Safety valve: stop after this many consecutive failed actions.
    #[serde(default)]
    pub max_consecutive_failures: Option<u32>,
    #[serde(default = "default_true")]
    pub narration: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: None,
            max_consecutive_failures: None,
            narration: true,
        }
    }
}

fn default_api_base() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_temperature() -> f32 {
    0.1
}

fn default_true() -> bool {
    true
}

fn resolve_config_path() -> OmniPilotResult<PathBuf> {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            let candidate = parent.join("config.toml");
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "config found next to executable");
                return Ok(candidate);
            }
        }
    }

    let cwd = std::env::current_dir()?;
    let candidate = cwd.join("config.toml");
    if candidate.exists() {
        tracing::debug!(path = %candidate.display(), "config found in working directory");
        return Ok(candidate);
    }

    Err(OmniPilotError::Config(
        "config.toml not found next to executable or in working directory".into(),
    ))
}

pub fn load_config() -> OmniPilotResult<AppConfig> {
    let path = resolve_config_path()?;
    let content = std::fs::read_to_string(&path)?;
    let config: AppConfig = toml::from_str(&content)?;
    tracing::info!(path = %path.display(), model = %config.llm.model, "config loaded");
    Ok(config)
}

/// Resolves the planner API key: config.toml value first, then
/// OMNIPILOT_API_KEY, then OPENAI_API_KEY.
pub fn resolve_api_key(llm: &LlmConfig) -> Option<String> {
    llm.api_key
        .clone()
        .filter(|k| !k.is_empty())
        .or_else(|| std::env::var("OMNIPILOT_API_KEY").ok().filter(|k| !k.is_empty()))
        .or_else(|| std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()))
}
