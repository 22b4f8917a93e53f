use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::{TapClawError, TapClawResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub model: ModelConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub agent: AgentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Chat-completions endpoint of the GUI model server.
    pub endpoint: String,
    /// Model name sent in the request body.
    pub name: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Attempts per predict call; clamped into [1, 5] at client construction.
    #[serde(default = "default_max_retry")]
    pub max_retry: i32,
    /// Retain past turns as conversation context.
    #[serde(default)]
    pub use_history: bool,
    /// Turns kept when history is enabled (one user + one assistant message each).
    #[serde(default = "default_history_size")]
    pub history_size: usize,
    /// Optional API key (falls back to env var TAPCLAW_API_KEY).
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// adb serial; None lets adb pick / discovery pick the first device.
    #[serde(default)]
    pub serial: Option<String>,
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,
    /// Local path of the Unicode keyboard helper pushed on first non-ASCII input.
    #[serde(default = "default_helper_path")]
    pub helper_path: PathBuf,
    /// Token substituted for spaces on the `input text` fast path.
    #[serde(default = "default_space_token")]
    pub space_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Delay after each executed step, letting the UI settle.
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,
    /// Screenshots are downscaled so the longest edge stays under this.
    #[serde(default = "default_screenshot_max_edge")]
    pub screenshot_max_edge: u32,
    /// Optional hard bound on loop iterations; absent means until terminal status.
    #[serde(default)]
    pub max_steps: Option<u32>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            serial: None,
            command_timeout_secs: default_command_timeout(),
            helper_path: default_helper_path(),
            space_token: default_space_token(),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            pacing_ms: default_pacing_ms(),
            screenshot_max_edge: default_screenshot_max_edge(),
            max_steps: None,
        }
    }
}

fn default_temperature() -> f64 {
    1.0
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_max_retry() -> i32 {
    3
}

fn default_history_size() -> usize {
    10
}

fn default_command_timeout() -> u64 {
    30
}

fn default_helper_path() -> PathBuf {
    PathBuf::from("yadb/yadb")
}

fn default_space_token() -> String {
    "%s".to_string()
}

fn default_pacing_ms() -> u64 {
    2500
}

fn default_screenshot_max_edge() -> u32 {
    1120
}

fn resolve_config_path() -> TapClawResult<PathBuf> {
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

    Err(TapClawError::Config(
        "config.toml not found next to executable or in working directory".into(),
    ))
}

pub fn load_config() -> TapClawResult<AppConfig> {
    let path = resolve_config_path()?;
    let content = std::fs::read_to_string(&path)?;
    let config: AppConfig = toml::from_str(&content)?;
    tracing::info!(path = %path.display(), model = %config.model.name, "config loaded");
    Ok(config)
}

pub fn save_config(config: &AppConfig) -> TapClawResult<()> {
    let path = resolve_config_path()?;
    let content = toml::to_string_pretty(config)?;
    std::fs::write(&path, content)?;
    tracing::info!(path = %path.display(), "config saved");
    Ok(())
}
