//! Runtime configuration: an optional TOML file layered over built-in
//! defaults, with the provider credential read from the environment.
//!
//! ```toml
//! [assistant]
//! model = "gemini-3-flash-preview"
//! temperature = 0.7
//!
//! [traffic]
//! fps = 60
//! theme = "dark"
//!
//! [server]
//! port = 8888
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::FolioError;
use crate::traffic::Theme;

/// Environment variables consulted for the provider credential, in order.
pub const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssistantConfig {
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub api_base: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            model: "gemini-3-flash-preview".to_string(),
            temperature: 0.7,
            max_output_tokens: 500,
            api_base: "https://generativelanguage.googleapis.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrafficConfig {
    pub fps: u32,
    pub theme: Theme,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            fps: 60,
            theme: Theme::Light,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8888 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FolioConfig {
    pub assistant: AssistantConfig,
    pub traffic: TrafficConfig,
    pub server: ServerConfig,
}

impl FolioConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, FolioError> {
        let cfg: FolioConfig = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: &Path) -> Result<Self, FolioError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Load `path` when given, otherwise fall back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, FolioError> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), FolioError> {
        if self.traffic.fps == 0 || self.traffic.fps > 240 {
            return Err(FolioError::Config(format!(
                "traffic.fps must be in 1..=240, got {}",
                self.traffic.fps
            )));
        }
        if !(0.0..=2.0).contains(&self.assistant.temperature) {
            return Err(FolioError::Config(format!(
                "assistant.temperature must be in 0.0..=2.0, got {}",
                self.assistant.temperature
            )));
        }
        if self.assistant.model.trim().is_empty() {
            return Err(FolioError::Config("assistant.model must not be empty".into()));
        }
        Ok(())
    }
}

/// First non-empty credential from [`API_KEY_VARS`].
///
/// A missing credential is not an error: requests go out without one and
/// fail at the provider, which the chat widget reports like any other
/// connection problem.
pub fn api_key_from_env() -> String {
    API_KEY_VARS
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|v| !v.trim().is_empty())
        .unwrap_or_default()
}
