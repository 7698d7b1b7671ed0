use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs, path::PathBuf};

use crate::console::VerbosityLevel;
use crate::context_management::ContextStrategyConfig;

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct BackendConfig {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
}

impl BackendConfig {
    /// Configured key, falling back to the OPENAI_API_KEY environment
    /// variable so the config file never has to hold the secret.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub default_backend: String,
    #[serde(default)]
    pub backends: HashMap<String, BackendConfig>,
    #[serde(default)]
    pub verbosity: Option<String>,
    #[serde(default)]
    pub context: ContextStrategyConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_backend: "openai".to_string(),
            backends: HashMap::new(),
            verbosity: None,
            context: ContextStrategyConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        let config = if config_path.exists() {
            let content = fs::read_to_string(&config_path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")?
        } else {
            Self::default()
        };

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&config_path, content).context("Failed to write config file")
    }

    pub fn get_backend_config(&self, backend_name: &str) -> Option<&BackendConfig> {
        self.backends.get(backend_name)
    }

    pub fn update_backend_setting(
        &mut self,
        backend_name: &str,
        key: &str,
        value: String,
    ) -> Result<()> {
        let config = self
            .backends
            .entry(backend_name.to_string())
            .or_default();

        match key {
            "api_key" => config.api_key = Some(value),
            "model" => config.model = Some(value),
            "base_url" => config.base_url = Some(value),
            _ => anyhow::bail!("Unknown backend config key: {}", key),
        }

        Ok(())
    }

    /// Get the configured verbosity level, falling back to Normal if not set
    pub fn get_verbosity(&self) -> VerbosityLevel {
        self.verbosity
            .as_ref()
            .and_then(|v| match v.as_str() {
                "quiet" => Some(VerbosityLevel::Quiet),
                "normal" => Some(VerbosityLevel::Normal),
                "verbose" => Some(VerbosityLevel::Verbose),
                "debug" => Some(VerbosityLevel::Debug),
                _ => None,
            })
            .unwrap_or(VerbosityLevel::Normal)
    }

    fn config_path() -> Result<PathBuf> {
        let path = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .context("Failed to get home directory")?;
        let mut path = PathBuf::from(path);
        path.push(".config");
        path.push("goftar");
        path.push("config.toml");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_targets_openai_with_truncation() {
        let config = AppConfig::default();
        assert_eq!(config.default_backend, "openai");
        assert!(matches!(
            config.context,
            ContextStrategyConfig::Truncation(_)
        ));
    }

    #[test]
    fn test_update_backend_setting_creates_entry() {
        let mut config = AppConfig::default();
        config
            .update_backend_setting("openai", "model", "gpt-4-1106-preview".to_string())
            .unwrap();

        let backend = config.get_backend_config("openai").unwrap();
        assert_eq!(backend.model.as_deref(), Some("gpt-4-1106-preview"));
    }

    #[test]
    fn test_unknown_backend_key_is_rejected() {
        let mut config = AppConfig::default();
        let result = config.update_backend_setting("openai", "temperature", "0.5".to_string());
        assert!(result.is_err());
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let mut config = AppConfig::default();
        config
            .update_backend_setting("openai", "base_url", "http://localhost:9000/v1".to_string())
            .unwrap();

        let rendered = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(
            parsed.get_backend_config("openai").unwrap().base_url.as_deref(),
            Some("http://localhost:9000/v1")
        );
    }
}
