//! Instance configuration: model credentials and the paths the Prompt
//! Cache and Capability Registry load from.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::dirs::TurnloopHome;

/// Embedded starter config, written out by `turnloop init` on first run.
const DEFAULT_CONFIG_YAML: &str = include_str!("default_config.yaml");
/// Embedded starter capability registry, written out alongside it.
const DEFAULT_CAPABILITIES_YAML: &str = include_str!("default_capabilities.yaml");

/// Model connection settings, mirrored onto [`turnloop_llm::ProviderConfig`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model identifier passed to the provider.
    pub model: String,
    /// Maximum tokens to generate per response.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Override base URL, for self-hosted or proxy deployments.
    #[serde(default)]
    pub base_url: Option<String>,
}

fn default_max_tokens() -> usize {
    4096
}

fn default_temperature() -> f64 {
    0.7
}

/// Whole instance config, as loaded from `~/.turnloop/config.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// Model connection settings.
    pub model: ModelConfig,
    /// Hard cap on turns per session.
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,
    /// Whether the intent analyzer runs at all.
    #[serde(default = "default_true")]
    pub intent_enabled: bool,
    /// Whether the plan/todo tool is exposed to the model.
    #[serde(default = "default_true")]
    pub plan_enabled: bool,
}

fn default_max_turns() -> u32 {
    100
}

fn default_true() -> bool {
    true
}

impl CliConfig {
    /// Load config from `~/.turnloop/config.yaml`, scaffolding it (and the
    /// default capability registry alongside it) on first run.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory can't be created, or the
    /// config file exists but fails to parse.
    pub fn load_or_init(home: &TurnloopHome) -> anyhow::Result<Self> {
        home.ensure()?;

        let config_path = home.config_path();
        if !config_path.exists() {
            std::fs::write(&config_path, DEFAULT_CONFIG_YAML)?;
        }
        let capabilities_path = home.capabilities_path();
        if !capabilities_path.exists() {
            std::fs::write(&capabilities_path, DEFAULT_CAPABILITIES_YAML)?;
        }

        let raw = std::fs::read_to_string(&config_path)?;
        let config: Self = serde_yaml::from_str(&raw)?;
        Ok(config)
    }

    /// Resolve the API key from the environment. Never read from the
    /// config file itself, so `config.yaml` stays safe to commit.
    pub fn api_key() -> anyhow::Result<String> {
        std::env::var("TURNLOOP_API_KEY")
            .map_err(|_| anyhow::anyhow!("TURNLOOP_API_KEY is not set"))
    }
}

/// Resolve the capability registry path for this config.
#[must_use]
pub fn capabilities_path(home: &TurnloopHome) -> PathBuf {
    home.capabilities_path()
}
