//! Configuration resolution for tool calls.

use glv::ApiConfig;

/// Command-line overrides applied on top of the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub base_url: Option<String>,
    pub vision_model: Option<String>,
}

/// Where each tool call gets its API configuration from.
#[derive(Debug, Clone)]
pub enum ConfigSource {
    /// Re-read the process environment on every call.
    Environment(ConfigOverrides),
    /// Always use the same configuration.
    Fixed(ApiConfig),
}

impl ConfigSource {
    pub fn resolve(&self) -> ApiConfig {
        match self {
            ConfigSource::Fixed(config) => config.clone(),
            ConfigSource::Environment(overrides) => {
                let mut config = ApiConfig::from_env();
                if let Some(base_url) = &overrides.base_url {
                    config = config.with_base_url(base_url);
                }
                if let Some(model) = &overrides.vision_model {
                    config = config.with_vision_model(model.clone());
                }
                config
            }
        }
    }
}

/// Shared state handed to every tool invocation. Holds no per-request data.
#[derive(Debug, Clone)]
pub struct ServerContext {
    http: reqwest::Client,
    config: ConfigSource,
}

impl ServerContext {
    pub fn new(config: ConfigSource) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Context reading the environment with the given overrides.
    pub fn from_env(overrides: ConfigOverrides) -> Self {
        Self::new(ConfigSource::Environment(overrides))
    }

    /// Context pinned to a single configuration.
    pub fn fixed(config: ApiConfig) -> Self {
        Self::new(ConfigSource::Fixed(config))
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Configuration for the current call.
    pub fn api_config(&self) -> ApiConfig {
        self.config.resolve()
    }
}
