//! Remote API configuration.

use crate::types::{GlvError, GlvResult};

/// Environment variable holding the API credential.
pub const API_KEY_ENV: &str = "GLM_API_KEY";

/// Environment variable overriding the API base URL.
pub const BASE_URL_ENV: &str = "GLM_BASE_URL";

/// Environment variable overriding the vision model name.
pub const VISION_MODEL_ENV: &str = "GLM_VISION_MODEL";

/// Default provider endpoint.
pub const DEFAULT_BASE_URL: &str = "https://open.bigmodel.cn/api/paas/v4";

/// Default multimodal chat model.
pub const DEFAULT_VISION_MODEL: &str = "glm-4v-plus";

const COMPLETIONS_SUFFIX: &str = "/chat/completions";

/// Credential and endpoint settings passed explicitly into each adapter.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub vision_model: String,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("vision_model", &self.vision_model)
            .finish()
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            vision_model: DEFAULT_VISION_MODEL.to_string(),
        }
    }
}

impl ApiConfig {
    /// Build a config with an explicit key and base URL.
    pub fn new(api_key: Option<String>, base_url: &str) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: normalize_base_url(base_url),
            vision_model: DEFAULT_VISION_MODEL.to_string(),
        }
    }

    /// Read the current process environment.
    pub fn from_env() -> Self {
        let base_url = std::env::var(BASE_URL_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let mut config = Self::new(std::env::var(API_KEY_ENV).ok(), &base_url);
        if let Ok(model) = std::env::var(VISION_MODEL_ENV) {
            if !model.trim().is_empty() {
                config.vision_model = model;
            }
        }
        config
    }

    pub fn with_vision_model(mut self, model: impl Into<String>) -> Self {
        self.vision_model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = normalize_base_url(base_url);
        self
    }

    /// Whether a credential is configured.
    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    /// The credential, or `MissingCredential` when absent.
    pub fn require_key(&self) -> GlvResult<&str> {
        self.api_key
            .as_deref()
            .ok_or(GlvError::MissingCredential(API_KEY_ENV))
    }

    /// Join a path onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

/// Strip trailing slashes and a legacy `/chat/completions` suffix.
fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    trimmed
        .strip_suffix(COMPLETIONS_SUFFIX)
        .unwrap_or(trimmed)
        .trim_end_matches('/')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_completions_url_is_stripped() {
        let config = ApiConfig::new(
            None,
            "https://open.bigmodel.cn/api/paas/v4/chat/completions",
        );
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(
            config.endpoint("chat/completions"),
            "https://open.bigmodel.cn/api/paas/v4/chat/completions"
        );
    }

    #[test]
    fn test_endpoint_join() {
        let config = ApiConfig::new(Some("k".into()), "http://localhost:9000/v4/");
        assert_eq!(config.endpoint("/files"), "http://localhost:9000/v4/files");
        assert_eq!(config.require_key().unwrap(), "k");
    }

    #[test]
    fn test_blank_key_is_missing() {
        let config = ApiConfig::new(Some("  ".into()), DEFAULT_BASE_URL);
        assert!(!config.has_credential());
        assert!(matches!(
            config.require_key(),
            Err(GlvError::MissingCredential(API_KEY_ENV))
        ));
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = ApiConfig::new(Some("secret-key".into()), DEFAULT_BASE_URL);
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret-key"));
        assert!(debug.contains("<redacted>"));
    }
}
