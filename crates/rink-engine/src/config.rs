use std::env;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";
pub const IMAGE_ASPECT_RATIO: &str = "1:1";

const API_KEY_VARS: [&str; 3] = ["GEMINI_API_KEY", "GOOGLE_API_KEY", "API_KEY"];

/// Process configuration for the engine. Nothing here is validated at startup; a
/// missing credential only surfaces when a generation is attempted.
#[derive(Clone, PartialEq)]
pub struct EngineConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub image_model: String,
    pub request_timeout: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_GEMINI_API_BASE.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            request_timeout: None,
        }
    }
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_base", &self.api_base)
            .field("image_model", &self.image_model)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();
        Self {
            api_key: API_KEY_VARS.iter().find_map(|&key| non_empty(key)),
            api_base: non_empty("GEMINI_API_BASE")
                .map(|value| value.trim_end_matches('/').to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or(defaults.api_base),
            image_model: non_empty("RINK_IMAGE_MODEL").unwrap_or(defaults.image_model),
            request_timeout: non_empty("RINK_REQUEST_TIMEOUT_S")
                .and_then(|value| value.parse::<f64>().ok())
                .filter(|secs| *secs > 0.0)
                .and_then(|secs| Duration::try_from_secs_f64(secs).ok()),
        }
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn credential_env_vars() -> &'static [&'static str] {
        &API_KEY_VARS
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use super::{EngineConfig, DEFAULT_GEMINI_API_BASE, DEFAULT_IMAGE_MODEL};

    fn config_from(pairs: &[(&str, &str)]) -> EngineConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        EngineConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.api_key, None);
        assert!(!config.has_credential());
        assert_eq!(config.api_base, DEFAULT_GEMINI_API_BASE);
        assert_eq!(config.image_model, DEFAULT_IMAGE_MODEL);
        assert_eq!(config.request_timeout, None);
    }

    #[test]
    fn credential_lookup_order_skips_blank_values() {
        let config = config_from(&[
            ("GEMINI_API_KEY", "   "),
            ("GOOGLE_API_KEY", "google-key"),
            ("API_KEY", "plain-key"),
        ]);
        assert_eq!(config.api_key.as_deref(), Some("google-key"));

        let config = config_from(&[("API_KEY", "plain-key")]);
        assert_eq!(config.api_key.as_deref(), Some("plain-key"));
    }

    #[test]
    fn overrides_are_normalized() {
        let config = config_from(&[
            ("GEMINI_API_BASE", "http://127.0.0.1:9000/v1beta/"),
            ("RINK_IMAGE_MODEL", "gemini-3-pro-image-preview"),
            ("RINK_REQUEST_TIMEOUT_S", "45"),
        ]);
        assert_eq!(config.api_base, "http://127.0.0.1:9000/v1beta");
        assert_eq!(config.image_model, "gemini-3-pro-image-preview");
        assert_eq!(config.request_timeout, Some(Duration::from_secs(45)));

        let config = config_from(&[("RINK_REQUEST_TIMEOUT_S", "-3")]);
        assert_eq!(config.request_timeout, None);
    }

    #[test]
    fn out_of_range_timeouts_are_ignored() {
        for raw in ["1e30", "inf", "NaN", "0", "soon"] {
            let config = config_from(&[("RINK_REQUEST_TIMEOUT_S", raw)]);
            assert_eq!(config.request_timeout, None, "{raw}");
        }
        let config = config_from(&[("RINK_REQUEST_TIMEOUT_S", "2.5")]);
        assert_eq!(config.request_timeout, Some(Duration::from_millis(2500)));
    }

    #[test]
    fn debug_output_redacts_key() {
        let config = config_from(&[("GEMINI_API_KEY", "secret-value")]);
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("secret-value"));
        assert!(rendered.contains("<redacted>"));
    }
}
