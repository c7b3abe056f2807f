//! Runtime configuration loaded from the environment.
//!
//! Lookup order for each required value:
//! 1. The plain variable (`LLM_MODEL`, `LLM_API_KEY`)
//! 2. The GitHub Actions input form (`INPUT_LLM_MODEL`, `INPUT_LLM_API_KEY`)

use std::env;
use std::time::Duration;

use tracing::warn;

use crate::error::ConfigError;

/// Default request timeout (5 minutes).
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

const MODEL_ENV_VARS: &[&str] = &["LLM_MODEL", "INPUT_LLM_MODEL"];
const API_KEY_ENV_VARS: &[&str] = &["LLM_API_KEY", "INPUT_LLM_API_KEY"];
const BASE_URL_ENV_VAR: &str = "LLM_BASE_URL";
const TIMEOUT_ENV_VAR: &str = "LLM_TIMEOUT";
const DEBUG_ENV_VAR: &str = "DEBUG";

/// Settings for a `PromptRunner`.
#[derive(Debug, Clone)]
pub struct Config {
    /// Model name; must match a registry entry.
    pub llm_model: String,
    pub llm_api_key: String,
    /// Overrides the provider API root, e.g. for a proxy.
    pub llm_base_url: Option<String>,
    pub timeout: Duration,
    /// Log token usage after each provider response.
    pub debug: bool,
}

impl Config {
    /// Build a config with defaults for everything but model and key.
    pub fn new(llm_model: impl Into<String>, llm_api_key: impl Into<String>) -> Self {
        Self {
            llm_model: llm_model.into(),
            llm_api_key: llm_api_key.into(),
            llm_base_url: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            debug: false,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with_model(None)
    }

    /// Load configuration, taking the model from `model` when given instead
    /// of the environment.
    pub fn from_env_with_model(model: Option<String>) -> Result<Self, ConfigError> {
        let llm_model = model
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .or_else(|| first_non_empty(MODEL_ENV_VARS))
            .ok_or(ConfigError::MissingVar(MODEL_ENV_VARS[0]))?;
        let llm_api_key = first_non_empty(API_KEY_ENV_VARS)
            .ok_or(ConfigError::MissingVar(API_KEY_ENV_VARS[0]))?;

        Ok(Self {
            llm_model,
            llm_api_key,
            llm_base_url: first_non_empty(&[BASE_URL_ENV_VAR]),
            timeout: get_timeout(),
            debug: debug_enabled(),
        })
    }
}

fn first_non_empty(names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        env::var(name)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}

/// Get the configured request timeout.
///
/// Reads `LLM_TIMEOUT` (seconds) if set, otherwise uses 300 seconds. Logs a
/// warning if the variable is set but is not a non-negative integer.
fn get_timeout() -> Duration {
    match env::var(TIMEOUT_ENV_VAR) {
        Ok(v) if !v.is_empty() => match v.parse::<u64>() {
            Ok(secs) => Duration::from_secs(secs),
            Err(_) => {
                warn!(
                    "Invalid {} value '{}', using default {}s",
                    TIMEOUT_ENV_VAR, v, DEFAULT_TIMEOUT_SECS
                );
                Duration::from_secs(DEFAULT_TIMEOUT_SECS)
            }
        },
        _ => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
    }
}

fn debug_enabled() -> bool {
    match env::var(DEBUG_ENV_VAR) {
        Ok(v) => {
            let v = v.trim();
            !(v.is_empty() || v == "0" || v.eq_ignore_ascii_case("false"))
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const ALL_VARS: &[&str] = &[
        "LLM_MODEL",
        "INPUT_LLM_MODEL",
        "LLM_API_KEY",
        "INPUT_LLM_API_KEY",
        "LLM_BASE_URL",
        "LLM_TIMEOUT",
        "DEBUG",
    ];

    fn with_env<F: FnOnce()>(vars: &[(&str, &str)], f: F) {
        let mut settings: Vec<(&str, Option<&str>)> =
            ALL_VARS.iter().map(|name| (*name, None)).collect();
        for (name, value) in vars {
            if let Some(slot) = settings.iter_mut().find(|(n, _)| n == name) {
                slot.1 = Some(*value);
            }
        }
        temp_env::with_vars(settings, f);
    }

    // ============================================
    // Required Values
    // ============================================

    #[test]
    #[serial]
    fn test_from_env_reads_model_and_key() {
        with_env(&[("LLM_MODEL", "gpt-4o"), ("LLM_API_KEY", "sk-test")], || {
            let config = Config::from_env().unwrap();
            assert_eq!(config.llm_model, "gpt-4o");
            assert_eq!(config.llm_api_key, "sk-test");
            assert!(config.llm_base_url.is_none());
            assert!(!config.debug);
        });
    }

    #[test]
    #[serial]
    fn test_from_env_falls_back_to_action_inputs() {
        with_env(
            &[("INPUT_LLM_MODEL", "o3-mini"), ("INPUT_LLM_API_KEY", "sk-input")],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.llm_model, "o3-mini");
                assert_eq!(config.llm_api_key, "sk-input");
            },
        );
    }

    #[test]
    #[serial]
    fn test_plain_variable_wins_over_input() {
        with_env(
            &[
                ("LLM_MODEL", "gpt-4o"),
                ("INPUT_LLM_MODEL", "o3-mini"),
                ("LLM_API_KEY", "k"),
            ],
            || {
                assert_eq!(Config::from_env().unwrap().llm_model, "gpt-4o");
            },
        );
    }

    #[test]
    #[serial]
    fn test_model_override_skips_env() {
        with_env(&[("LLM_MODEL", "gpt-4o"), ("LLM_API_KEY", "k")], || {
            let config = Config::from_env_with_model(Some("o1".to_string())).unwrap();
            assert_eq!(config.llm_model, "o1");
        });
        with_env(&[("LLM_API_KEY", "k")], || {
            let config = Config::from_env_with_model(Some("o1".to_string())).unwrap();
            assert_eq!(config.llm_model, "o1");
        });
    }

    #[test]
    #[serial]
    fn test_model_override_is_trimmed() {
        with_env(&[("LLM_MODEL", "o1"), ("LLM_API_KEY", "k")], || {
            let config = Config::from_env_with_model(Some(" gpt-4o \n".to_string())).unwrap();
            assert_eq!(config.llm_model, "gpt-4o");
        });
        with_env(&[("LLM_MODEL", "o1"), ("LLM_API_KEY", "k")], || {
            let config = Config::from_env_with_model(Some("   ".to_string())).unwrap();
            assert_eq!(config.llm_model, "o1");
        });
    }

    #[test]
    #[serial]
    fn test_missing_model_is_error() {
        with_env(&[("LLM_API_KEY", "k")], || {
            let err = Config::from_env().unwrap_err();
            assert!(matches!(err, ConfigError::MissingVar("LLM_MODEL")));
        });
    }

    #[test]
    #[serial]
    fn test_blank_key_is_missing() {
        with_env(&[("LLM_MODEL", "gpt-4o"), ("LLM_API_KEY", "  ")], || {
            let err = Config::from_env().unwrap_err();
            assert!(matches!(err, ConfigError::MissingVar("LLM_API_KEY")));
        });
    }

    // ============================================
    // Optional Values
    // ============================================

    #[test]
    #[serial]
    fn test_get_timeout_default() {
        with_env(&[], || {
            assert_eq!(get_timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        });
    }

    #[test]
    #[serial]
    fn test_get_timeout_from_env() {
        with_env(&[("LLM_TIMEOUT", "60")], || {
            assert_eq!(get_timeout(), Duration::from_secs(60));
        });
    }

    #[test]
    #[serial]
    fn test_get_timeout_invalid_env_uses_default() {
        with_env(&[("LLM_TIMEOUT", "soon")], || {
            assert_eq!(get_timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        });
    }

    #[test]
    #[serial]
    fn test_debug_flag_values() {
        for (value, expected) in [("1", true), ("true", true), ("0", false), ("false", false), ("", false)] {
            with_env(&[("DEBUG", value)], || {
                assert_eq!(debug_enabled(), expected, "DEBUG={:?}", value);
            });
        }
    }

    #[test]
    #[serial]
    fn test_base_url_from_env() {
        with_env(
            &[
                ("LLM_MODEL", "gpt-4o"),
                ("LLM_API_KEY", "k"),
                ("LLM_BASE_URL", "http://localhost:8080/v1"),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.llm_base_url.as_deref(), Some("http://localhost:8080/v1"));
            },
        );
    }
}
