//! Configuration types.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::llm::provider::DEFAULT_MAX_TOKENS;
use crate::llm::{DEFAULT_BASE_URL, LlmConfig};
use crate::pipeline::PipelineOptions;
use crate::pipeline::verifier::VerifierConfig;

pub const DEFAULT_MODEL: &str = "openai/gpt-oss-120b";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Settings for one extraction run, read from the environment.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// `GROQ_API_KEY`, required.
    pub api_key: SecretString,
    /// `MODEL_CLASSIFY`, used for all three stages.
    pub model: String,
    /// `LLM_BASE_URL`
    pub base_url: String,
    /// `LLM_MAX_TOKENS`, output cap for every stage's call.
    pub max_tokens: u32,
    /// `LLM_TIMEOUT_SECS`
    pub timeout: Duration,
    /// `VERIFY_WITH_SOURCE`, send the email text to the verifier.
    pub verify_with_source: bool,
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_key = get("GROQ_API_KEY")
            .ok_or_else(|| ConfigError::MissingEnvVar("GROQ_API_KEY".to_string()))?;

        let model = get("MODEL_CLASSIFY").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let base_url = get("LLM_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let max_tokens = match get("LLM_MAX_TOKENS") {
            Some(raw) => parse_number::<u32>("LLM_MAX_TOKENS", &raw)?,
            None => DEFAULT_MAX_TOKENS,
        };
        let timeout_secs = match get("LLM_TIMEOUT_SECS") {
            Some(raw) => parse_number::<u64>("LLM_TIMEOUT_SECS", &raw)?,
            None => DEFAULT_TIMEOUT_SECS,
        };
        let verify_with_source = match get("VERIFY_WITH_SOURCE") {
            Some(raw) => parse_flag("VERIFY_WITH_SOURCE", &raw)?,
            None => true,
        };

        Ok(Self {
            api_key: SecretString::from(api_key),
            model,
            base_url,
            max_tokens,
            timeout: Duration::from_secs(timeout_secs),
            verify_with_source,
        })
    }

    pub fn llm_config(&self) -> LlmConfig {
        LlmConfig {
            provider_name: provider_name_for(&self.base_url),
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone(),
            timeout: self.timeout,
        }
    }

    pub fn pipeline_options(&self, deduplicate: bool) -> PipelineOptions {
        PipelineOptions {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            verifier: VerifierConfig {
                include_source: self.verify_with_source,
            },
            deduplicate,
        }
    }
}

fn provider_name_for(base_url: &str) -> String {
    if base_url.contains("groq.com") {
        "groq".to_string()
    } else {
        "openai-compatible".to_string()
    }
}

fn parse_number<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
    T::Err: std::fmt::Display,
{
    let value: T = raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        message: e.to_string(),
    })?;
    if value <= T::default() {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}

fn parse_flag(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected true/false, got {other:?}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<PipelineConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        PipelineConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn api_key_is_required() {
        let err = config(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "GROQ_API_KEY"));
        assert!(config(&[("GROQ_API_KEY", "  ")]).is_err());
    }

    #[test]
    fn defaults() {
        let cfg = config(&[("GROQ_API_KEY", "gsk_test")]).unwrap();
        assert_eq!(cfg.api_key.expose_secret(), "gsk_test");
        assert_eq!(cfg.model, DEFAULT_MODEL);
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.max_tokens, 800);
        assert_eq!(cfg.timeout, Duration::from_secs(120));
        assert!(cfg.verify_with_source);
        assert_eq!(cfg.llm_config().provider_name, "groq");
    }

    #[test]
    fn overrides() {
        let cfg = config(&[
            ("GROQ_API_KEY", "k"),
            ("MODEL_CLASSIFY", "llama-3.1-8b-instant"),
            ("LLM_BASE_URL", "http://localhost:8000/v1/"),
            ("LLM_MAX_TOKENS", "1024"),
            ("LLM_TIMEOUT_SECS", "5"),
            ("VERIFY_WITH_SOURCE", "false"),
        ])
        .unwrap();
        assert_eq!(cfg.model, "llama-3.1-8b-instant");
        assert_eq!(cfg.base_url, "http://localhost:8000/v1");
        assert_eq!(cfg.llm_config().provider_name, "openai-compatible");

        let options = cfg.pipeline_options(true);
        assert_eq!(options.max_tokens, 1024);
        assert!(!options.verifier.include_source);
        assert!(options.deduplicate);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = config(&[("GROQ_API_KEY", "k"), ("LLM_MAX_TOKENS", "lots")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "LLM_MAX_TOKENS"));
        assert!(config(&[("GROQ_API_KEY", "k"), ("LLM_TIMEOUT_SECS", "0")]).is_err());
        assert!(config(&[("GROQ_API_KEY", "k"), ("VERIFY_WITH_SOURCE", "maybe")]).is_err());
    }
}
