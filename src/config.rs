/// Configuration management for the change pack agent
use crate::error::{Error, Result};
use crate::llm::LlmConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

pub const DEFAULT_MAX_LLM_CHARS: usize = 12_000;
pub const DEFAULT_MAX_REVISION_PASSES: u32 = 1;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmSettings,
    pub pipeline: PipelineSettings,
    pub output: OutputSettings,
}

/// Connection settings for an OpenAI-compatible gateway.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub base_url: String,
    /// Only ever read from the environment; never written back to disk.
    #[serde(skip_serializing)]
    pub api_key: String,
    pub model: String,
    pub timeout_seconds: u64,
    pub temperature: f32,
}

impl fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmSettings")
            .field("base_url", &self.base_url)
            .field("api_key", &if self.api_key.is_empty() { "" } else { "***" })
            .field("model", &self.model)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("temperature", &self.temperature)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Max diff chars passed into a single agent prompt.
    pub max_llm_chars: usize,
    /// Max additional revision passes triggered by the reviewer.
    pub max_revision_passes: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub out_dir: PathBuf,
    pub redact: bool,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            model: String::new(),
            timeout_seconds: 60,
            temperature: 0.2,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_llm_chars: DEFAULT_MAX_LLM_CHARS,
            max_revision_passes: DEFAULT_MAX_REVISION_PASSES,
        }
    }
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("docs/change-packs"),
            redact: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from a YAML file
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::Configuration(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        serde_yaml::from_str(&content).map_err(|e| {
            Error::Configuration(format!("Failed to parse config file {}: {}", path.display(), e))
        })
    }

    /// Resolve the effective configuration: defaults, then the optional file,
    /// then environment variables.
    pub async fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => Self::load_from_file(path).await?,
            None => Self::default(),
        };
        config.apply_env_with(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Override settings from environment variables if present.
    fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(base_url) = var("LLM_BASE_URL") {
            self.llm.base_url = base_url;
        }
        if let Some(api_key) = var("LLM_API_KEY") {
            self.llm.api_key = api_key;
        }
        if let Some(model) = var("LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(timeout) = var("LLM_TIMEOUT_SECONDS") {
            self.llm.timeout_seconds = parse_env("LLM_TIMEOUT_SECONDS", &timeout)?;
        }
        if let Some(temperature) = var("LLM_TEMPERATURE") {
            self.llm.temperature = parse_env("LLM_TEMPERATURE", &temperature)?;
        }
        if let Some(chars) = var("CHANGE_PACK_MAX_LLM_CHARS") {
            self.pipeline.max_llm_chars = parse_env("CHANGE_PACK_MAX_LLM_CHARS", &chars)?;
        }
        if let Some(passes) = var("CHANGE_PACK_MAX_REVISION_PASSES") {
            self.pipeline.max_revision_passes =
                parse_env("CHANGE_PACK_MAX_REVISION_PASSES", &passes)?;
        }
        if let Some(out_dir) = var("CHANGE_PACK_OUT_DIR") {
            self.output.out_dir = PathBuf::from(out_dir);
        }

        Ok(())
    }

    /// Validate configuration. Runs before any pipeline work begins.
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.llm.base_url.trim().is_empty() {
            missing.push("LLM_BASE_URL");
        }
        if self.llm.api_key.trim().is_empty() {
            missing.push("LLM_API_KEY");
        }
        if self.llm.model.trim().is_empty() {
            missing.push("LLM_MODEL");
        }
        if !missing.is_empty() {
            return Err(Error::Configuration(format!(
                "Missing LLM settings. Please set {}.",
                missing.join(", ")
            )));
        }

        if self.llm.timeout_seconds == 0 {
            return Err(Error::Configuration(
                "LLM timeout must be greater than 0".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(Error::Configuration(format!(
                "LLM temperature must be between 0 and 2, got {}",
                self.llm.temperature
            )));
        }

        if self.pipeline.max_llm_chars == 0 {
            return Err(Error::Configuration(
                "max_llm_chars must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn llm_config(&self) -> LlmConfig {
        LlmConfig {
            base_url: self.llm.base_url.clone(),
            api_key: self.llm.api_key.clone(),
            model: self.llm.model.clone(),
            timeout_seconds: self.llm.timeout_seconds,
            temperature: self.llm.temperature,
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: fmt::Display,
{
    value
        .parse()
        .map_err(|e| Error::Configuration(format!("Invalid value for {}: {} ({})", key, value, e)))
}

/// Commented starter file written by `change-pack init`.
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# Change pack agent configuration
#
# Credentials are read from the environment (or a .env file):
#   LLM_BASE_URL, LLM_API_KEY, LLM_MODEL

llm:
  # base_url: https://api.openai.com
  # model: gpt-4o-mini
  timeout_seconds: 60
  temperature: 0.2

pipeline:
  # Max diff characters passed into a single agent prompt
  max_llm_chars: 12000
  # Extra reviewer-triggered revision passes
  max_revision_passes: 1

output:
  out_dir: docs/change-packs
  redact: true
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::NamedTempFile;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn configured() -> AppConfig {
        let mut config = AppConfig::default();
        let vars = env(&[
            ("LLM_BASE_URL", "https://llm.internal"),
            ("LLM_API_KEY", "sk-test"),
            ("LLM_MODEL", "gpt-test"),
        ]);
        config.apply_env_with(|k| vars.get(k).cloned()).unwrap();
        config
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.pipeline.max_llm_chars, 12_000);
        assert_eq!(config.pipeline.max_revision_passes, 1);
        assert!(config.output.redact);
        assert_eq!(config.output.out_dir, PathBuf::from("docs/change-packs"));
    }

    #[test]
    fn test_missing_credentials_fail_fast() {
        let err = AppConfig::default().validate().unwrap_err();
        match err {
            Error::Configuration(msg) => {
                assert!(msg.contains("LLM_BASE_URL"));
                assert!(msg.contains("LLM_API_KEY"));
                assert!(msg.contains("LLM_MODEL"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_env_overrides_and_validation() {
        let config = configured();
        assert!(config.validate().is_ok());
        assert_eq!(config.llm.model, "gpt-test");

        let mut config = configured();
        let vars = env(&[("CHANGE_PACK_MAX_REVISION_PASSES", "3"), ("LLM_TEMPERATURE", "0.0")]);
        config.apply_env_with(|k| vars.get(k).cloned()).unwrap();
        assert_eq!(config.pipeline.max_revision_passes, 3);
        assert_eq!(config.llm.temperature, 0.0);
    }

    #[test]
    fn test_blank_env_values_are_ignored() {
        let mut config = configured();
        let vars = env(&[("LLM_MODEL", "   ")]);
        config.apply_env_with(|k| vars.get(k).cloned()).unwrap();
        assert_eq!(config.llm.model, "gpt-test");
    }

    #[test]
    fn test_unparseable_env_value_is_configuration_error() {
        let mut config = AppConfig::default();
        let vars = env(&[("CHANGE_PACK_MAX_LLM_CHARS", "lots")]);
        let err = config.apply_env_with(|k| vars.get(k).cloned()).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_invalid_numbers_rejected() {
        let mut config = configured();
        config.pipeline.max_llm_chars = 0;
        assert!(config.validate().is_err());

        let mut config = configured();
        config.llm.temperature = 3.5;
        assert!(config.validate().is_err());

        let mut config = configured();
        config.llm.timeout_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_hides_api_key() {
        let config = configured();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("sk-test"));
    }

    #[tokio::test]
    async fn test_serialized_config_omits_api_key() {
        let config = configured();
        let temp_file = NamedTempFile::new().unwrap();

        let written = serde_yaml::to_string(&config).unwrap();
        std::fs::write(temp_file.path(), &written).unwrap();
        assert!(!written.contains("sk-test"));

        let loaded = AppConfig::load_from_file(temp_file.path()).await.unwrap();
        assert_eq!(loaded.llm.model, "gpt-test");
        assert_eq!(loaded.llm.api_key, "");
        assert_eq!(loaded.pipeline.max_llm_chars, config.pipeline.max_llm_chars);
    }

    #[test]
    fn test_default_template_parses() {
        let config: AppConfig = serde_yaml::from_str(DEFAULT_CONFIG_TEMPLATE).unwrap();
        assert_eq!(config.pipeline.max_revision_passes, 1);
        assert_eq!(config.llm.timeout_seconds, 60);
    }
}
