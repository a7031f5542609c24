use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use log::debug;

use crate::error::{Error, Result};

pub const ENV_PREFIX: &str = "CV_TAILOR_";

/// Which LLM backend answers the tailoring prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Provider {
    #[default]
    Ollama,
    Gemini,
    Mock,
}

impl FromStr for Provider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "gemini" => Ok(Self::Gemini),
            "mock" => Ok(Self::Mock),
            other => Err(Error::Config(format!(
                "unsupported LLM provider '{other}' (expected ollama, gemini or mock)"
            ))),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ollama => "ollama",
            Self::Gemini => "gemini",
            Self::Mock => "mock",
        })
    }
}

/// Process-wide settings, loaded once at startup and passed down explicitly.
#[derive(Debug, Clone)]
pub struct Config {
    pub provider: Provider,
    pub model: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub static_sections: PathBuf,
    pub base_resume: PathBuf,
    pub output_dir: PathBuf,
    pub theme: String,
    pub rendercv_bin: String,
}

impl Config {
    /// Read configuration from `CV_TAILOR_*` environment variables, honoring
    /// a `.env` file in the working directory.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let config = Self::from_lookup(|key| std::env::var(key).ok())?;
        debug!("loaded configuration: {config:#?}");
        Ok(config)
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| get(&format!("{ENV_PREFIX}{name}"));

        let provider = match var("PROVIDER") {
            Some(value) => value.parse()?,
            None => Provider::default(),
        };

        let config = Self {
            provider,
            model: var("MODEL").unwrap_or_else(|| default_model(provider).to_string()),
            base_url: var("BASE_URL").unwrap_or_else(|| "http://localhost:11434".to_string()),
            api_key: var("API_KEY"),
            temperature: parse_var(var("TEMPERATURE"), 0.3, "TEMPERATURE")?,
            max_tokens: parse_var(var("MAX_TOKENS"), 4000, "MAX_TOKENS")?,
            static_sections: var("STATIC_SECTIONS")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("source/static_sections.yaml")),
            base_resume: var("BASE_RESUME")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("source/base_resume.yaml")),
            output_dir: var("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("output")),
            theme: var("THEME").unwrap_or_else(|| "engineeringresumes".to_string()),
            rendercv_bin: var("RENDERCV_BIN").unwrap_or_else(|| "rendercv".to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.provider == Provider::Gemini && self.api_key.is_none() {
            return Err(Error::Config(format!(
                "{ENV_PREFIX}API_KEY must be set when using the gemini provider"
            )));
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(Error::Config(format!(
                "{ENV_PREFIX}TEMPERATURE must be in [0, 1], got {}",
                self.temperature
            )));
        }
        Ok(())
    }
}

fn default_model(provider: Provider) -> &'static str {
    match provider {
        Provider::Ollama => "llama3.1:8b",
        Provider::Gemini => "gemini-2.0-flash",
        Provider::Mock => "mock",
    }
}

fn parse_var<T: FromStr>(value: Option<String>, default: T, name: &str) -> Result<T> {
    match value {
        Some(raw) => raw
            .parse()
            .map_err(|_| Error::Config(format!("{ENV_PREFIX}{name} has invalid value '{raw}'"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serial_test::serial;

    use super::*;

    fn from_map(vars: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (format!("{ENV_PREFIX}{k}"), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_select_ollama() {
        let config = from_map(&[]).unwrap();
        assert_eq!(config.provider, Provider::Ollama);
        assert_eq!(config.model, "llama3.1:8b");
        assert_eq!(config.base_url, "http://localhost:11434");
        assert_eq!(config.theme, "engineeringresumes");
    }

    #[test]
    fn gemini_requires_api_key() {
        let err = from_map(&[("PROVIDER", "gemini")]).unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let config = from_map(&[("PROVIDER", "gemini"), ("API_KEY", "secret")]).unwrap();
        assert_eq!(config.provider, Provider::Gemini);
        assert_eq!(config.model, "gemini-2.0-flash");
    }

    #[test]
    fn temperature_is_bounded() {
        assert!(from_map(&[("TEMPERATURE", "1.5")]).is_err());
        assert!(from_map(&[("TEMPERATURE", "warm")]).is_err());
        let config = from_map(&[("TEMPERATURE", "0.7")]).unwrap();
        assert!((config.temperature - 0.7).abs() < 1e-6);
    }

    #[test]
    fn unknown_provider_is_rejected() {
        assert!(matches!(
            from_map(&[("PROVIDER", "openai")]),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn overrides_win_over_defaults() {
        let config = from_map(&[
            ("PROVIDER", "mock"),
            ("MODEL", "test-model"),
            ("OUTPUT_DIR", "/tmp/resumes"),
            ("MAX_TOKENS", "2048"),
        ])
        .unwrap();

        assert_eq!(config.provider, Provider::Mock);
        assert_eq!(config.model, "test-model");
        assert_eq!(config.output_dir, PathBuf::from("/tmp/resumes"));
        assert_eq!(config.max_tokens, 2048);
    }

    #[test]
    #[serial]
    fn from_env_reads_process_environment() {
        unsafe {
            std::env::set_var("CV_TAILOR_PROVIDER", "mock");
            std::env::set_var("CV_TAILOR_MODEL", "env-model");
        }

        let config = Config::from_env().unwrap();
        assert_eq!(config.provider, Provider::Mock);
        assert_eq!(config.model, "env-model");

        unsafe {
            std::env::remove_var("CV_TAILOR_PROVIDER");
            std::env::remove_var("CV_TAILOR_MODEL");
        }
    }
}
