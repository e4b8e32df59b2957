use serde::{Deserialize, Serialize};

use crate::seed::ReseedMode;

pub const ENV_DATABASE_URL: &str = "MOVIECAT_DATABASE_URL";
pub const ENV_OMDB_API_KEY: &str = "OMDB_API_KEY";
pub const ENV_TEXTGEN_API_KEY: &str = "MOVIECAT_TEXTGEN_API_KEY";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub listen: ListenConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub textgen: Option<TextGenConfig>,
    #[serde(default)]
    pub omdb: OmdbConfig,
    #[serde(default)]
    pub blobs: BlobConfig,
    #[serde(default)]
    pub seed: SeedConfig,
    #[serde(skip)]
    pub debug_logs: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListenConfig {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default = "default_port")]
    pub port: String,
    #[serde(default)]
    pub tlscert: Option<String>,
    #[serde(default)]
    pub tlskey: Option<String>,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            address: None,
            port: default_port(),
            tlscert: None,
            tlskey: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TextGenConfig {
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_textgen_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OmdbConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_omdb_url")]
    pub base_url: String,
    #[serde(default = "default_request_delay")]
    pub request_delay_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for OmdbConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_omdb_url(),
            request_delay_ms: default_request_delay(),
            max_retries: default_max_retries(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BlobConfig {
    #[serde(default)]
    pub directory: Option<String>,
    #[serde(default = "default_blob_base_url")]
    pub base_url: String,
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            directory: None,
            base_url: default_blob_base_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SeedConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default)]
    pub mode: ReseedMode,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            mode: ReseedMode::default(),
        }
    }
}

fn default_port() -> String {
    "8080".to_string()
}

fn default_database_url() -> String {
    "moviecat.db".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_tokens() -> u32 {
    150
}

fn default_temperature() -> f32 {
    0.7
}

fn default_textgen_timeout() -> u64 {
    30
}

fn default_omdb_url() -> String {
    "http://www.omdbapi.com/".to_string()
}

fn default_request_delay() -> u64 {
    300
}

fn default_max_retries() -> u32 {
    2
}

fn default_blob_base_url() -> String {
    "http://localhost:8080/movie-images".to_string()
}

fn default_data_dir() -> String {
    "data".to_string()
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(path.to_string(), e))?;

        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_string(), e))?;

        Ok(config)
    }

    /// Read the config file if one is given, then apply environment overrides.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_DATABASE_URL) {
            self.database.url = url;
        }
        if let Some(key) = lookup(ENV_OMDB_API_KEY) {
            self.omdb.api_key = Some(key);
        }
        if let Some(key) = lookup(ENV_TEXTGEN_API_KEY) {
            if let Some(ref mut textgen) = self.textgen {
                textgen.api_key = Some(key);
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    ReadError(String, std::io::Error),
    #[error("Failed to parse config file {0}: {1}")]
    ParseError(String, serde_yaml::Error),
    #[error("Missing configuration: {0}")]
    Missing(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_parse_minimal() {
        let config: Config = serde_yaml::from_str("listen:\n  port: \"9000\"\n").unwrap();
        assert_eq!(config.listen.port, "9000");
        assert_eq!(config.database.url, "moviecat.db");
        assert!(config.textgen.is_none());
        assert_eq!(config.omdb.max_retries, 2);
        assert_eq!(config.seed.mode, ReseedMode::Atomic);
    }

    #[test]
    fn test_parse_full() {
        let yaml = r#"
database:
  url: "sqlite:///var/lib/moviecat/catalog.db"
textgen:
  endpoint: "https://llm.example.com/v1/chat/completions"
  max_tokens: 200
omdb:
  request_delay_ms: 500
blobs:
  directory: "/srv/posters"
  base_url: "https://cdn.example.com/posters"
seed:
  data_dir: "/srv/seed"
  mode: two-phase
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        let textgen = config.textgen.unwrap();
        assert_eq!(textgen.max_tokens, 200);
        assert_eq!(textgen.timeout_secs, 30);
        assert_eq!(config.omdb.request_delay_ms, 500);
        assert_eq!(config.blobs.directory.as_deref(), Some("/srv/posters"));
        assert_eq!(config.seed.mode, ReseedMode::TwoPhase);
    }

    #[test]
    fn test_example_config_parses() {
        let config: Config = serde_yaml::from_str(include_str!("../moviecat.example.yaml")).unwrap();
        assert_eq!(config.listen.port, "8080");
        assert!(config.textgen.is_some());
        assert_eq!(config.seed.mode, ReseedMode::Atomic);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_DATABASE_URL, "sqlite::memory:"),
            (ENV_OMDB_API_KEY, "omdb-key"),
            (ENV_TEXTGEN_API_KEY, "llm-key"),
        ]
        .into_iter()
        .collect();

        let mut config: Config =
            serde_yaml::from_str("textgen:\n  endpoint: \"http://localhost/v1\"\n").unwrap();
        config.apply_env(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.omdb.api_key.as_deref(), Some("omdb-key"));
        assert_eq!(config.textgen.unwrap().api_key.as_deref(), Some("llm-key"));
    }
}
