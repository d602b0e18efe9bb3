use crate::cli::{Cli, OutputFormat, VerbosityLevel};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Trait for abstracting environment variable access
pub trait EnvProvider {
    fn get(&self, key: &str) -> Option<String>;
}

/// System environment variable provider for production use
pub struct SystemEnvProvider;

impl EnvProvider for SystemEnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment variable error: {0}")]
    Environment(String),

    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub schemas: SchemaConfig,
    pub middleware: MiddlewareConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

/// Description documents compiled at startup
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct SchemaConfig {
    /// Document paths, in merge order
    pub documents: Vec<PathBuf>,
}

/// HTTP middleware configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MiddlewareConfig {
    /// Status returned for invalid requests
    pub failure_status: u16,
    /// Largest request body read for validation
    pub body_limit_bytes: usize,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct OutputConfig {
    /// Output format
    pub format: OutputFormat,
    /// Verbose output
    pub verbose: bool,
    /// Quiet mode (failures only)
    pub quiet: bool,
}

impl OutputConfig {
    /// Quiet wins over verbose
    pub fn verbosity(&self) -> VerbosityLevel {
        if self.quiet {
            VerbosityLevel::Quiet
        } else if self.verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` wins when set
    pub level: String,
    /// JSON log lines instead of human-readable ones
    pub json: bool,
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            failure_status: 400,
            body_limit_bytes: crate::middleware::DEFAULT_BODY_LIMIT,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json: false,
        }
    }
}

/// Configuration manager for loading and merging configurations
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration with precedence: file -> environment -> CLI
    pub async fn load_config(cli: &Cli) -> Result<Config> {
        let mut config = match &cli.config {
            Some(config_path) => Self::load_from_file(config_path).await?,
            None => Self::find_config_file().await?.unwrap_or_default(),
        };

        config = Self::apply_environment_overrides(config)?;

        // CLI arguments have the highest precedence
        config = Self::merge_with_cli(config, cli);

        Self::validate_config(&config)?;

        Ok(config)
    }

    /// Load configuration from a file (TOML or JSON)
    pub async fn load_from_file(path: &Path) -> Result<Config> {
        let content = tokio::fs::read_to_string(path).await?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(toml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => {
                // Try to parse as TOML first, then JSON
                if let Ok(config) = toml::from_str::<Config>(&content) {
                    Ok(config)
                } else {
                    Ok(serde_json::from_str(&content)?)
                }
            }
        }
    }

    /// Find configuration file in standard locations
    pub async fn find_config_file() -> Result<Option<Config>> {
        let config_names = [
            "validate-api.toml",
            "validate-api.json",
            ".validate-api.toml",
            ".validate-api.json",
        ];

        // Check current directory first
        for name in &config_names {
            let path = PathBuf::from(name);
            if path.exists() {
                return Ok(Some(Self::load_from_file(&path).await?));
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let app_config_dir = config_dir.join("validate-api");
            for name in &config_names {
                let path = app_config_dir.join(name);
                if path.exists() {
                    return Ok(Some(Self::load_from_file(&path).await?));
                }
            }
        }

        Ok(None)
    }

    /// Apply environment variable overrides using the system environment
    pub fn apply_environment_overrides(config: Config) -> Result<Config> {
        Self::apply_environment_overrides_with(&SystemEnvProvider, config)
    }

    /// Apply environment variable overrides with a custom environment provider
    pub fn apply_environment_overrides_with(
        env: &impl EnvProvider,
        mut config: Config,
    ) -> Result<Config> {
        if let Some(documents) = env.get("VALIDATE_API_SCHEMAS") {
            config.schemas.documents = documents
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .collect();
        }

        if let Some(status) = parse_env(env, "VALIDATE_API_FAILURE_STATUS")? {
            config.middleware.failure_status = status;
        }

        if let Some(limit) = parse_env(env, "VALIDATE_API_BODY_LIMIT")? {
            config.middleware.body_limit_bytes = limit;
        }

        if let Some(verbose) = parse_env(env, "VALIDATE_API_VERBOSE")? {
            config.output.verbose = verbose;
        }

        if let Some(quiet) = parse_env(env, "VALIDATE_API_QUIET")? {
            config.output.quiet = quiet;
        }

        if let Some(format) = env.get("VALIDATE_API_FORMAT") {
            config.output.format = match format.to_lowercase().as_str() {
                "human" => OutputFormat::Human,
                "json" => OutputFormat::Json,
                _ => {
                    return Err(ConfigError::Environment(format!(
                        "Invalid VALIDATE_API_FORMAT value: {}",
                        format
                    )));
                }
            };
        }

        if let Some(level) = env.get("VALIDATE_API_LOG_LEVEL") {
            config.logging.level = level;
        }

        if let Some(json) = parse_env(env, "VALIDATE_API_LOG_JSON")? {
            config.logging.json = json;
        }

        Ok(config)
    }

    /// Merge CLI arguments with configuration (CLI takes precedence)
    pub fn merge_with_cli(mut config: Config, cli: &Cli) -> Config {
        if !cli.schemas.is_empty() {
            config.schemas.documents = cli.schemas.clone();
        }

        if let Some(format) = cli.output_format {
            config.output.format = format;
        }
        if cli.verbose {
            config.output.verbose = true;
            config.output.quiet = false;
        }
        if cli.quiet {
            config.output.quiet = true;
            config.output.verbose = false;
        }

        if let Some(level) = &cli.log_level {
            config.logging.level = level.clone();
        }
        if cli.log_json {
            config.logging.json = true;
        }

        config
    }

    /// Validate configuration values
    pub fn validate_config(config: &Config) -> Result<()> {
        if !(400..=599).contains(&config.middleware.failure_status) {
            return Err(ConfigError::Validation(format!(
                "Failure status must be between 400 and 599, got {}",
                config.middleware.failure_status
            )));
        }

        if config.middleware.body_limit_bytes == 0 {
            return Err(ConfigError::Validation(
                "Body limit must be greater than 0".to_string(),
            ));
        }

        if config.output.verbose && config.output.quiet {
            return Err(ConfigError::Validation(
                "Cannot enable both verbose and quiet modes".to_string(),
            ));
        }

        Ok(())
    }

    /// Documents to compile; an empty list is an error once they are needed
    pub fn require_documents(config: &Config) -> Result<&[PathBuf]> {
        if config.schemas.documents.is_empty() {
            return Err(ConfigError::Validation(
                "At least one description document must be specified".to_string(),
            ));
        }
        Ok(&config.schemas.documents)
    }
}

fn parse_env<T: FromStr>(env: &impl EnvProvider, key: &str) -> Result<Option<T>> {
    env.get(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Environment(format!("Invalid {} value: {}", key, value)))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    /// Mock environment variable provider for testing
    #[derive(Default)]
    struct MockEnvProvider {
        vars: HashMap<String, String>,
    }

    impl MockEnvProvider {
        fn new() -> Self {
            Self::default()
        }

        fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
            self.vars.insert(key.into(), value.into());
        }
    }

    impl EnvProvider for MockEnvProvider {
        fn get(&self, key: &str) -> Option<String> {
            self.vars.get(key).cloned()
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!(config.schemas.documents.is_empty());
        assert_eq!(config.middleware.failure_status, 400);
        assert_eq!(config.middleware.body_limit_bytes, 2 * 1024 * 1024);
        assert_eq!(config.output.format, OutputFormat::Human);
        assert!(!config.output.verbose);
        assert!(!config.output.quiet);
        assert_eq!(config.logging.level, "warn");
        assert!(!config.logging.json);
        assert!(ConfigManager::validate_config(&config).is_ok());
    }

    #[tokio::test]
    async fn test_load_toml_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        let toml_content = r#"
[schemas]
documents = ["swagger.json", "extra.yaml"]

[middleware]
failure_status = 422

[logging]
level = "debug"
json = true
"#;
        fs::write(&config_path, toml_content).unwrap();

        let config = ConfigManager::load_from_file(&config_path).await.unwrap();
        assert_eq!(
            config.schemas.documents,
            vec![PathBuf::from("swagger.json"), PathBuf::from("extra.yaml")]
        );
        assert_eq!(config.middleware.failure_status, 422);
        // Omitted keys keep their defaults
        assert_eq!(config.middleware.body_limit_bytes, 2 * 1024 * 1024);
        assert_eq!(config.output, OutputConfig::default());
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
    }

    #[tokio::test]
    async fn test_load_json_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        let json_content = r#"{
            "schemas": {"documents": ["swagger.yaml"]},
            "output": {"format": "json", "verbose": true}
        }"#;
        fs::write(&config_path, json_content).unwrap();

        let config = ConfigManager::load_from_file(&config_path).await.unwrap();
        assert_eq!(config.schemas.documents, vec![PathBuf::from("swagger.yaml")]);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(config.output.verbose);
    }

    #[tokio::test]
    async fn test_extensionless_config_falls_back_to_json() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("validate-api");
        fs::write(&config_path, r#"{"middleware": {"failure_status": 409}}"#).unwrap();

        let config = ConfigManager::load_from_file(&config_path).await.unwrap();
        assert_eq!(config.middleware.failure_status, 409);
    }

    #[tokio::test]
    async fn test_unsupported_file_format() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.xml");
        fs::write(&config_path, "<config/>").unwrap();

        let result = ConfigManager::load_from_file(&config_path).await;
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(ext)) if ext == "xml"));
    }

    #[tokio::test]
    async fn test_invalid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "[middleware\nfailure_status = ").unwrap();

        let result = ConfigManager::load_from_file(&config_path).await;
        assert!(matches!(result, Err(ConfigError::TomlParsing(_))));
    }

    #[tokio::test]
    async fn test_invalid_json() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        fs::write(&config_path, "{\"schemas\": ").unwrap();

        let result = ConfigManager::load_from_file(&config_path).await;
        assert!(matches!(result, Err(ConfigError::JsonParsing(_))));
    }

    #[test]
    fn test_environment_overrides() {
        let mut mock_env = MockEnvProvider::new();
        mock_env.set("VALIDATE_API_SCHEMAS", "a.json, b.yaml,");
        mock_env.set("VALIDATE_API_FAILURE_STATUS", "422");
        mock_env.set("VALIDATE_API_BODY_LIMIT", "1024");
        mock_env.set("VALIDATE_API_FORMAT", "JSON");
        mock_env.set("VALIDATE_API_QUIET", "true");
        mock_env.set("VALIDATE_API_LOG_LEVEL", "validate_api=debug");
        mock_env.set("VALIDATE_API_LOG_JSON", "true");

        let config =
            ConfigManager::apply_environment_overrides_with(&mock_env, Config::default()).unwrap();

        assert_eq!(
            config.schemas.documents,
            vec![PathBuf::from("a.json"), PathBuf::from("b.yaml")]
        );
        assert_eq!(config.middleware.failure_status, 422);
        assert_eq!(config.middleware.body_limit_bytes, 1024);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(config.output.quiet);
        assert_eq!(config.logging.level, "validate_api=debug");
        assert!(config.logging.json);
    }

    #[test]
    fn test_invalid_environment_values() {
        let mut mock_env = MockEnvProvider::new();
        mock_env.set("VALIDATE_API_FAILURE_STATUS", "bad-request");

        let result = ConfigManager::apply_environment_overrides_with(&mock_env, Config::default());
        assert!(matches!(result, Err(ConfigError::Environment(msg)) if msg.contains("VALIDATE_API_FAILURE_STATUS")));

        let mut mock_env = MockEnvProvider::new();
        mock_env.set("VALIDATE_API_FORMAT", "xml");
        assert!(
            ConfigManager::apply_environment_overrides_with(&mock_env, Config::default()).is_err()
        );
    }

    #[test]
    fn test_merge_with_cli() {
        let mut config = Config::default();
        config.schemas.documents = vec![PathBuf::from("from-file.json")];
        config.output.quiet = true;

        let cli = Cli::try_parse_from([
            "validate-api",
            "-s",
            "cli.yaml",
            "-v",
            "--format",
            "json",
            "--log-level",
            "trace",
            "routes",
        ])
        .unwrap();

        let merged = ConfigManager::merge_with_cli(config, &cli);
        assert_eq!(merged.schemas.documents, vec![PathBuf::from("cli.yaml")]);
        assert!(merged.output.verbose);
        assert!(!merged.output.quiet);
        assert_eq!(merged.output.format, OutputFormat::Json);
        assert_eq!(merged.logging.level, "trace");
    }

    #[test]
    fn test_output_verbosity() {
        let mut output = OutputConfig::default();
        assert_eq!(output.verbosity(), VerbosityLevel::Normal);

        output.verbose = true;
        assert_eq!(output.verbosity(), VerbosityLevel::Verbose);

        output.quiet = true;
        assert_eq!(output.verbosity(), VerbosityLevel::Quiet);
    }

    #[test]
    fn test_cli_without_flags_keeps_config() {
        let mut config = Config::default();
        config.schemas.documents = vec![PathBuf::from("from-file.json")];
        config.middleware.failure_status = 422;

        let cli = Cli::try_parse_from(["validate-api", "routes"]).unwrap();
        let merged = ConfigManager::merge_with_cli(config.clone(), &cli);
        assert_eq!(merged, config);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.middleware.failure_status = 200;
        assert!(ConfigManager::validate_config(&config).is_err());

        config.middleware.failure_status = 599;
        assert!(ConfigManager::validate_config(&config).is_ok());

        config.middleware.body_limit_bytes = 0;
        assert!(ConfigManager::validate_config(&config).is_err());

        let mut config = Config::default();
        config.output.verbose = true;
        config.output.quiet = true;
        assert!(matches!(
            ConfigManager::validate_config(&config),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_require_documents() {
        let mut config = Config::default();
        assert!(ConfigManager::require_documents(&config).is_err());

        config.schemas.documents.push(PathBuf::from("swagger.json"));
        assert_eq!(ConfigManager::require_documents(&config).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_load_config_integration() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("validate-api.toml");
        fs::write(
            &config_path,
            "[schemas]\ndocuments = [\"swagger.json\"]\n[middleware]\nfailure_status = 422\n",
        )
        .unwrap();

        let cli = Cli::try_parse_from([
            "validate-api",
            "--config",
            config_path.to_str().unwrap(),
            "-q",
            "routes",
        ])
        .unwrap();

        let config = ConfigManager::load_config(&cli).await.unwrap();
        assert_eq!(config.schemas.documents, vec![PathBuf::from("swagger.json")]);
        assert_eq!(config.middleware.failure_status, 422);
        assert!(config.output.quiet);
    }
}
