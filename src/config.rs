use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Where the catalog keeps its records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Process memory only; records are lost on exit.
    Memory,
    /// SQLite database file.
    Sqlite,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Memory => write!(f, "memory"),
            BackendKind::Sqlite => write!(f, "sqlite"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(BackendKind::Memory),
            "sqlite" => Ok(BackendKind::Sqlite),
            _ => Err(format!(
                "Invalid backend '{}'. Valid options: memory, sqlite",
                s
            )),
        }
    }
}

/// Backoff for retrying transient storage failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 50,
            max_delay_ms: 2000,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based), doubling each time.
    pub fn delay_for_attempt(&self, attempt: u32) -> u64 {
        if attempt == 0 {
            return 0;
        }
        let factor = 1u64.checked_shl(attempt - 1).unwrap_or(u64::MAX);
        self.initial_delay_ms
            .saturating_mul(factor)
            .min(self.max_delay_ms)
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Storage backend
    pub backend: ConfigValue<BackendKind>,
    /// Path to the SQLite database (sqlite backend only)
    pub database_path: ConfigValue<PathBuf>,
    /// Address the server binds to
    pub host: ConfigValue<String>,
    /// Port the server listens on
    pub port: ConfigValue<u16>,
    /// Populate an empty catalog with demo records on startup
    pub seed: ConfigValue<bool>,
    /// Retry policy for transient storage failures
    pub retry: RetryPolicy,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    backend: Option<BackendKind>,
    database_path: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
    seed: Option<bool>,
    retry: Option<RetryPolicy>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = Self::defaults();

        // Try to load from config file
        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config.apply_file(&path, file_config);
            config.config_file = Some(path);
        }

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    fn defaults() -> Self {
        Self {
            backend: ConfigValue::new(BackendKind::Sqlite, ConfigSource::Default),
            database_path: ConfigValue::new(
                Self::default_data_dir().join("recipes.db"),
                ConfigSource::Default,
            ),
            host: ConfigValue::new("0.0.0.0".to_string(), ConfigSource::Default),
            port: ConfigValue::new(8080, ConfigSource::Default),
            seed: ConfigValue::new(false, ConfigSource::Default),
            retry: RetryPolicy::default(),
            config_file: None,
        }
    }

    fn apply_file(&mut self, path: &std::path::Path, file: ConfigFile) {
        if let Some(backend) = file.backend {
            self.backend = ConfigValue::new(backend, ConfigSource::File);
        }
        if let Some(db_path) = file.database_path {
            // Resolve relative paths against config file's directory
            let resolved = if db_path.is_relative() {
                path.parent().map(|p| p.join(&db_path)).unwrap_or(db_path)
            } else {
                db_path
            };
            self.database_path = ConfigValue::new(resolved, ConfigSource::File);
        }
        if let Some(host) = file.host {
            self.host = ConfigValue::new(host, ConfigSource::File);
        }
        if let Some(port) = file.port {
            self.port = ConfigValue::new(port, ConfigSource::File);
        }
        if let Some(seed) = file.seed {
            self.seed = ConfigValue::new(seed, ConfigSource::File);
        }
        if let Some(retry) = file.retry {
            self.retry = retry;
        }
    }

    /// Apply environment overrides. `lookup` is injectable so tests don't
    /// have to touch the process environment.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(value) = lookup("RECIPES_BACKEND") {
            let backend = value
                .parse()
                .map_err(|e| ConfigError::InvalidValue("RECIPES_BACKEND", e))?;
            self.backend = ConfigValue::new(backend, ConfigSource::Environment);
        }
        if let Some(value) = lookup("RECIPES_DATABASE_PATH") {
            self.database_path = ConfigValue::new(PathBuf::from(value), ConfigSource::Environment);
        }
        if let Some(value) = lookup("RECIPES_HOST") {
            self.host = ConfigValue::new(value, ConfigSource::Environment);
        }
        if let Some(value) = lookup("RECIPES_PORT") {
            let port = value.trim().parse().map_err(|_| {
                ConfigError::InvalidValue("RECIPES_PORT", format!("'{}' is not a port", value))
            })?;
            self.port = ConfigValue::new(port, ConfigSource::Environment);
        }
        if let Some(value) = lookup("RECIPES_SEED") {
            let seed = parse_flag(&value)
                .ok_or_else(|| ConfigError::InvalidValue("RECIPES_SEED", value.clone()))?;
            self.seed = ConfigValue::new(seed, ConfigSource::Environment);
        }
        Ok(())
    }

    /// Default config directory (platform-specific config dir + recipes/)
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("recipes")
    }

    /// Default data directory (platform-specific data dir + recipes/)
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("recipes")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }

    /// Socket address string for the server.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host.value, self.port.value)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    InvalidValue(&'static str, String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::InvalidValue(var, e) => {
                write!(f, "Invalid value for {}: {}", var, e)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::tempdir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::defaults();
        assert!(config
            .database_path
            .value
            .to_string_lossy()
            .contains("recipes.db"));
        assert_eq!(config.backend.value, BackendKind::Sqlite);
        assert_eq!(config.backend.source, ConfigSource::Default);
        assert_eq!(config.port.value, 8080);
        assert!(!config.seed.value);
        assert_eq!(config.listen_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "backend: memory").unwrap();
        writeln!(file, "database_path: /custom/path/db.sqlite").unwrap();
        writeln!(file, "port: 9000").unwrap();
        writeln!(file, "seed: true").unwrap();
        writeln!(file, "retry:").unwrap();
        writeln!(file, "  max_attempts: 5").unwrap();

        let mut config = Config::defaults();
        let contents = std::fs::read_to_string(&config_path).unwrap();
        config.apply_file(&config_path, serde_yaml::from_str(&contents).unwrap());

        assert_eq!(config.backend.value, BackendKind::Memory);
        assert_eq!(config.backend.source, ConfigSource::File);
        assert_eq!(
            config.database_path.value,
            PathBuf::from("/custom/path/db.sqlite")
        );
        assert_eq!(config.port.value, 9000);
        assert!(config.seed.value);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.initial_delay_ms, 50);
        assert_eq!(config.host.source, ConfigSource::Default);
    }

    #[test]
    fn test_relative_database_path_resolves_against_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        std::fs::write(&config_path, "database_path: data/recipes.db\n").unwrap();

        let mut config = Config::defaults();
        let contents = std::fs::read_to_string(&config_path).unwrap();
        config.apply_file(&config_path, serde_yaml::from_str(&contents).unwrap());

        assert_eq!(
            config.database_path.value,
            temp_dir.path().join("data/recipes.db")
        );
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = Config::defaults();
        config.port = ConfigValue::new(9000, ConfigSource::File);

        config
            .apply_env(env(&[
                ("RECIPES_PORT", "7000"),
                ("RECIPES_BACKEND", "Memory"),
                ("RECIPES_SEED", "yes"),
            ]))
            .unwrap();

        assert_eq!(config.port.value, 7000);
        assert_eq!(config.port.source, ConfigSource::Environment);
        assert_eq!(config.backend.value, BackendKind::Memory);
        assert!(config.seed.value);
    }

    #[test]
    fn test_invalid_env_values() {
        let mut config = Config::defaults();
        let err = config
            .apply_env(env(&[("RECIPES_PORT", "not-a-port")]))
            .unwrap_err();
        assert!(err.to_string().contains("RECIPES_PORT"));

        let err = config
            .apply_env(env(&[("RECIPES_BACKEND", "mongo")]))
            .unwrap_err();
        assert!(err.to_string().contains("Valid options: memory, sqlite"));
    }

    #[test]
    fn test_invalid_yaml_error() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "invalid: yaml: content: [").unwrap();

        let result = Config::load(Some(config_path));
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_retry_policy_delay_calculation() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for_attempt(0), 0);
        assert_eq!(policy.delay_for_attempt(1), 50);
        assert_eq!(policy.delay_for_attempt(2), 100);
        assert_eq!(policy.delay_for_attempt(3), 200);

        // Should cap at max_delay_ms
        assert_eq!(policy.delay_for_attempt(10), 2000);
        assert_eq!(policy.delay_for_attempt(200), 2000);
    }

    #[test]
    fn test_backend_kind_from_str() {
        assert_eq!("sqlite".parse::<BackendKind>().unwrap(), BackendKind::Sqlite);
        assert_eq!(" MEMORY ".parse::<BackendKind>().unwrap(), BackendKind::Memory);
        assert!("".parse::<BackendKind>().is_err());
    }
}
