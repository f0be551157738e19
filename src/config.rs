use crate::{errors::ServiceError, models::StructuralRole, rules::RuleTables};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const CONFIG_DIR: &str = "config";
const DEFAULT_RULES_PATH: &str = "config/bom_rules.toml";
const DEFAULT_CACHE_MAX_ENTRIES: usize = 1000;

/// Per-build BOM cache settings
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Cache generated BOMs per (order, build)
    #[serde(default = "default_true_bool")]
    pub enabled: bool,

    /// Maximum number of cached builds; the oldest entry is evicted first
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: default_cache_max_entries(),
        }
    }
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database holding the catalog and stored build configurations
    pub database_url: String,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Mapping tables file (TOML or JSON)
    #[serde(default = "default_rules_path")]
    #[validate(length(min = 1, message = "Rules path must not be empty"))]
    pub rules_path: String,

    /// BOM cache configuration
    #[serde(default)]
    #[validate]
    pub cache: CacheConfig,

    /// Overrides the category priority of the rule tables
    #[serde(default)]
    pub category_priority: Option<Vec<StructuralRole>>,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// DB connect timeout (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
}

impl AppConfig {
    pub fn new(database_url: String, environment: String) -> Self {
        Self {
            database_url,
            environment,
            log_level: default_log_level(),
            log_json: false,
            rules_path: default_rules_path(),
            cache: CacheConfig::default(),
            category_priority: None,
            db_max_connections: default_db_max_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
        }
    }

    pub fn rules_path(&self) -> &Path {
        Path::new(&self.rules_path)
    }

    /// Loads the rule tables, applying the configured priority override.
    pub fn load_rules(&self) -> Result<RuleTables, ServiceError> {
        let mut rules = RuleTables::load(self.rules_path())?;
        if let Some(priority) = &self.category_priority {
            rules.category_priority = Some(priority.clone());
        }
        Ok(rules)
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.cache.enabled && self.cache.max_entries == 0 {
            let mut err = ValidationError::new("cache_max_entries");
            err.message = Some("Cache capacity must be at least 1 when caching is enabled".into());
            errors.add("cache", err);
        }
        if self.environment.trim().is_empty() {
            let mut err = ValidationError::new("environment");
            err.message = Some("Environment must not be empty".into());
            errors.add("environment", err);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Default value functions
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_rules_path() -> String {
    DEFAULT_RULES_PATH.to_string()
}

fn default_cache_max_entries() -> usize {
    DEFAULT_CACHE_MAX_ENTRIES
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_connect_timeout_secs() -> u64 {
    30
}

fn default_true_bool() -> bool {
    true
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::fmt;

    let default_directive = format!("sink_bom={}", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt().with_env_filter(filter_directive).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter_directive).try_init();
    }
}

/// Loads application configuration from the working directory.
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    load_config_from(Path::new("."))
}

/// Same as [`load_config`], resolving the `config` directory under `base_dir`.
pub fn load_config_from(base_dir: &Path) -> Result<AppConfig, AppConfigError> {
    // Support both RUN_ENV and APP_ENV for selecting config profile
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    let config_dir: PathBuf = base_dir.join(CONFIG_DIR);
    if !config_dir.exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            config_dir.display()
        );
    }

    let config = Config::builder()
        .set_default("database_url", "sqlite://sink_bom.db?mode=rwc")?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .set_default("rules_path", DEFAULT_RULES_PATH)?
        .add_source(File::from(config_dir.join("default")).required(false))
        .add_source(File::from(config_dir.join(&run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn setup_config_dir(files: &[(&str, &str)]) -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(CONFIG_DIR);
        fs::create_dir(&config_path).unwrap();
        for (name, content) in files {
            fs::write(config_path.join(name), content).unwrap();
        }
        temp_dir
    }

    #[test]
    fn defaults_apply_without_files() {
        let temp_dir = TempDir::new().unwrap();
        let config = load_config_from(temp_dir.path()).unwrap();

        assert_eq!(config.log_level, "info");
        assert_eq!(config.rules_path, DEFAULT_RULES_PATH);
        assert!(config.cache.enabled);
        assert_eq!(config.cache.max_entries, DEFAULT_CACHE_MAX_ENTRIES);
        assert!(config.category_priority.is_none());
    }

    #[test]
    fn file_values_are_layered_over_defaults() {
        let temp_dir = setup_config_dir(&[(
            "default.toml",
            r#"
                database_url = "postgres://localhost/bom"
                log_json = true
                category_priority = ["control_box", "sink_body"]

                [cache]
                max_entries = 16
            "#,
        )]);

        let config = load_config_from(temp_dir.path()).unwrap();
        assert_eq!(config.database_url, "postgres://localhost/bom");
        assert!(config.log_json);
        assert_eq!(config.cache.max_entries, 16);
        assert_eq!(
            config.category_priority,
            Some(vec![StructuralRole::ControlBox, StructuralRole::SinkBody])
        );
    }

    #[test]
    fn invalid_values_fail_validation() {
        let temp_dir = setup_config_dir(&[(
            "default.toml",
            r#"
                log_level = "loud"

                [cache]
                enabled = true
                max_entries = 0
            "#,
        )]);

        match load_config_from(temp_dir.path()) {
            Err(AppConfigError::Validation(errors)) => {
                assert!(errors.field_errors().contains_key("log_level"));
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn empty_enabled_cache_is_rejected() {
        let mut config = AppConfig::new("sqlite::memory:".into(), "test".into());
        config.cache.max_entries = 0;
        assert!(config.validate_additional_constraints().is_err());

        config.cache.enabled = false;
        assert!(config.validate_additional_constraints().is_ok());
    }

    #[test]
    fn priority_override_replaces_rule_table_order() {
        let temp_dir = TempDir::new().unwrap();
        let rules_path = temp_dir.path().join("rules.toml");
        fs::write(
            &rules_path,
            r#"
                category_priority = ["sink_body"]

                [[manuals]]
                language = "EN"
                part_id = "T2-STD-MANUAL-EN"
            "#,
        )
        .unwrap();

        let mut config = AppConfig::new("sqlite::memory:".into(), "test".into());
        config.rules_path = rules_path.display().to_string();
        assert_eq!(
            config.load_rules().unwrap().category_priority,
            Some(vec![StructuralRole::SinkBody])
        );

        config.category_priority = Some(vec![StructuralRole::Manual]);
        assert_eq!(
            config.load_rules().unwrap().category_priority,
            Some(vec![StructuralRole::Manual])
        );
    }
}
