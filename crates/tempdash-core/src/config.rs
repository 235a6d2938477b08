use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Largest number of daily documents the dashboard keeps subscribed.
pub const MAX_FETCH_LIMIT: usize = 31;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// JSON fixture loaded into the in-process document source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixture_path: Option<PathBuf>,

    /// Hosted document database settings
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Dashboard behaviour and preference defaults
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Project identifier of the hosted database
    pub project_id: String,

    /// Base URL of the database endpoint
    pub endpoint: String,

    /// Collection holding one document per day of readings
    #[serde(default = "default_daily_collection")]
    pub daily_collection: String,

    /// Collection holding the all-time aggregate document
    #[serde(default = "default_overall_collection")]
    pub overall_collection: String,

    /// Number of most recent days to subscribe to
    #[serde(default = "default_fetch_limit")]
    pub fetch_limit: usize,
}

fn default_daily_collection() -> String {
    "temperature".to_string()
}

fn default_overall_collection() -> String {
    "overall".to_string()
}

fn default_fetch_limit() -> usize {
    7
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            project_id: "YOUR_PROJECT_ID".to_string(),
            endpoint: "https://firestore.googleapis.com".to_string(),
            daily_collection: default_daily_collection(),
            overall_collection: default_overall_collection(),
            fetch_limit: default_fetch_limit(),
        }
    }
}

impl DatabaseConfig {
    /// Check if a real project is configured (not the placeholder)
    pub fn is_configured(&self) -> bool {
        !self.project_id.is_empty() && !self.project_id.starts_with("YOUR_")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// How often "time since last update" is recomputed, in seconds (0 disables)
    #[serde(default = "default_relative_time_refresh_secs")]
    pub relative_time_refresh_secs: u64,

    /// Initial state of the chart series toggle
    #[serde(default)]
    pub series_toggle: bool,

    /// Initial time range, in days
    #[serde(default = "default_time_range")]
    pub time_range: String,
}

fn default_relative_time_refresh_secs() -> u64 {
    30
}

fn default_time_range() -> String {
    "1".to_string()
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            relative_time_refresh_secs: default_relative_time_refresh_secs(),
            series_toggle: false,
            time_range: default_time_range(),
        }
    }
}

impl Config {
    /// Load configuration from the user config directory, creating a default if it doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from a specific file, creating a default if it doesn't exist
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(config_path)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents)
            .context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns an error if validation fails with critical errors; warnings are logged.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.database.endpoint, "database.endpoint", &mut result);

        if !self.database.is_configured() {
            result.add_warning(
                "database.project_id",
                "Database project not configured - using local fixture data only",
            );
        }

        if self.database.daily_collection.trim().is_empty() {
            result.add_error("database.daily_collection", "Collection name cannot be empty");
        }
        if self.database.overall_collection.trim().is_empty() {
            result.add_error("database.overall_collection", "Collection name cannot be empty");
        }

        if self.database.fetch_limit == 0 {
            result.add_error("database.fetch_limit", "Fetch limit must be greater than 0");
        } else if self.database.fetch_limit > MAX_FETCH_LIMIT {
            result.add_warning(
                "database.fetch_limit",
                format!("Fetch limit above {} days may slow down the dashboard", MAX_FETCH_LIMIT),
            );
        }

        if self.dashboard.relative_time_refresh_secs == 0 {
            result.add_warning(
                "dashboard.relative_time_refresh_secs",
                "Relative time refresh disabled (0 seconds)",
            );
        }

        match self.dashboard.time_range.trim().parse::<usize>() {
            Ok(days) if days >= 1 && days <= self.database.fetch_limit.max(1) => {}
            Ok(days) => result.add_error(
                "dashboard.time_range",
                format!(
                    "Time range of {} days is outside 1..={}",
                    days, self.database.fetch_limit
                ),
            ),
            Err(_) => result.add_error(
                "dashboard.time_range",
                format!("Time range must be a number of days, got: {}", self.dashboard.time_range),
            ),
        }

        if let Some(path) = &self.fixture_path {
            if !path.exists() {
                result.add_warning(
                    "fixture_path",
                    format!("Fixture does not exist: {}", path.display()),
                );
            }
        }

        result
    }

    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to the user config directory
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        std::fs::write(config_path, contents)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("tempdash");

        Ok(config_dir.join("config.toml"))
    }
}
