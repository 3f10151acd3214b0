use serde::Deserialize;
use std::path::Path;

pub const ALLOWED_REPORT_TYPES: &[&str] = &["custom-report", "project-report", "document-report"];

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub backend: BackendConfig,
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    pub base_url: String,
}

/// Which dataset the dashboard is bound to.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DatasetConfig {
    pub report_type: String,
    pub report_id: String,
    #[serde(default)]
    pub file_name: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UiConfig {
    #[serde(default = "default_resize_debounce_ms")]
    pub resize_debounce_ms: u64,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            resize_debounce_ms: default_resize_debounce_ms(),
            log_filter: default_log_filter(),
        }
    }
}

fn default_resize_debounce_ms() -> u64 {
    150
}

fn default_log_filter() -> String {
    "info".to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

const DEFAULT_CONFIG: &str = r#"
[backend]
base_url = "http://localhost:8000"

[dataset]
report_type = "project-report"
report_id = "1"

[ui]
resize_debounce_ms = 150
log_filter = "info"
"#;

pub const CONFIG_FILE_NAME: &str = "dashboard.toml";

/// Load configuration.
///
/// Search order:
/// 1. `path`, when given (must exist)
/// 2. `dashboard.toml` next to the executable
/// 3. the embedded default
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let config = match path {
        Some(path) => {
            tracing::info!("Loading config from: {}", path.display());
            parse(&std::fs::read_to_string(path)?)?
        }
        None => match exe_config_path() {
            Some(found) => {
                tracing::info!("Loading config from: {}", found.display());
                parse(&std::fs::read_to_string(found)?)?
            }
            None => {
                tracing::info!("Using default embedded configuration");
                parse(DEFAULT_CONFIG)?
            }
        },
    };
    config.validate()?;
    Ok(config)
}

fn exe_config_path() -> Option<std::path::PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let candidate = exe.parent()?.join(CONFIG_FILE_NAME);
    candidate.exists().then_some(candidate)
}

fn parse(contents: &str) -> Result<Config, ConfigError> {
    Ok(toml::from_str(contents)?)
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("backend.base_url is empty".into()));
        }
        if !ALLOWED_REPORT_TYPES.contains(&self.dataset.report_type.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "Unknown report type: {} (expected one of {})",
                self.dataset.report_type,
                ALLOWED_REPORT_TYPES.join(", ")
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_loads() {
        let config = parse(DEFAULT_CONFIG).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.backend.base_url, "http://localhost:8000");
        assert_eq!(config.dataset.file_name, None);
        assert_eq!(config.ui.resize_debounce_ms, 150);
    }

    #[test]
    fn test_load_from_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[backend]
base_url = "http://analysis:9000"

[dataset]
report_type = "custom-report"
report_id = "12"
file_name = "tasks.xlsx"
"#
        )
        .unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.dataset.report_id, "12");
        assert_eq!(config.dataset.file_name.as_deref(), Some("tasks.xlsx"));
        assert_eq!(config.ui.log_filter, "info");
    }

    #[test]
    fn test_rejects_unknown_report_type() {
        let config = parse(&DEFAULT_CONFIG.replace("project-report", "sales-report")).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(Some(dir.path().join("absent.toml").as_path())).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
