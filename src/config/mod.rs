use crate::report::ReportFormat;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use wiring_core::{ComposeOptions, InstanceOptions, WiringError, WiringResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Run the bootstrap pass as soon as an instance is built
    #[serde(default = "default_true")]
    pub boot_on_build: bool,

    /// Construct the members of each bootstrap stage concurrently
    #[serde(default)]
    pub parallel_boot: bool,

    /// Report every consistency violation instead of stopping at the first
    #[serde(default)]
    pub collect_all_violations: bool,

    /// Format used by `wiring plan` when `--format` is not given
    /// - "text": indented listing (default)
    /// - "json": machine readable
    #[serde(default)]
    pub report_format: ReportFormat,
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            boot_on_build: true,
            parallel_boot: false,
            collect_all_violations: false,
            report_format: ReportFormat::default(),
        }
    }
}

impl Config {
    /// Platform-specific config file location
    ///
    /// Config locations:
    /// - Windows: %APPDATA%\wiring\config.yaml
    /// - Linux: ~/.config/wiring/config.yaml
    /// - macOS: ~/Library/Application Support/wiring/config.yaml
    pub fn default_path() -> WiringResult<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            WiringError::Config("Could not determine config directory".to_string())
        })?;
        Ok(config_dir.join("wiring").join("config.yaml"))
    }

    /// Load config from the platform-specific location
    pub fn load() -> WiringResult<Self> {
        Self::load_from(&Self::default_path()?)
    }

    /// Load config from `path`; a missing file yields the defaults
    pub fn load_from(path: &Path) -> WiringResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&content)
            .map_err(|e| WiringError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Save config to `path`, creating parent directories as needed
    pub fn save_to(&self, path: &Path) -> WiringResult<()> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }

        let content = serde_yaml::to_string(self)
            .map_err(|e| WiringError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, content)?;
        Ok(())
    }

    pub fn compose_options(&self) -> ComposeOptions {
        ComposeOptions {
            collect_all_violations: self.collect_all_violations,
        }
    }

    pub fn instance_options(&self) -> InstanceOptions {
        InstanceOptions {
            boot: self.boot_on_build,
            parallel: self.parallel_boot,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.boot_on_build);
        assert!(!config.parallel_boot);
        assert!(!config.collect_all_violations);
        assert_eq!(config.report_format, ReportFormat::Text);
    }

    #[test]
    fn test_config_save_and_load() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("nested").join("config.yaml");

        let config = Config {
            parallel_boot: true,
            report_format: ReportFormat::Json,
            ..Default::default()
        };
        config.save_to(&config_path).unwrap();

        let loaded = Config::load_from(&config_path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_missing_file_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let loaded = Config::load_from(&temp.path().join("absent.yaml")).unwrap();
        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config {
            collect_all_violations: true,
            ..Default::default()
        };

        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(yaml.contains("collect_all_violations: true"));
        assert!(yaml.contains("report_format: text"));
    }

    #[test]
    fn test_config_deserialization_defaults() {
        let yaml = r#"
parallel_boot: true
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        // Should use default values for missing fields
        assert!(config.boot_on_build); // default is true
        assert!(config.parallel_boot);
        assert_eq!(config.report_format, ReportFormat::Text);
    }

    #[test]
    fn test_config_invalid_yaml() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("config.yaml");
        std::fs::write(&config_path, "report_format: [not, a, format]\n").unwrap();

        let err = Config::load_from(&config_path).unwrap_err();
        assert!(matches!(err, WiringError::Config(_)));
        assert!(err.to_string().contains("Failed to parse config"));
    }

    #[test]
    fn test_config_options_conversion() {
        let config = Config {
            boot_on_build: false,
            parallel_boot: true,
            collect_all_violations: true,
            ..Default::default()
        };

        assert!(config.compose_options().collect_all_violations);
        let options = config.instance_options();
        assert!(!options.boot);
        assert!(options.parallel);
    }

    #[test]
    fn test_default_true() {
        assert!(default_true());
    }
}
