use crate::core::instrument::CorrectionRule;
use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub retries: usize,
    pub retry_delay_ms: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            base_url: "https://api.mfapi.in/mf".to_string(),
            timeout_secs: 10,
            retries: 3,
            retry_delay_ms: 500,
        }
    }
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct RefreshConfig {
    /// Seconds between full directory rebuilds. New schemes appear
    /// rarely, so the default is a month.
    pub directory_interval_secs: u64,
    /// Seconds between wholesale NAV cache invalidations. Upstream
    /// publishes one NAV per day.
    pub series_interval_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        RefreshConfig {
            directory_interval_secs: 30 * 24 * 60 * 60,
            series_interval_secs: 24 * 60 * 60,
        }
    }
}

impl RefreshConfig {
    pub fn directory_interval(&self) -> Duration {
        Duration::from_secs(self.directory_interval_secs)
    }

    pub fn series_interval(&self) -> Duration {
        Duration::from_secs(self.series_interval_secs)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    pub refresh: RefreshConfig,
    /// Static NAV scale corrections, loaded once at startup.
    pub corrections: Vec<CorrectionRule>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "mfnav", "mfnav")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config.validate()?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// A bad correction table would silently corrupt every series built
    /// from it, so it aborts startup instead.
    fn validate(&self) -> Result<()> {
        for rule in &self.corrections {
            if !rule.multiplier.is_finite() || rule.multiplier <= 0.0 {
                bail!(
                    "Invalid correction multiplier {} for scheme {}",
                    rule.multiplier,
                    rule.scheme_code
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_config_defaults() {
        let config: AppConfig = serde_yaml::from_str("{}").expect("Failed to deserialize");

        assert_eq!(config.provider.base_url, "https://api.mfapi.in/mf");
        assert_eq!(config.provider.timeout_secs, 10);
        assert_eq!(config.provider.retries, 3);
        assert_eq!(config.refresh.directory_interval_secs, 30 * 24 * 60 * 60);
        assert_eq!(config.refresh.series_interval_secs, 24 * 60 * 60);
        assert!(config.corrections.is_empty());
    }

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
provider:
  base_url: "http://example.com/mf"
  timeout_secs: 5
refresh:
  series_interval_secs: 3600
corrections:
  - scheme_code: 7
    effective_date: "2023-06-01"
    multiplier: 0.1
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.provider.base_url, "http://example.com/mf");
        assert_eq!(config.provider.timeout_secs, 5);
        // Unset fields keep their defaults
        assert_eq!(config.provider.retries, 3);
        assert_eq!(config.refresh.series_interval_secs, 3600);
        assert_eq!(config.refresh.directory_interval_secs, 30 * 24 * 60 * 60);

        assert_eq!(config.corrections.len(), 1);
        assert_eq!(config.corrections[0].scheme_code, 7);
        assert_eq!(
            config.corrections[0].effective_date,
            NaiveDate::from_ymd_opt(2023, 6, 1).unwrap()
        );
        assert_eq!(config.corrections[0].multiplier, 0.1);
    }

    #[test]
    fn test_invalid_correction_multiplier_rejected() {
        let yaml_str = r#"
corrections:
  - scheme_code: 7
    effective_date: "2023-06-01"
    multiplier: 0.0
"#;
        let file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
        fs::write(file.path(), yaml_str).expect("Failed to write config");

        let result = AppConfig::load_from_path(file.path());

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("multiplier"));
    }
}
