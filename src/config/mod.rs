//! Configuration management for dsnmail

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ConfigError, Result};

/// Default webmail server
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Webmail server base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Override for the session storage database file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<PathBuf>,

    /// Session guard settings
    #[serde(default)]
    pub session: SessionSettings,

    /// Signup form settings
    #[serde(default)]
    pub signup: SignupSettings,
}

/// Session guard settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionSettings {
    /// Paths starting with this prefix require a session
    pub protected_prefix: String,

    /// Login route used for redirects
    pub login_path: String,

    /// Token refresh endpoint
    pub refresh_path: String,

    /// Refresh when the access token expires within this many seconds
    pub refresh_threshold_secs: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            protected_prefix: "/dashboard".to_string(),
            login_path: "/login".to_string(),
            refresh_path: "/api/auth/refresh".to_string(),
            refresh_threshold_secs: 5 * 60,
        }
    }
}

impl SessionSettings {
    /// Near-expiry window as a chrono duration
    ///
    /// Saturates at `TimeDelta::MAX`; `Config::validate` rejects such values.
    pub fn refresh_threshold(&self) -> chrono::Duration {
        threshold_from_secs(self.refresh_threshold_secs).unwrap_or(chrono::TimeDelta::MAX)
    }
}

fn threshold_from_secs(secs: u64) -> Option<chrono::Duration> {
    i64::try_from(secs).ok().and_then(chrono::Duration::try_seconds)
}

/// Signup form settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SignupSettings {
    /// Email domains accepted without a warning
    pub allowed_domains: Vec<String>,

    /// Client-side watchdog for a pending submission
    pub submit_timeout_secs: u64,

    /// Debounce for persisting the email draft
    pub draft_debounce_ms: u64,

    /// Error banner auto-dismiss delay
    pub banner_dismiss_secs: u64,
}

impl Default for SignupSettings {
    fn default() -> Self {
        Self {
            allowed_domains: crate::signup::DEFAULT_ALLOWED_DOMAINS
                .iter()
                .map(|d| d.to_string())
                .collect(),
            submit_timeout_secs: 30,
            draft_debounce_ms: 1000,
            banner_dismiss_secs: 5,
        }
    }
}

impl SignupSettings {
    pub fn submit_timeout(&self) -> Duration {
        Duration::from_secs(self.submit_timeout_secs)
    }

    pub fn draft_debounce(&self) -> Duration {
        Duration::from_millis(self.draft_debounce_ms)
    }

    pub fn banner_dismiss(&self) -> Duration {
        Duration::from_secs(self.banner_dismiss_secs)
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            storage_path: None,
            session: SessionSettings::default(),
            signup: SignupSettings::default(),
        }
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::Invalid(
            "Could not determine home directory".to_string(),
        ))?;

        Ok(home.join(".dsnmail").join("config.yaml"))
    }

    /// Resolve an optional override to a concrete config path
    pub fn resolve_path(path: Option<&str>) -> Result<PathBuf> {
        match path {
            Some(p) => Ok(PathBuf::from(p)),
            None => Self::default_path(),
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: PathBuf) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound.into());
        }

        let contents = std::fs::read_to_string(&path)?;
        let config: Config = serde_yaml::from_str(&contents).map_err(ConfigError::from)?;
        config.validate()?;

        Ok(config)
    }

    /// Load configuration, falling back to defaults when no file exists
    pub fn load_or_default(path: Option<&str>) -> Result<Self> {
        match Self::load_from(Self::resolve_path(path)?) {
            Ok(config) => Ok(config),
            Err(crate::error::Error::Config(ConfigError::NotFound)) => {
                log::debug!("No config file found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Save configuration to the given (or default) path
    pub fn save_at(&self, path: Option<&str>) -> Result<()> {
        self.save_to(Self::resolve_path(path)?)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents =
            serde_yaml::to_string(self).map_err(|e| ConfigError::SaveError(e.to_string()))?;

        std::fs::write(&path, contents)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(&path)?.permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(&path, perms)?;
        }

        Ok(())
    }

    /// Check that the loaded values can be used
    pub fn validate(&self) -> Result<()> {
        if url::Url::parse(&self.base_url).is_err() {
            return Err(
                ConfigError::Invalid(format!("base_url is not a URL: {}", self.base_url)).into(),
            );
        }
        if threshold_from_secs(self.session.refresh_threshold_secs).is_none() {
            return Err(ConfigError::Invalid(format!(
                "session.refresh_threshold_secs is out of range: {}",
                self.session.refresh_threshold_secs
            ))
            .into());
        }
        for (name, value) in [
            ("session.protected_prefix", &self.session.protected_prefix),
            ("session.login_path", &self.session.login_path),
            ("session.refresh_path", &self.session.refresh_path),
        ] {
            if !value.starts_with('/') {
                return Err(ConfigError::Invalid(format!("{} must start with '/'", name)).into());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.session.protected_prefix, "/dashboard");
        assert_eq!(config.session.login_path, "/login");
        assert_eq!(config.session.refresh_threshold(), chrono::Duration::minutes(5));
        assert_eq!(config.signup.submit_timeout(), Duration::from_secs(30));
        assert_eq!(config.signup.draft_debounce(), Duration::from_millis(1000));
        assert_eq!(config.signup.allowed_domains.len(), 5);
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = "base_url: https://mail.example.com\nsession:\n  refresh_threshold_secs: 60\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.base_url, "https://mail.example.com");
        assert_eq!(config.session.refresh_threshold_secs, 60);
        assert_eq!(config.session.protected_prefix, "/dashboard");
        assert_eq!(config.signup, SignupSettings::default());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("nested").join("config.yaml");

        let mut config = Config::default();
        config.base_url = "https://mail.dsntech.com".to_string();
        config.save_to(path.clone()).unwrap();

        let loaded = Config::load_from(path).unwrap();
        assert_eq!(loaded.base_url, "https://mail.dsntech.com");
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let temp = tempdir().unwrap();
        let result = Config::load_from(temp.path().join("absent.yaml"));
        assert!(matches!(
            result,
            Err(crate::error::Error::Config(ConfigError::NotFound))
        ));
    }

    #[test]
    fn test_load_or_default_without_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("absent.yaml");
        let config = Config::load_or_default(path.to_str()).unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_validate_rejects_relative_paths() {
        let mut config = Config::default();
        config.session.login_path = "login".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_oversized_threshold() {
        let mut config = Config::default();
        config.session.refresh_threshold_secs = 100_000_000_000_000_000;
        assert!(matches!(
            config.validate(),
            Err(crate::error::Error::Config(ConfigError::Invalid(_)))
        ));
        assert_eq!(config.session.refresh_threshold(), chrono::TimeDelta::MAX);
    }

    #[test]
    fn test_load_rejects_oversized_threshold() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(&path, "session:\n  refresh_threshold_secs: 18000000000000000000\n")
            .unwrap();
        assert!(Config::load_from(path).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_base_url() {
        let mut config = Config::default();
        config.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }
}
