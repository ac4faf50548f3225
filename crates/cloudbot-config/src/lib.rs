pub mod error;

pub use error::*;

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that points directly at a config file
pub const CONFIG_PATH_ENV: &str = "CLOUDBOT_CONFIG_PATH";
/// Environment variable that overrides `hcloud-token`
pub const TOKEN_ENV: &str = "HCLOUD_TOKEN";

const CANDIDATES: [&str; 3] = ["cloudbot.local.yaml", "cloudbot.yaml", "config.yaml"];

/// How the decommission workflow lets a shutdown settle before snapshotting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShutdownSettle {
    /// Always sleep the full settle duration
    #[default]
    Sleep,
    /// Poll the server until it reports `off`, bounded by the settle duration
    Poll,
}

/// Process-wide settings, loaded once at startup
#[derive(Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Settings {
    #[serde(default)]
    pub hcloud_token: String,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    #[serde(default = "default_location")]
    pub location: String,

    #[serde(default = "default_server_type")]
    pub server_type: String,

    #[serde(default = "default_settle_secs")]
    pub settle_secs: u64,

    #[serde(default)]
    pub shutdown_settle: ShutdownSettle,

    #[serde(default = "default_action_timeout_secs")]
    pub action_timeout_secs: u64,

    /// Server name → reserved primary IP id
    #[serde(default)]
    pub network_identities: BTreeMap<String, u64>,
}

fn default_api_base_url() -> String {
    "https://api.hetzner.cloud/v1".to_string()
}

fn default_location() -> String {
    "hel1".to_string()
}

fn default_server_type() -> String {
    "ccx33".to_string()
}

fn default_settle_secs() -> u64 {
    30
}

fn default_action_timeout_secs() -> u64 {
    300
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("hcloud_token", &"<redacted>")
            .field("api_base_url", &self.api_base_url)
            .field("location", &self.location)
            .field("server_type", &self.server_type)
            .field("settle_secs", &self.settle_secs)
            .field("shutdown_settle", &self.shutdown_settle)
            .field("action_timeout_secs", &self.action_timeout_secs)
            .field("network_identities", &self.network_identities)
            .finish()
    }
}

impl Settings {
    /// Parse settings from YAML text, apply env overrides and validate
    pub fn from_yaml(content: &str, path: &Path) -> Result<Self> {
        let mut settings: Settings =
            serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        if let Ok(token) = std::env::var(TOKEN_ENV) {
            if !token.trim().is_empty() {
                settings.hcloud_token = token;
            }
        }

        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content, path)
    }

    fn validate(&self) -> Result<()> {
        if self.hcloud_token.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "hcloud-token is empty (set it in the config file or {})",
                TOKEN_ENV
            )));
        }
        if self.settle_secs == 0 {
            return Err(ConfigError::Invalid("settle-secs must be > 0".to_string()));
        }
        if self.action_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "action-timeout-secs must be > 0".to_string(),
            ));
        }
        if self.location.trim().is_empty() || self.server_type.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "location and server-type must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn settle(&self) -> Duration {
        Duration::from_secs(self.settle_secs)
    }

    pub fn action_timeout(&self) -> Duration {
        Duration::from_secs(self.action_timeout_secs)
    }
}

/// Locate the config file
///
/// Search order:
/// 1. `CLOUDBOT_CONFIG_PATH` (direct path)
/// 2. current directory: cloudbot.local.yaml, cloudbot.yaml, config.yaml
/// 3. ~/.config/cloudbot/config.yaml
pub fn find_config_file() -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
    }

    let current_dir = std::env::current_dir()?;
    for filename in &CANDIDATES {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global_config = config_dir.join("cloudbot").join("config.yaml");
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    Err(ConfigError::ConfigFileNotFound)
}

/// Find and load the config file
pub fn load_settings() -> Result<Settings> {
    let path = find_config_file()?;
    Settings::load(&path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    const MINIMAL: &str = "hcloud-token: secret\n";

    fn parse(content: &str) -> Result<Settings> {
        temp_env::with_var_unset(TOKEN_ENV, || {
            Settings::from_yaml(content, Path::new("config.yaml"))
        })
    }

    #[test]
    #[serial]
    fn test_defaults() {
        let settings = parse(MINIMAL).unwrap();
        assert_eq!(settings.location, "hel1");
        assert_eq!(settings.server_type, "ccx33");
        assert_eq!(settings.settle(), Duration::from_secs(30));
        assert_eq!(settings.action_timeout(), Duration::from_secs(300));
        assert_eq!(settings.shutdown_settle, ShutdownSettle::Sleep);
        assert!(settings.network_identities.is_empty());
    }

    #[test]
    #[serial]
    fn test_full_config() {
        let settings = parse(
            r#"
hcloud-token: secret
location: fsn1
server-type: cx22
settle-secs: 10
shutdown-settle: poll
action-timeout-secs: 120
network-identities:
  nub: 48363362
"#,
        )
        .unwrap();
        assert_eq!(settings.location, "fsn1");
        assert_eq!(settings.shutdown_settle, ShutdownSettle::Poll);
        assert_eq!(settings.network_identities.get("nub"), Some(&48363362));
        assert_eq!(settings.settle(), Duration::from_secs(10));
    }

    #[test]
    #[serial]
    fn test_missing_token() {
        let result = parse("location: hel1\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    #[serial]
    fn test_token_from_env() {
        let settings = temp_env::with_var(TOKEN_ENV, Some("from-env"), || {
            Settings::from_yaml("location: hel1\n", Path::new("config.yaml"))
        })
        .unwrap();
        assert_eq!(settings.hcloud_token, "from-env");
    }

    #[test]
    #[serial]
    fn test_zero_settle_rejected() {
        let result = parse("hcloud-token: secret\nsettle-secs: 0\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    #[serial]
    fn test_parse_error_names_file() {
        let err = parse("hcloud-token: [unclosed\n").unwrap_err();
        assert!(err.to_string().contains("config.yaml"));
    }

    #[test]
    #[serial]
    fn test_debug_redacts_token() {
        let settings = parse(MINIMAL).unwrap();
        let debug = format!("{:?}", settings);
        assert!(!debug.contains("secret"));
    }

    #[test]
    #[serial]
    fn test_find_config_file_in_current_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();
        fs::write(temp_dir.path().join("cloudbot.yaml"), MINIMAL).unwrap();

        std::env::set_current_dir(&temp_dir).unwrap();
        let result = temp_env::with_var_unset(CONFIG_PATH_ENV, find_config_file);
        std::env::set_current_dir(original_dir).unwrap();

        assert!(result.unwrap().ends_with("cloudbot.yaml"));
    }

    #[test]
    #[serial]
    fn test_find_config_file_local_priority() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();
        fs::write(temp_dir.path().join("cloudbot.yaml"), MINIMAL).unwrap();
        fs::write(temp_dir.path().join("cloudbot.local.yaml"), MINIMAL).unwrap();

        std::env::set_current_dir(&temp_dir).unwrap();
        let result = temp_env::with_var_unset(CONFIG_PATH_ENV, find_config_file);
        std::env::set_current_dir(original_dir).unwrap();

        assert!(result.unwrap().ends_with("cloudbot.local.yaml"));
    }

    #[test]
    #[serial]
    fn test_find_config_file_env_var() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("custom.yaml");
        fs::write(&config_path, MINIMAL).unwrap();

        let result = temp_env::with_var(CONFIG_PATH_ENV, Some(config_path.as_os_str()), || {
            find_config_file()
        });
        assert_eq!(result.unwrap(), config_path);
    }

    #[test]
    #[serial]
    fn test_load_from_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("cloudbot.yaml");
        fs::write(&config_path, MINIMAL).unwrap();

        let settings =
            temp_env::with_var_unset(TOKEN_ENV, || Settings::load(&config_path)).unwrap();
        assert_eq!(settings.hcloud_token, "secret");
    }
}
