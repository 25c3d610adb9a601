//! Scenario configuration for stepbridge.
//!
//! A scenario is a TOML file scripting the mock remote: latency, the root
//! location it hands out, the account figures it reports and which requests
//! fail with which code. Every field has a default, so an empty file (or no
//! file at all) describes a remote where everything succeeds.
//!
//! A `[credentials]` section may also supply the login, so a scenario can be
//! replayed without flags or a prompt.

use bridge_client::{AccountDetails, MockRemote, NodeHandle, RequestKind, ResultCode};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root scenario configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScenarioConfig {
    /// Remote behavior.
    #[serde(default)]
    pub remote: RemoteConfig,
    /// Account figures.
    #[serde(default)]
    pub account: AccountConfig,
    /// Scripted failures.
    #[serde(default)]
    pub failures: FailureConfig,
    /// Session settings.
    #[serde(default)]
    pub session: SessionConfig,
    /// Stored login, used when no flag overrides it.
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

/// Stored login.
#[derive(Clone, Default, Deserialize)]
pub struct CredentialsConfig {
    /// Account email.
    pub email: Option<String>,
    /// Account password.
    pub password: Option<String>,
}

impl fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Remote behavior.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteConfig {
    /// Delay before each completion in milliseconds (default: 0).
    #[serde(default)]
    pub latency_ms: u64,
    /// Root location handed out after FetchState (default: built-in handle).
    #[serde(default)]
    pub root: Option<NodeHandle>,
    /// Hand out no root location at all (default: false).
    #[serde(default)]
    pub missing_root: bool,
}

/// Account figures reported by AccountDetails.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountConfig {
    /// Bytes in use (default: 0).
    #[serde(default)]
    pub storage_used: u64,
    /// Quota in bytes (default: 20 GiB).
    #[serde(default = "default_storage_max")]
    pub storage_max: u64,
    /// Plan level (default: 0, free).
    #[serde(default)]
    pub pro_level: i32,
}

/// Result codes to fail the next request of each kind with.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FailureConfig {
    /// Login.
    pub login: Option<ResultCode>,
    /// FetchState.
    pub fetch_state: Option<ResultCode>,
    /// GetRoot.
    pub get_root: Option<ResultCode>,
    /// AccountDetails.
    pub account_details: Option<ResultCode>,
    /// CreateFolder.
    pub create_folder: Option<ResultCode>,
    /// Logout.
    pub logout: Option<ResultCode>,
}

/// Session settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Upper bound on each wait for a completion, in seconds; 0 waits
    /// forever (default: 30).
    #[serde(default = "default_step_timeout_secs")]
    pub step_timeout_secs: u64,
}

// Default value functions
fn default_storage_max() -> u64 {
    20 * 1024 * 1024 * 1024 // 20 GiB
}

fn default_step_timeout_secs() -> u64 {
    30
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            storage_used: 0,
            storage_max: default_storage_max(),
            pro_level: 0,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            step_timeout_secs: default_step_timeout_secs(),
        }
    }
}

impl SessionConfig {
    /// The step timeout, `None` when disabled.
    pub fn step_timeout(&self) -> Option<Duration> {
        (self.step_timeout_secs > 0).then(|| Duration::from_secs(self.step_timeout_secs))
    }
}

impl FailureConfig {
    /// Scripted failures as (kind, code) pairs.
    pub fn scripted(&self) -> Vec<(RequestKind, ResultCode)> {
        [
            (RequestKind::Login, self.login),
            (RequestKind::FetchState, self.fetch_state),
            (RequestKind::GetRoot, self.get_root),
            (RequestKind::AccountDetails, self.account_details),
            (RequestKind::CreateFolder, self.create_folder),
            (RequestKind::Logout, self.logout),
        ]
        .into_iter()
        .filter_map(|(kind, code)| code.map(|code| (kind, code)))
        .collect()
    }
}

impl ScenarioConfig {
    /// Load a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Script `remote` to behave as this scenario describes.
    pub fn apply(&self, remote: &MockRemote) {
        remote.set_latency(Duration::from_millis(self.remote.latency_ms));
        if self.remote.missing_root {
            remote.set_root(None);
        } else if let Some(root) = self.remote.root {
            remote.set_root(Some(root));
        }
        remote.set_account(Some(AccountDetails::new(
            self.account.storage_used,
            self.account.storage_max,
            self.account.pro_level,
        )));
        for (kind, code) in self.failures.scripted() {
            if code.is_success() {
                tracing::warn!("ignoring scripted failure for {} with success code", kind);
                continue;
            }
            remote.fail_next(kind, code);
        }
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_scenario_succeeds_everywhere() {
        let config = ScenarioConfig::default();
        assert_eq!(config.remote.latency_ms, 0);
        assert_eq!(config.account.storage_max, 20 * 1024 * 1024 * 1024);
        assert!(config.failures.scripted().is_empty());
        assert_eq!(config.session.step_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn scenario_from_toml_string() {
        let toml = r#"
[remote]
latency_ms = 25
root = "AAAAAAAq"

[account]
storage_used = 50
storage_max = 100
pro_level = 2

[failures]
account_details = -11

[session]
step_timeout_secs = 5
"#;

        let config: ScenarioConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.remote.latency_ms, 25);
        assert_eq!(config.remote.root, Some(NodeHandle::from_raw(42)));
        assert_eq!(config.account.storage_used, 50);
        assert_eq!(config.account.pro_level, 2);
        assert_eq!(
            config.failures.scripted(),
            vec![(RequestKind::AccountDetails, ResultCode::Access)]
        );
        assert_eq!(config.session.step_timeout(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn missing_sections_use_defaults() {
        let config: ScenarioConfig = toml::from_str("").unwrap();
        assert_eq!(config.account.storage_max, default_storage_max());
        assert_eq!(config.session.step_timeout_secs, 30);
        assert!(!config.remote.missing_root);
    }

    #[test]
    fn credentials_section_is_optional_and_redacted() {
        let config: ScenarioConfig = toml::from_str("").unwrap();
        assert!(config.credentials.email.is_none());

        let toml = r#"
[credentials]
email = "me@example.com"
password = "hunter22"
"#;
        let config: ScenarioConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.credentials.email.as_deref(), Some("me@example.com"));
        assert_eq!(config.credentials.password.as_deref(), Some("hunter22"));

        let shown = format!("{:?}", config);
        assert!(shown.contains("me@example.com"));
        assert!(!shown.contains("hunter22"));
    }

    #[test]
    fn zero_timeout_disables_it() {
        let config: ScenarioConfig = toml::from_str("[session]\nstep_timeout_secs = 0").unwrap();
        assert_eq!(config.session.step_timeout(), None);
    }

    #[test]
    fn bad_root_handle_is_rejected() {
        let result: Result<ScenarioConfig, _> = toml::from_str("[remote]\nroot = \"!!\"");
        assert!(result.is_err());
    }

    #[test]
    fn from_file_reports_missing_file() {
        let err = ScenarioConfig::from_file(Path::new("/nonexistent/scenario.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
        assert!(err.to_string().contains("/nonexistent/scenario.toml"));
    }
}
