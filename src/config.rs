//! Layered configuration.
//!
//! Precedence, lowest first: built-in defaults, `dsmon.toml` (or `$DSMON_CONFIG`),
//! the legacy `SYNOLOGY_*` / `ADMIN_USERS` / `TELEGRAM_BOT_TOKEN` variables,
//! `DSMON_*` variables (`__` separates nested keys), then command-line flags.

use std::net::SocketAddr;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::core::notifications::ChatId;
use crate::core::source::Credentials;

const DEFAULT_CONFIG_FILE: &str = "dsmon.toml";

/// Environment names used by earlier deployments, mapped onto config keys.
const LEGACY_ENV: &[(&str, &str)] = &[
    ("SYNOLOGY_HOST", "remote.host"),
    ("SYNOLOGY_PORT", "remote.port"),
    ("SYNOLOGY_USERNAME", "remote.account"),
    ("SYNOLOGY_PASSWORD", "remote.password"),
    ("ADMIN_USERS", "notifications.admin_users"),
    ("TELEGRAM_BOT_TOKEN", "notifications.telegram_bot_token"),
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("remote account and password are required (set SYNOLOGY_USERNAME/SYNOLOGY_PASSWORD or remote.account/remote.password)")]
    MissingCredentials,

    #[error("poll interval must be greater than zero")]
    ZeroInterval,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub remote: RemoteConfig,
    pub monitor: MonitorConfig,
    pub notifications: NotificationConfig,
    pub rpc_bind: SocketAddr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_bind: Option<SocketAddr>,
    pub simulation: bool,
    pub verbose: bool,
    pub json_logs: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub scheme: String,
    pub host: String,
    pub port: u16,
    pub account: String,
    pub password: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub poll_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram_bot_token: Option<String>,
    pub telegram_api_base: String,
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub admin_users: AdminUsers,
}

/// Admin chat ids. Entries of a comma-separated string that do not parse land in
/// `ignored`, to be reported once logging is up.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdminUsers {
    pub ids: Vec<ChatId>,
    pub ignored: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            remote: RemoteConfig::default(),
            monitor: MonitorConfig {
                poll_interval_secs: 300,
            },
            notifications: NotificationConfig {
                telegram_bot_token: None,
                telegram_api_base: "https://api.telegram.org".to_string(),
                request_timeout_secs: 30,
                admin_users: AdminUsers::default(),
            },
            rpc_bind: SocketAddr::from(([127, 0, 0, 1], 7420)),
            http_bind: None,
            simulation: false,
            verbose: false,
            json_logs: false,
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            scheme: "http".to_string(),
            host: "192.168.1.34".to_string(),
            port: 5000,
            account: String::new(),
            password: String::new(),
            request_timeout_secs: 30,
        }
    }
}

impl AppConfig {
    /// Load the layered configuration, with `cli` merged on top, and validate it.
    pub fn new<T: Serialize>(cli: Option<&T>) -> Result<Self, ConfigError> {
        let config: AppConfig = Self::figment(cli).extract().map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    pub fn figment<T: Serialize>(cli: Option<&T>) -> Figment {
        let path = std::env::var("DSMON_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.into());

        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::raw().filter_map(|key| {
                LEGACY_ENV
                    .iter()
                    .find(|(name, _)| key.as_str().eq_ignore_ascii_case(name))
                    .map(|(_, path)| (*path).into())
            }))
            .merge(Env::prefixed("DSMON_").ignore(&["CONFIG"]).split("__"));

        if let Some(args) = cli {
            figment = figment.merge(Serialized::defaults(args));
        }
        figment
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        // The simulated source accepts any credentials.
        let needs_credentials = !self.simulation;
        if needs_credentials && (self.remote.account.is_empty() || self.remote.password.is_empty())
        {
            return Err(ConfigError::MissingCredentials);
        }
        if self.monitor.poll_interval_secs == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        Ok(())
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.remote.account, &self.remote.password)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.monitor.poll_interval_secs)
    }
}

impl RemoteConfig {
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl NotificationConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Serialize for AdminUsers {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.ids.serialize(serializer)
    }
}

/// Accepts a list, a single id, or a comma-separated string such as `"123, 456"`.
impl<'de> Deserialize<'de> for AdminUsers {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            List(Vec<i64>),
            One(i64),
            Csv(String),
        }

        let mut users = AdminUsers::default();
        match Raw::deserialize(deserializer)? {
            Raw::List(ids) => users.ids = ids.into_iter().map(ChatId).collect(),
            Raw::One(id) => users.ids.push(ChatId(id)),
            Raw::Csv(text) => {
                for part in text.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                    match part.parse::<i64>() {
                        Ok(id) => users.ids.push(ChatId(id)),
                        Err(_) => users.ignored.push(part.to_string()),
                    }
                }
            }
        }
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[derive(Serialize)]
    struct Flags {
        verbose: bool,
    }

    #[test]
    fn test_missing_credentials_is_fatal() {
        Jail::expect_with(|_jail| {
            let err = AppConfig::new(None::<&Flags>).unwrap_err();
            assert!(matches!(err, ConfigError::MissingCredentials));
            Ok(())
        });
    }

    #[test]
    fn test_defaults_and_legacy_env() {
        Jail::expect_with(|jail| {
            jail.set_env("SYNOLOGY_USERNAME", "admin");
            jail.set_env("SYNOLOGY_PASSWORD", "secret");
            jail.set_env("SYNOLOGY_PORT", "5001");
            jail.set_env("ADMIN_USERS", "111, 222,not-a-number");

            let config = AppConfig::new(None::<&Flags>).map_err(|e| e.to_string())?;

            assert_eq!(config.remote.host, "192.168.1.34");
            assert_eq!(config.remote.port, 5001);
            assert_eq!(config.remote.account, "admin");
            assert_eq!(config.remote.request_timeout_secs, 30);
            assert_eq!(config.poll_interval(), Duration::from_secs(300));
            assert_eq!(
                config.notifications.admin_users.ids,
                vec![ChatId(111), ChatId(222)]
            );
            assert_eq!(config.notifications.admin_users.ignored, vec!["not-a-number"]);
            assert_eq!(
                config.notifications.request_timeout(),
                Duration::from_secs(30)
            );
            assert!(config.notifications.telegram_bot_token.is_none());
            Ok(())
        });
    }

    #[test]
    fn test_file_env_and_cli_precedence() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "dsmon.toml",
                r#"
                    verbose = false

                    [remote]
                    host = "nas.local"
                    account = "file-user"
                    password = "file-pass"

                    [monitor]
                    poll_interval_secs = 60

                    [notifications]
                    admin_users = [42]
                "#,
            )?;
            jail.set_env("SYNOLOGY_USERNAME", "legacy-user");
            jail.set_env("DSMON_REMOTE__ACCOUNT", "prefixed-user");

            let config =
                AppConfig::new(Some(&Flags { verbose: true })).map_err(|e| e.to_string())?;

            assert_eq!(config.remote.host, "nas.local");
            assert_eq!(config.remote.account, "prefixed-user");
            assert_eq!(config.remote.password, "file-pass");
            assert_eq!(config.monitor.poll_interval_secs, 60);
            assert_eq!(config.notifications.admin_users.ids, vec![ChatId(42)]);
            assert!(config.notifications.admin_users.ignored.is_empty());
            assert!(config.verbose);
            Ok(())
        });
    }

    #[test]
    fn test_zero_interval_rejected() {
        Jail::expect_with(|jail| {
            jail.set_env("DSMON_MONITOR__POLL_INTERVAL_SECS", "0");
            jail.set_env("DSMON_SIMULATION", "true");
            let err = AppConfig::new(None::<&Flags>).unwrap_err();
            assert!(matches!(err, ConfigError::ZeroInterval));
            Ok(())
        });
    }

    #[test]
    fn test_base_url() {
        let remote = RemoteConfig {
            scheme: "https".into(),
            host: "nas".into(),
            port: 5001,
            ..RemoteConfig::default()
        };
        assert_eq!(remote.base_url(), "https://nas:5001");
    }
}
