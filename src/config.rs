use clap::Parser;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::auth::{read_ssl_cert, AuthnType, Username};
use crate::error::ConfigError;
use crate::validation;

pub const DEFAULT_CLIENT_CERT_RETRY_COUNT_LIMIT: &str = "10";
pub const DEFAULT_TOKEN_TIMEOUT: &str = "6m";
pub const DEFAULT_TOKEN_FILE_PATH: &str = "/run/conjur/access-token";
pub const DEFAULT_CLIENT_CERT_PATH: &str = "/etc/conjur/ssl/client.pem";
pub const DEFAULT_JWT_TOKEN_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";

/// Settings recognised by this client
///
/// Keys are case-sensitive. Anything not listed here is carried along in
/// [`Settings`] but never validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    AuthnLogin,
    ClientCertRetryCountLimit,
    TokenTimeout,
    JwtTokenPath,
    SslCertificate,
    CertFile,
    AuthnUrl,
    Account,
    AuthnTokenFile,
    ClientCertPath,
    PodName,
    PodNamespace,
    ContainerMode,
    Debug,
}

impl SettingKey {
    pub const ALL: [SettingKey; 14] = [
        SettingKey::AuthnLogin,
        SettingKey::ClientCertRetryCountLimit,
        SettingKey::TokenTimeout,
        SettingKey::JwtTokenPath,
        SettingKey::SslCertificate,
        SettingKey::CertFile,
        SettingKey::AuthnUrl,
        SettingKey::Account,
        SettingKey::AuthnTokenFile,
        SettingKey::ClientCertPath,
        SettingKey::PodName,
        SettingKey::PodNamespace,
        SettingKey::ContainerMode,
        SettingKey::Debug,
    ];

    /// Environment variable name of the setting
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::AuthnLogin => "CONJUR_AUTHN_LOGIN",
            SettingKey::ClientCertRetryCountLimit => "CONJUR_CLIENT_CERT_RETRY_COUNT_LIMIT",
            SettingKey::TokenTimeout => "CONJUR_TOKEN_TIMEOUT",
            SettingKey::JwtTokenPath => "JWT_TOKEN_PATH",
            SettingKey::SslCertificate => "CONJUR_SSL_CERTIFICATE",
            SettingKey::CertFile => "CONJUR_CERT_FILE",
            SettingKey::AuthnUrl => "CONJUR_AUTHN_URL",
            SettingKey::Account => "CONJUR_ACCOUNT",
            SettingKey::AuthnTokenFile => "CONJUR_AUTHN_TOKEN_FILE",
            SettingKey::ClientCertPath => "CONJUR_CLIENT_CERT_PATH",
            SettingKey::PodName => "MY_POD_NAME",
            SettingKey::PodNamespace => "MY_POD_NAMESPACE",
            SettingKey::ContainerMode => "CONJUR_AUTHN_CONTAINER_MODE",
            SettingKey::Debug => "DEBUG",
        }
    }

    /// Look up a recognised key, `None` for anything else
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == key)
    }
}

/// String-keyed settings map as supplied by the environment
///
/// An absent key and an empty value are treated the same everywhere.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings(HashMap<String, String>);

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect recognised settings from the process environment
    pub fn from_env() -> Self {
        Self::from_vars(SettingKey::ALL.iter().filter_map(|key| {
            std::env::var(key.as_str())
                .ok()
                .map(|value| (key.as_str().to_string(), value))
        }))
    }

    /// Build from arbitrary `(key, value)` pairs, keeping only recognised keys
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        vars.into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(k, _)| SettingKey::from_key(k).is_some())
            .collect()
    }

    /// Value for `key`, empty when absent
    pub fn get(&self, key: &str) -> &str {
        self.0.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn setting(&self, key: SettingKey) -> &str {
        self.get(key.as_str())
    }

    /// True when the key is present with a non-empty value
    pub fn is_set(&self, key: SettingKey) -> bool {
        !self.setting(key).is_empty()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Overlay non-empty values from `other`
    pub fn merge(&mut self, other: Settings) {
        for (key, value) in other.0 {
            if !value.is_empty() {
                self.0.insert(key, value);
            }
        }
    }

    /// Fill absent or empty settings with their defaults
    pub fn with_defaults(mut self, authn_type: Option<AuthnType>) -> Self {
        let mut defaults = vec![
            (
                SettingKey::ClientCertRetryCountLimit,
                DEFAULT_CLIENT_CERT_RETRY_COUNT_LIMIT,
            ),
            (SettingKey::TokenTimeout, DEFAULT_TOKEN_TIMEOUT),
            (SettingKey::AuthnTokenFile, DEFAULT_TOKEN_FILE_PATH),
            (SettingKey::ClientCertPath, DEFAULT_CLIENT_CERT_PATH),
        ];
        if authn_type == Some(AuthnType::Jwt) {
            defaults.push((SettingKey::JwtTokenPath, DEFAULT_JWT_TOKEN_PATH));
        }

        for (key, value) in defaults {
            if !self.is_set(key) {
                tracing::debug!("Using default for {}: {}", key.as_str(), value);
                self.set(key.as_str(), value);
            }
        }
        self
    }

    /// Validate every entry, reporting all failures at once
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut entries: Vec<(&str, &str)> = self.iter().collect();
        entries.sort_unstable();

        let errors: Vec<ConfigError> = entries
            .into_iter()
            .filter_map(|(key, value)| validation::validate_setting(key, value).err())
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }

    /// Authenticator type named by `CONJUR_AUTHN_URL`
    pub fn authn_type(&self) -> Result<AuthnType, ConfigError> {
        let url = self.setting(SettingKey::AuthnUrl);
        if url.is_empty() {
            return Err(missing(SettingKey::AuthnUrl));
        }
        AuthnType::from_url(url)
    }

    /// Check the settings every attempt of `authn_type` needs
    pub fn check_required(&self, authn_type: AuthnType) -> Result<(), ConfigError> {
        let mut required = vec![SettingKey::AuthnUrl, SettingKey::Account];
        if authn_type == AuthnType::Kubernetes {
            required.extend([
                SettingKey::AuthnLogin,
                SettingKey::PodName,
                SettingKey::PodNamespace,
            ]);
        }

        let errors: Vec<ConfigError> = required
            .into_iter()
            .filter(|key| !self.is_set(*key))
            .map(missing)
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Settings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Settings(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

fn missing(key: SettingKey) -> ConfigError {
    ConfigError::MissingSetting {
        key: key.as_str().to_string(),
    }
}

/// Typed configuration assembled from validated settings
#[derive(Clone, Debug)]
pub struct Config {
    pub authn_type: AuthnType,
    pub account: String,
    pub url: String,

    // Identity
    pub username: Option<Username>,
    pub pod_name: Option<String>,
    pub pod_namespace: Option<String>,

    // Certificates and token locations
    pub ssl_certificate: Vec<u8>,
    pub client_cert_path: PathBuf,
    pub token_file_path: PathBuf,
    pub jwt_token_path: Option<PathBuf>,

    // Limits
    pub client_cert_retry_count_limit: i64,
    pub token_timeout: Duration,

    pub container_mode: Option<String>,
    pub debug: bool,
}

impl Config {
    /// Validate `settings` and build the typed configuration
    ///
    /// Defaults are applied first. Every validation and missing-setting
    /// failure is reported together before the certificate is resolved
    /// through `read_file`.
    pub fn from_settings<F>(settings: &Settings, read_file: F) -> Result<Self, ConfigError>
    where
        F: FnOnce(&Path) -> std::io::Result<Vec<u8>>,
    {
        let mut errors = Vec::new();

        let authn_type = match settings.authn_type() {
            Ok(authn_type) => Some(authn_type),
            Err(e) => {
                errors.push(e);
                None
            }
        };

        let settings = settings.clone().with_defaults(authn_type);

        if let Err(e) = settings.validate() {
            errors.extend(e.into_errors());
        }
        if let Some(authn_type) = authn_type {
            if let Err(e) = settings.check_required(authn_type) {
                errors.extend(e.into_errors());
            }
        }

        let authn_type = match authn_type {
            Some(authn_type) if errors.is_empty() => authn_type,
            _ => return Err(ConfigError::Invalid(errors)),
        };

        let ssl_certificate = read_ssl_cert(&settings, read_file)?;

        let login = settings.setting(SettingKey::AuthnLogin);
        let username = if login.is_empty() {
            None
        } else {
            Some(Username::new(login)?)
        };

        let config = Config {
            authn_type,
            account: settings.setting(SettingKey::Account).to_string(),
            url: settings.setting(SettingKey::AuthnUrl).to_string(),
            username,
            pod_name: optional(&settings, SettingKey::PodName),
            pod_namespace: optional(&settings, SettingKey::PodNamespace),
            ssl_certificate,
            client_cert_path: PathBuf::from(settings.setting(SettingKey::ClientCertPath)),
            token_file_path: PathBuf::from(settings.setting(SettingKey::AuthnTokenFile)),
            jwt_token_path: optional(&settings, SettingKey::JwtTokenPath).map(PathBuf::from),
            client_cert_retry_count_limit: validation::parse_int(
                SettingKey::ClientCertRetryCountLimit.as_str(),
                settings.setting(SettingKey::ClientCertRetryCountLimit),
            )?,
            token_timeout: validation::parse_duration(
                SettingKey::TokenTimeout.as_str(),
                settings.setting(SettingKey::TokenTimeout),
            )?,
            container_mode: optional(&settings, SettingKey::ContainerMode),
            debug: settings.setting(SettingKey::Debug).eq_ignore_ascii_case("true"),
        };

        tracing::info!(
            "Configuration loaded: authenticator={}, account={}, login={}",
            config.authn_type,
            config.account,
            config
                .username
                .as_ref()
                .map(Username::full)
                .unwrap_or("<none>")
        );

        Ok(config)
    }
}

fn optional(settings: &Settings, key: SettingKey) -> Option<String> {
    Some(settings.setting(key))
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Conjur authentication settings check
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// JSON file with settings (object of string values); environment wins
    #[arg(short = 'f', long, env = "CONJUR_SETTINGS_FILE")]
    pub settings_file: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON
    #[arg(long, env = "LOG_JSON", default_value = "false")]
    pub json_logs: bool,
}

/// Load settings from a JSON file
pub fn load_settings_file(path: &Path) -> anyhow::Result<Settings> {
    use anyhow::Context;

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse settings file: {}", path.display()))
}

/// Expand tilde (~) in file paths to user's home directory
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
