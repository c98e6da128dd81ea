// Setting validation
// Per-key checks run before any authentication attempt

use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

use crate::auth::Username;
use crate::config::SettingKey;
use crate::error::ConfigError;

/// Validate a single setting
///
/// Only a handful of known keys carry rules; every other key, recognised
/// or not, is accepted as-is.
pub fn validate_setting(key: &str, value: &str) -> Result<(), ConfigError> {
    let Some(setting) = SettingKey::from_key(key) else {
        return Ok(());
    };

    tracing::debug!("Validating setting {}", key);

    match setting {
        SettingKey::AuthnLogin => validate_username(value),
        SettingKey::ClientCertRetryCountLimit => parse_int(key, value).map(|_| ()),
        SettingKey::TokenTimeout => parse_duration(key, value).map(|_| ()),
        SettingKey::JwtTokenPath => validate_path(Path::new(value)),
        SettingKey::SslCertificate
        | SettingKey::CertFile
        | SettingKey::AuthnUrl
        | SettingKey::Account
        | SettingKey::AuthnTokenFile
        | SettingKey::ClientCertPath
        | SettingKey::PodName
        | SettingKey::PodNamespace
        | SettingKey::ContainerMode
        | SettingKey::Debug => Ok(()),
    }
}

/// Empty login means "not supplied"
fn validate_username(value: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Ok(());
    }
    Username::new(value).map(|_| ())
}

/// Parse an integer setting
pub fn parse_int(key: &str, value: &str) -> Result<i64, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidInteger {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Parse a duration setting such as `30s`, `6m`, `1h 30m` or `6m0s`
pub fn parse_duration(key: &str, value: &str) -> Result<Duration, ConfigError> {
    if value == "0" {
        return Ok(Duration::ZERO);
    }
    humantime::parse_duration(value).map_err(|_| ConfigError::InvalidDuration {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Check that `path` exists or can be created
///
/// A missing file is probed by creating it exclusively and removing it
/// again. The probe is not atomic with respect to other processes, so the
/// result is advisory only.
pub fn validate_path(path: &Path) -> Result<(), ConfigError> {
    if std::fs::metadata(path).is_ok() {
        tracing::debug!("Path exists: {}", path.display());
        return Ok(());
    }

    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => {
            drop(file);
            if let Err(e) = std::fs::remove_file(path) {
                tracing::warn!(
                    "Probe file {} was created but could not be removed: {}",
                    path.display(),
                    e
                );
            }
            tracing::debug!("Path is creatable: {}", path.display());
            Ok(())
        }
        // Someone else created it between the two checks
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(()),
        Err(e) => {
            tracing::debug!("Path probe failed for {}: {}", path.display(), e);
            Err(ConfigError::PathNotUsable {
                path: path.to_path_buf(),
            })
        }
    }
}
