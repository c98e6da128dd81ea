// Error handling module
// Defines configuration, token and authentication error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while validating settings or assembling configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Login identity present but malformed
    #[error("Invalid username '{value}': {reason}")]
    InvalidUsername { value: String, reason: String },

    /// Setting value is not an integer
    #[error("Setting {key} provided an invalid integer value: '{value}'")]
    InvalidInteger { key: String, value: String },

    /// Setting value is not a duration
    #[error("Setting {key} provided an invalid duration value: '{value}'")]
    InvalidDuration { key: String, value: String },

    /// Path neither exists nor can be created
    #[error("Path is not usable (cannot be read or created): {}", .path.display())]
    PathNotUsable { path: PathBuf },

    /// Neither inline certificate nor certificate file configured
    #[error("No SSL certificate source configured: set CONJUR_SSL_CERTIFICATE or CONJUR_CERT_FILE")]
    MissingCertificateSource,

    /// Reading the certificate file failed
    #[error("Failed to read SSL certificate from {}: {source}", .path.display())]
    CertificateRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Required setting absent or empty
    #[error("Required setting {key} is missing")]
    MissingSetting { key: String },

    /// Authentication URL does not name a supported authenticator
    #[error("Unable to detect authenticator type from URL: '{url}'")]
    UnknownAuthnType { url: String },

    /// Several settings failed at once
    #[error("Invalid settings: {}", join_errors(.0))]
    Invalid(Vec<ConfigError>),
}

impl ConfigError {
    /// Flatten nested `Invalid` lists into their individual failures
    pub fn into_errors(self) -> Vec<ConfigError> {
        match self {
            ConfigError::Invalid(errors) => errors
                .into_iter()
                .flat_map(ConfigError::into_errors)
                .collect(),
            other => vec![other],
        }
    }
}

fn join_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors from access token stores
#[derive(Error, Debug)]
pub enum TokenError {
    /// No token has been written yet
    #[error("Access token is empty")]
    Empty,

    /// Attempt to store an empty token
    #[error("Refusing to store empty access token data")]
    EmptyData,

    /// Filesystem failure on a file-backed store
    #[error("Access token file error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors returned by authenticator implementations
#[derive(Error, Debug)]
pub enum AuthError {
    /// Attempt aborted by the caller before completion
    #[error("Authentication cancelled")]
    Cancelled,

    /// Attempt did not finish before the context deadline
    #[error("Authentication deadline exceeded")]
    DeadlineExceeded,

    /// Configuration rejected before any attempt was made
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Token store failure
    #[error("Access token error: {0}")]
    Token(#[from] TokenError),

    /// Strategy-defined failure
    #[error("Authentication failed: {0}")]
    Failed(#[from] anyhow::Error),
}

impl AuthError {
    /// True for errors caused by the context rather than the strategy
    pub fn is_cancellation(&self) -> bool {
        matches!(self, AuthError::Cancelled | AuthError::DeadlineExceeded)
    }
}

/// Result type alias for authentication operations
pub type Result<T> = std::result::Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ConfigError::InvalidInteger {
            key: "CONJUR_CLIENT_CERT_RETRY_COUNT_LIMIT".to_string(),
            value: "abc".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Setting CONJUR_CLIENT_CERT_RETRY_COUNT_LIMIT provided an invalid integer value: 'abc'"
        );

        let err = ConfigError::PathNotUsable {
            path: PathBuf::from("/nope/token"),
        };
        assert_eq!(
            err.to_string(),
            "Path is not usable (cannot be read or created): /nope/token"
        );

        let err = ConfigError::MissingSetting {
            key: "CONJUR_ACCOUNT".to_string(),
        };
        assert_eq!(err.to_string(), "Required setting CONJUR_ACCOUNT is missing");
    }

    #[test]
    fn test_certificate_read_keeps_source() {
        use std::error::Error as _;

        let err = ConfigError::CertificateRead {
            path: PathBuf::from("/etc/ca.pem"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(err.to_string().contains("/etc/ca.pem"));
        let source = err.source().expect("source should be kept");
        assert_eq!(source.to_string(), "gone");
    }

    #[test]
    fn test_invalid_joins_messages() {
        let err = ConfigError::Invalid(vec![
            ConfigError::MissingCertificateSource,
            ConfigError::InvalidDuration {
                key: "CONJUR_TOKEN_TIMEOUT".to_string(),
                value: "soon".to_string(),
            },
        ]);
        let msg = err.to_string();
        assert!(msg.starts_with("Invalid settings: No SSL certificate source"));
        assert!(msg.contains("; Setting CONJUR_TOKEN_TIMEOUT"));
    }

    #[test]
    fn test_into_errors_flattens() {
        let err = ConfigError::Invalid(vec![
            ConfigError::MissingCertificateSource,
            ConfigError::Invalid(vec![ConfigError::MissingSetting {
                key: "CONJUR_ACCOUNT".to_string(),
            }]),
        ]);
        assert_eq!(err.into_errors().len(), 2);

        assert_eq!(ConfigError::MissingCertificateSource.into_errors().len(), 1);
    }

    #[test]
    fn test_auth_error_conversions() {
        let err: AuthError = ConfigError::MissingCertificateSource.into();
        assert!(matches!(err, AuthError::Config(_)));
        assert!(!err.is_cancellation());

        let err: AuthError = TokenError::Empty.into();
        assert_eq!(err.to_string(), "Access token error: Access token is empty");

        let err: AuthError = anyhow::anyhow!("401 Unauthorized").into();
        assert_eq!(err.to_string(), "Authentication failed: 401 Unauthorized");

        assert!(AuthError::Cancelled.is_cancellation());
        assert!(AuthError::DeadlineExceeded.is_cancellation());
    }
}
