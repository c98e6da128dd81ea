// Authentication types

use std::fmt;

use crate::error::ConfigError;

const HOST_PREFIX: &str = "host";

/// Type of authentication mechanism
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthnType {
    /// Certificate-based Kubernetes authenticator (authn-k8s)
    Kubernetes,

    /// Token-based JWT authenticator (authn-jwt)
    Jwt,
}

impl AuthnType {
    /// Detect the authenticator from the configured authentication URL
    pub fn from_url(url: &str) -> Result<Self, ConfigError> {
        if url.contains("authn-jwt") {
            Ok(AuthnType::Jwt)
        } else if url.contains("authn-k8s") {
            Ok(AuthnType::Kubernetes)
        } else {
            Err(ConfigError::UnknownAuthnType {
                url: url.to_string(),
            })
        }
    }
}

impl fmt::Display for AuthnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthnType::Kubernetes => f.write_str("authn-k8s"),
            AuthnType::Jwt => f.write_str("authn-jwt"),
        }
    }
}

/// Conjur host identity used as the login principal
///
/// Always normalised to start with `host/`. The prefix is the policy
/// branch in dotted form and the suffix is the host id, e.g.
/// `host/apps/team/app1` has prefix `host.apps.team` and suffix `app1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Username {
    full: String,
    prefix: String,
    suffix: String,
}

impl Username {
    /// Parse and validate a login identity
    pub fn new(raw: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidUsername {
            value: raw.to_string(),
            reason: reason.to_string(),
        };

        if raw.is_empty() {
            return Err(invalid("username is empty"));
        }

        let mut segments: Vec<&str> = raw.split('/').collect();
        if segments.len() < 2 {
            return Err(invalid(
                "expected a policy path such as 'host/<policy-branch>/<host-id>'",
            ));
        }
        if segments.iter().any(|s| s.is_empty()) {
            return Err(invalid("username contains an empty path segment"));
        }

        if segments[0] == HOST_PREFIX {
            segments.remove(0);
        }

        let Some((suffix, branch)) = segments.split_last() else {
            return Err(invalid("username does not name a host id"));
        };

        let full = format!("{}/{}", HOST_PREFIX, segments.join("/"));
        let prefix = std::iter::once(HOST_PREFIX)
            .chain(branch.iter().copied())
            .collect::<Vec<_>>()
            .join(".");

        Ok(Self {
            full,
            prefix,
            suffix: suffix.to_string(),
        })
    }

    /// Full normalised identity (`host/...`)
    pub fn full(&self) -> &str {
        &self.full
    }

    /// Policy branch in dotted form, starting with `host`
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Host id (final path segment)
    pub fn suffix(&self) -> &str {
        &self.suffix
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_with_host_prefix() {
        let username = Username::new("host/apps/team/app1").unwrap();
        assert_eq!(username.full(), "host/apps/team/app1");
        assert_eq!(username.prefix(), "host.apps.team");
        assert_eq!(username.suffix(), "app1");
    }

    #[test]
    fn test_username_without_host_prefix() {
        let username = Username::new("apps/app1").unwrap();
        assert_eq!(username.full(), "host/apps/app1");
        assert_eq!(username.prefix(), "host.apps");
        assert_eq!(username.suffix(), "app1");
        assert_eq!(username.to_string(), "host/apps/app1");
    }

    #[test]
    fn test_username_host_only_branch() {
        let username = Username::new("host/app1").unwrap();
        assert_eq!(username.full(), "host/app1");
        assert_eq!(username.prefix(), "host");
        assert_eq!(username.suffix(), "app1");
    }

    #[test]
    fn test_username_rejects_malformed() {
        for raw in ["", "app1", "host/", "/app1", "apps//app1", "apps/app1/"] {
            let err = Username::new(raw).unwrap_err();
            assert!(
                matches!(err, ConfigError::InvalidUsername { ref value, .. } if value == raw),
                "expected InvalidUsername for {raw:?}, got {err:?}"
            );
        }
    }

    #[test]
    fn test_authn_type_from_url() {
        assert_eq!(
            AuthnType::from_url("https://conjur.example.com/authn-k8s/cluster").unwrap(),
            AuthnType::Kubernetes
        );
        assert_eq!(
            AuthnType::from_url("https://conjur.example.com/authn-jwt/k8s").unwrap(),
            AuthnType::Jwt
        );
        assert!(matches!(
            AuthnType::from_url("https://conjur.example.com/authn-ldap/x"),
            Err(ConfigError::UnknownAuthnType { .. })
        ));
    }

    #[test]
    fn test_authn_type_display() {
        assert_eq!(AuthnType::Kubernetes.to_string(), "authn-k8s");
        assert_eq!(AuthnType::Jwt.to_string(), "authn-jwt");
    }
}
