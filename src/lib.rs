// Conjur authentication client - library root

pub mod auth;
pub mod config;
pub mod error;
pub mod validation;

pub use auth::{AccessToken, AuthContext, Authenticator, Username};
pub use config::{Config, SettingKey, Settings};
pub use error::{AuthError, ConfigError, TokenError};
pub use validation::{validate_path, validate_setting};
