// Authentication module
// Authenticator contract, identity types, certificate resolution and token stores

mod authenticator;
mod credentials;
mod token;
mod types;

pub use authenticator::{AuthContext, Authenticator, CancelHandle};
pub use credentials::{read_file, read_ssl_cert};
pub use token::{AccessToken, FileAccessToken, MemoryAccessToken};
pub use types::{AuthnType, Username};
