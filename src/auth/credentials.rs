// SSL certificate resolution from settings

use std::path::Path;

use crate::config::{SettingKey, Settings};
use crate::error::ConfigError;

/// Default file reader backed by the real filesystem
pub fn read_file(path: &Path) -> std::io::Result<Vec<u8>> {
    std::fs::read(path)
}

/// Resolve the Conjur CA certificate
///
/// An inline `CONJUR_SSL_CERTIFICATE` wins over `CONJUR_CERT_FILE`; the
/// file is only read through `read_file` when no inline value is set.
pub fn read_ssl_cert<F>(settings: &Settings, read_file: F) -> Result<Vec<u8>, ConfigError>
where
    F: FnOnce(&Path) -> std::io::Result<Vec<u8>>,
{
    let inline = settings.setting(SettingKey::SslCertificate);
    let cert_path = settings.setting(SettingKey::CertFile);

    if inline.is_empty() && cert_path.is_empty() {
        return Err(ConfigError::MissingCertificateSource);
    }

    if !inline.is_empty() {
        tracing::info!("Using inline SSL certificate from CONJUR_SSL_CERTIFICATE");
        return Ok(inline.as_bytes().to_vec());
    }

    tracing::info!("Reading SSL certificate from {}", cert_path);
    let path = Path::new(cert_path);
    read_file(path).map_err(|source| ConfigError::CertificateRead {
        path: path.to_path_buf(),
        source,
    })
}
