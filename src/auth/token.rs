// Access token storage
// Authenticators publish tokens here; callers read them without network I/O

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::TokenError;

/// Opaque store for the most recently obtained access token
pub trait AccessToken: Send + Sync {
    /// Current token bytes, `TokenError::Empty` if none was written
    fn read(&self) -> Result<Vec<u8>, TokenError>;

    /// Replace the stored token
    fn write(&self, data: &[u8]) -> Result<(), TokenError>;

    /// Forget the stored token
    fn delete(&self) -> Result<(), TokenError>;
}

/// In-memory token store
#[derive(Debug, Default)]
pub struct MemoryAccessToken {
    data: RwLock<Vec<u8>>,
}

impl MemoryAccessToken {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AccessToken for MemoryAccessToken {
    fn read(&self) -> Result<Vec<u8>, TokenError> {
        let data = self.data.read().unwrap_or_else(|e| e.into_inner());
        if data.is_empty() {
            return Err(TokenError::Empty);
        }
        Ok(data.clone())
    }

    fn write(&self, data: &[u8]) -> Result<(), TokenError> {
        if data.is_empty() {
            return Err(TokenError::EmptyData);
        }
        let mut stored = self.data.write().unwrap_or_else(|e| e.into_inner());
        *stored = data.to_vec();
        Ok(())
    }

    fn delete(&self) -> Result<(), TokenError> {
        let mut stored = self.data.write().unwrap_or_else(|e| e.into_inner());
        stored.clear();
        Ok(())
    }
}

/// File-backed token store, shared with sidecar consumers
#[derive(Debug, Clone)]
pub struct FileAccessToken {
    path: PathBuf,
}

impl FileAccessToken {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> TokenError {
        TokenError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl AccessToken for FileAccessToken {
    fn read(&self) -> Result<Vec<u8>, TokenError> {
        match std::fs::read(&self.path) {
            Ok(data) if data.is_empty() => Err(TokenError::Empty),
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(TokenError::Empty),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn write(&self, data: &[u8]) -> Result<(), TokenError> {
        if data.is_empty() {
            return Err(TokenError::EmptyData);
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        std::fs::write(&self.path, data).map_err(|e| self.io_error(e))?;
        tracing::debug!("Access token written to {}", self.path.display());
        Ok(())
    }

    fn delete(&self) -> Result<(), TokenError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}
