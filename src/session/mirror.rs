use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{debug, info};

use crate::cache::token::CachedToken;

/// Persisted copy of the current token for session bootstrap.
///
/// Written after each refresh and removed on sign-out. The request path never
/// reads it back; the in-memory cache stays authoritative.
#[derive(Debug, Clone)]
pub struct FileTokenMirror {
    path: PathBuf,
}

impl FileTokenMirror {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomic write: tmp file with 0600 permissions, then rename
    pub async fn store(&self, token: &CachedToken) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("tmp");
        let content = serde_json::to_vec(token)?;
        tokio::fs::write(&tmp, content).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600)).await?;
        }

        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), "token mirror written");
        Ok(())
    }

    pub async fn load(&self) -> Result<Option<CachedToken>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(_) => {
                info!("Deleted token mirror: {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Token mirror not found, nothing to delete: {}", self.path.display());
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
