use crate::domain::model::Credential;
use crate::domain::ports::CredentialStore;
use crate::utils::error::AuthenticationError;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Token file on local disk.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn store_error(&self, source: std::io::Error) -> AuthenticationError {
        AuthenticationError::Store {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> Result<Option<Credential>, AuthenticationError> {
        let data = match tokio::fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No persisted credential");
                return Ok(None);
            }
            Err(e) => return Err(self.store_error(e)),
        };

        let credential = serde_json::from_slice(&data).map_err(|source| {
            AuthenticationError::MalformedCredential {
                path: self.path.display().to_string(),
                source,
            }
        })?;

        tracing::debug!(path = %self.path.display(), "Loaded persisted credential");
        Ok(Some(credential))
    }

    async fn save(&self, credential: &Credential) -> Result<(), AuthenticationError> {
        let json = serde_json::to_vec_pretty(credential)
            .map_err(|e| self.store_error(std::io::Error::other(e)))?;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || write_atomically(&path, &json))
            .await
            .map_err(|e| self.store_error(std::io::Error::other(e)))?
            .map_err(|e| self.store_error(e))?;

        tracing::debug!(path = %self.path.display(), "Persisted credential");
        Ok(())
    }
}

/// Temp file in the target directory, then rename over the target.
fn write_atomically(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    // NamedTempFile is created with mode 0600 on Unix.
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
