//! Session cache persisted as JSON files.

use super::{decode_live, SessionCache, SessionKey, SessionToken};
use crate::error::CacheError;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, trace, warn};

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

const APP_DIR: &str = "aws-tempcreds";
const SESSIONS_DIR: &str = "sessions";

/// Session cache storing one JSON file per key in a private directory.
///
/// File names are the SHA-256 of the key, so account names and MFA serials
/// never need escaping. Each write goes to its own temporary file, created
/// `0600` on Unix, which is then renamed over the entry; the directory is
/// `0700`. Concurrent writers for one key never see each other's partial
/// output and the last rename wins.
/// Entries past their hard expiration are deleted when read.
#[derive(Debug, Clone)]
pub struct FileSessionCache {
    dir: PathBuf,
}

impl FileSessionCache {
    /// Cache rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Cache in the per-user cache directory, e.g.
    /// `~/.cache/aws-tempcreds/sessions`.
    pub fn default_location() -> Result<Self, CacheError> {
        let base = dirs::cache_dir().ok_or_else(|| CacheError::Backend {
            message: "unable to determine the user cache directory".to_string(),
        })?;
        Ok(Self::new(base.join(APP_DIR).join(SESSIONS_DIR)))
    }

    /// The directory holding the entries.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &SessionKey) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(key.account().as_bytes());
        hasher.update([0u8]);
        hasher.update(key.mfa_serial().as_bytes());
        self.dir.join(format!("{}.json", hex::encode(hasher.finalize())))
    }

    fn tmp_path(path: &Path) -> PathBuf {
        let n = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        path.with_extension(format!("json.{}.{}.tmp", std::process::id(), n))
    }

    async fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
        let mut options = fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(path).await?;
        file.write_all(contents).await?;
        file.sync_all().await?;
        Ok(())
    }

    async fn ensure_dir(&self) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.dir, std::fs::Permissions::from_mode(0o700)).await?;
        }

        Ok(())
    }
}

#[async_trait]
impl SessionCache for FileSessionCache {
    async fn retrieve(&self, key: &SessionKey) -> Result<Option<SessionToken>, CacheError> {
        let path = self.entry_path(key);

        let json = match fs::read_to_string(&path).await {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                trace!("No cached session for {}", key);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        match decode_live(&json)? {
            Some(token) => Ok(Some(token)),
            None => {
                debug!("Removing expired cached session for {}", key);
                fs::remove_file(&path).await.or_else(|e| match e.kind() {
                    ErrorKind::NotFound => Ok(()),
                    _ => Err(e),
                })?;
                Ok(None)
            }
        }
    }

    async fn store(&self, key: &SessionKey, token: &SessionToken) -> Result<(), CacheError> {
        self.ensure_dir().await?;

        let path = self.entry_path(key);
        let tmp = Self::tmp_path(&path);
        let json = token.to_json()?;

        let result = match Self::write_private(&tmp, json.as_bytes()).await {
            Ok(()) => fs::rename(&tmp, &path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            if let Err(cleanup) = fs::remove_file(&tmp).await {
                if cleanup.kind() != ErrorKind::NotFound {
                    warn!("Failed to remove temporary file {:?}: {}", tmp, cleanup);
                }
            }
            return Err(e.into());
        }

        debug!("Stored session for {} in {:?}", key, path);
        Ok(())
    }
}
