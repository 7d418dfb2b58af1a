use crate::pdf::{sniff_mime, PDF_MIME};
use crate::traits::{StorageError, StorageResult, UploadStore};
use async_trait::async_trait;
use chrono::Utc;
use commutator_core::PendingUpload;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use uuid::Uuid;

const MAX_LABEL_LEN: usize = 64;

#[derive(Debug, Clone)]
pub struct FileStoreConfig {
    /// Dedicated directory; nothing else should live here
    pub dir: PathBuf,
    pub max_file_size: usize,
    pub ttl: Duration,
}

impl FileStoreConfig {
    pub fn new(dir: impl Into<PathBuf>, max_file_size: usize, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            max_file_size,
            ttl,
        }
    }
}

/// Temp-directory store for uploaded PDFs.
///
/// Cloning is cheap and every clone shares the same timers. Each saved file owns a
/// child of the store's shutdown token; `discard` cancels it, `shutdown` cancels them all.
#[derive(Clone)]
pub struct FileStore {
    inner: Arc<Inner>,
}

struct Inner {
    config: FileStoreConfig,
    shutdown: CancellationToken,
    timers: Mutex<HashMap<Uuid, CancellationToken>>,
    tracker: TaskTracker,
}

impl Inner {
    fn timers(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, CancellationToken>> {
        // The map holds no invariant a panicking holder could break.
        self.timers.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl FileStore {
    /// Create the store, creating the directory if needed.
    pub async fn new(config: FileStoreConfig) -> StorageResult<Self> {
        if config.max_file_size == 0 {
            return Err(StorageError::ConfigError(
                "max_file_size must be greater than zero".to_string(),
            ));
        }

        fs::create_dir_all(&config.dir).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create temp directory {}: {}",
                config.dir.display(),
                e
            ))
        })?;

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                shutdown: CancellationToken::new(),
                timers: Mutex::new(HashMap::new()),
                tracker: TaskTracker::new(),
            }),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.inner.config.dir
    }

    pub fn max_file_size(&self) -> usize {
        self.inner.config.max_file_size
    }

    pub fn ttl(&self) -> Duration {
        self.inner.config.ttl
    }

    /// Number of deferred deletions still armed.
    pub fn pending_deletions(&self) -> usize {
        self.inner.timers().len()
    }

    fn check_label(label: &str) -> StorageResult<()> {
        let valid = !label.is_empty()
            && label.len() <= MAX_LABEL_LEN
            && label
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if valid {
            Ok(())
        } else {
            Err(StorageError::InvalidLabel(label.to_string()))
        }
    }

    #[tracing::instrument(skip(self, data), fields(label = %label, size = data.len()))]
    pub async fn save(&self, data: &[u8], label: &str) -> StorageResult<PendingUpload> {
        let max = self.inner.config.max_file_size;
        if data.len() > max {
            return Err(StorageError::TooLarge {
                size: data.len(),
                max,
            });
        }
        Self::check_label(label)?;

        let id = Uuid::new_v4();
        let file_name = format!("{}_{}.pdf", label, id);
        let path = self.inner.config.dir.join(&file_name);

        write_private(&path, data).await?;

        let sha256 = hex::encode(Sha256::digest(data));
        let detected = sniff_mime(data);
        if detected != PDF_MIME {
            remove_if_exists(&path).await?;
            tracing::warn!(
                file = %file_name,
                detected = %detected,
                "Rejected upload with non-PDF content"
            );
            return Err(StorageError::InvalidType {
                detected: detected.to_string(),
            });
        }

        let created_at = Utc::now();
        let ttl = self.inner.config.ttl;
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|d| created_at.checked_add_signed(d))
            .unwrap_or(chrono::DateTime::<Utc>::MAX_UTC);

        let upload = PendingUpload {
            id,
            path,
            label: label.to_string(),
            file_name,
            size: data.len() as u64,
            sha256,
            mime_type: detected.to_string(),
            created_at,
            expires_at,
        };

        self.arm_deletion(&upload);

        tracing::debug!(
            upload_id = %upload.id,
            path = %upload.path.display(),
            sha256 = %upload.sha256,
            "Temp file saved"
        );

        Ok(upload)
    }

    fn arm_deletion(&self, upload: &PendingUpload) {
        let token = self.inner.shutdown.child_token();
        self.inner.timers().insert(upload.id, token.clone());

        let inner = Arc::clone(&self.inner);
        let id = upload.id;
        let path = upload.path.clone();
        let ttl = inner.config.ttl;

        self.inner.tracker.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(ttl) => {
                    match remove_if_exists(&path).await {
                        Ok(true) => tracing::info!(
                            upload_id = %id,
                            path = %path.display(),
                            "Expired temp file deleted"
                        ),
                        Ok(false) => {}
                        Err(e) => tracing::warn!(
                            upload_id = %id,
                            path = %path.display(),
                            error = %e,
                            "Failed to delete expired temp file"
                        ),
                    }
                }
            }
            inner.timers().remove(&id);
        });
    }

    #[tracing::instrument(skip(self, upload), fields(upload_id = %upload.id))]
    pub async fn discard(&self, upload: &PendingUpload) -> StorageResult<bool> {
        if let Some(token) = self.inner.timers().remove(&upload.id) {
            token.cancel();
        }
        let removed = remove_if_exists(&upload.path).await?;
        if removed {
            tracing::debug!(path = %upload.path.display(), "Temp file discarded");
        }
        Ok(removed)
    }

    /// Abandon every pending deferred deletion and wait for the timer tasks to exit.
    ///
    /// Files whose timers are abandoned stay on disk for the directory sweep.
    pub async fn shutdown(&self) {
        let abandoned = self.pending_deletions();
        self.inner.shutdown.cancel();
        self.inner.tracker.close();
        self.inner.tracker.wait().await;

        if abandoned > 0 {
            tracing::info!(
                abandoned,
                dir = %self.inner.config.dir.display(),
                "Abandoned pending temp file deletions"
            );
        }
    }
}

#[async_trait]
impl UploadStore for FileStore {
    async fn save(&self, data: &[u8], label: &str) -> StorageResult<PendingUpload> {
        FileStore::save(self, data, label).await
    }

    async fn discard(&self, upload: &PendingUpload) -> StorageResult<bool> {
        FileStore::discard(self, upload).await
    }
}

async fn write_private(path: &Path, data: &[u8]) -> StorageResult<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path).await?;
    let written = async {
        file.write_all(data).await?;
        file.sync_all().await
    }
    .await;

    if let Err(e) = written {
        drop(file);
        let _ = remove_if_exists(path).await;
        return Err(e.into());
    }
    Ok(())
}

/// Delete `path`, treating an already-missing file as success.
pub(crate) async fn remove_if_exists(path: &Path) -> std::io::Result<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}
