use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Result;
use chrono::Utc;
use tokio::fs;

use super::compute_hash;

const FILENAME_HASH_LEN: usize = 32;
const GENERATED_EXTENSION: &str = "png";

static FILENAME_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Flat directory holding the generated images, keyed by filename.
#[derive(Clone, Debug)]
pub struct LocalFileStorage {
    base_dir: PathBuf,
}

impl LocalFileStorage {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub async fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.base_dir).await?;
        Ok(())
    }

    /// Returns a fresh `<32 hex>.png` name. Unique within the process even
    /// when two calls land on the same timestamp.
    pub fn generate_filename() -> String {
        let timestamp = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let sequence = FILENAME_COUNTER.fetch_add(1, Ordering::Relaxed);
        let hash = compute_hash(&format!(
            "generate:{timestamp}:{sequence}:{}",
            std::process::id()
        ));
        format!("{}.{GENERATED_EXTENSION}", &hash[..FILENAME_HASH_LEN])
    }

    pub async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.resolve_path(key);
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn size(&self, key: &str) -> Result<u64> {
        let metadata = fs::metadata(self.resolve_path(key)).await?;
        Ok(metadata.len())
    }

    /// Best-effort removal. A missing file is reported as `Ok(false)`.
    pub async fn remove(&self, key: &str) -> Result<bool> {
        match fs::remove_file(self.resolve_path(key)).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    pub fn resolve_path(&self, key: &str) -> PathBuf {
        let normalized = key.trim_start_matches('/');
        self.base_dir.join(Path::new(normalized))
    }

    /// Only bare names are served from the upload directory.
    pub fn is_safe_filename(name: &str) -> bool {
        !name.is_empty()
            && !name.starts_with('.')
            && !name.contains(['/', '\\', '\0', '"'])
    }
}
