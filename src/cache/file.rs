use super::{decode_entry, encode_entry, validate_login, CacheBackend, CacheKey};
use crate::error::Result;
use crate::models::StarRecord;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tracing::{debug, warn};

const ENTRY_EXTENSION: &str = "json";

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// One JSON file per entry at `<root>/<login>/<YYYY-MM-DD>.json`
#[derive(Debug, Clone)]
pub struct FileCacheBackend {
    root: PathBuf,
}

impl FileCacheBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.root
            .join(&key.login)
            .join(format!("{}.{}", key.date.format("%Y-%m-%d"), ENTRY_EXTENSION))
    }

    async fn dated_entries(&self, login: &str, dir: &Path) -> Result<Vec<CacheKey>> {
        let mut keys = Vec::new();
        let mut files = fs::read_dir(dir).await?;

        while let Some(file) = files.next_entry().await? {
            let path = file.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ENTRY_EXTENSION) {
                continue;
            }
            let date = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok());
            match date {
                Some(date) => keys.push(CacheKey {
                    login: login.to_string(),
                    date,
                }),
                None => {
                    debug!(path = %path.display(), "Ignoring non-entry file in cache directory")
                }
            }
        }

        Ok(keys)
    }
}

#[async_trait]
impl CacheBackend for FileCacheBackend {
    async fn load(&self, key: &CacheKey) -> Result<Option<Vec<StarRecord>>> {
        match fs::read(self.entry_path(key)).await {
            Ok(bytes) => Ok(Some(decode_entry(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn store(&self, key: &CacheKey, records: &[StarRecord]) -> Result<()> {
        let path = self.entry_path(key);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).await?;
        }

        // Write aside then rename so readers never see a partial entry
        let temp = path.with_extension(format!(
            "tmp-{}-{}",
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        fs::write(&temp, encode_entry(records)?).await?;
        if let Err(e) = fs::rename(&temp, &path).await {
            let _ = fs::remove_file(&temp).await;
            return Err(e.into());
        }

        Ok(())
    }

    async fn keys(&self) -> Result<Vec<CacheKey>> {
        let mut keys = Vec::new();
        let mut logins = match fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(keys),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = logins.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let Some(login) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if validate_login(&login).is_err() {
                warn!(dir = %entry.path().display(), "Skipping unexpected cache directory");
                continue;
            }
            keys.extend(self.dated_entries(&login, &entry.path()).await?);
        }

        Ok(keys)
    }

    async fn remove(&self, key: &CacheKey) -> Result<()> {
        match fs::remove_file(self.entry_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
