//! Filesystem cache backend.
//!
//! One file per entry, named after a SHA-256 digest of the key. The file's
//! modification time holds the expiry instant and the first bytes hold a
//! flag header (see [`CacheValue::encode`]).
//!
//! Counters are adjusted under an exclusive advisory lock on the entry's
//! file, held for the whole read-modify-write, so concurrent adjusters in
//! different processes never lose an update. Entries created through
//! [`CacheBackend::add`] are linked into place and never renamed over,
//! which keeps the locked inode and the visible file the same.

use crate::error::{CacheError, CacheResult};
use crate::traits::{CacheBackend, effective_ttl};
use crate::value::{CacheValue, encode_counter, split_header};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Modification time given to entries that never expire (2100-01-01).
const NEVER_EXPIRES_SECS: u64 = 4_102_444_800;

/// Filesystem cache configuration.
#[derive(Debug, Clone)]
pub struct FilesystemConfig {
    /// Directory holding the cache files.
    pub dir: PathBuf,
    /// Prefix for every cache file name; `clear` only touches these files.
    pub file_prefix: String,
    /// Create the directory if it doesn't exist.
    pub create_directories: bool,
}

impl Default for FilesystemConfig {
    fn default() -> Self {
        Self {
            dir: std::env::temp_dir(),
            file_prefix: "cache_".to_string(),
            create_directories: false,
        }
    }
}

impl FilesystemConfig {
    /// Create configuration for a directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Default::default()
        }
    }

    /// Set the file name prefix.
    pub fn with_file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.file_prefix = prefix.into();
        self
    }

    /// Create the directory on construction when missing.
    pub fn with_create_directories(mut self, create: bool) -> Self {
        self.create_directories = create;
        self
    }
}

/// Filesystem cache store.
#[derive(Clone)]
pub struct FilesystemCache {
    store: Arc<FileStore>,
}

impl FilesystemCache {
    /// Create a filesystem cache.
    ///
    /// Fails with a configuration error when the directory is missing (and
    /// not to be created) or not writable.
    pub async fn new(config: FilesystemConfig) -> CacheResult<Self> {
        if config.create_directories {
            tokio::fs::create_dir_all(&config.dir).await.map_err(|e| {
                CacheError::Config(format!(
                    "Failed to create cache directory {:?}: {}",
                    config.dir, e
                ))
            })?;
        }

        let is_dir = tokio::fs::metadata(&config.dir)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false);
        if !is_dir {
            return Err(CacheError::Config(format!(
                "Cache directory {:?} does not exist",
                config.dir
            )));
        }

        let probe_dir = config.dir.clone();
        tokio::task::spawn_blocking(move || tempfile::tempfile_in(&probe_dir))
            .await?
            .map_err(|e| {
                CacheError::Config(format!(
                    "Cache directory {:?} is not writable: {}",
                    config.dir, e
                ))
            })?;

        info!(path = ?config.dir, prefix = %config.file_prefix, "Initialized filesystem cache");

        Ok(Self {
            store: Arc::new(FileStore {
                dir: config.dir,
                prefix: config.file_prefix,
            }),
        })
    }

    /// Create with just a directory (convenience method).
    pub async fn with_dir(dir: impl Into<PathBuf>) -> CacheResult<Self> {
        Self::new(FilesystemConfig::new(dir)).await
    }

    /// The file backing `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.store.path(key)
    }

    /// Directory holding the cache files.
    pub fn dir(&self) -> &Path {
        &self.store.dir
    }

    async fn run<T, F>(&self, op: F) -> CacheResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&FileStore) -> CacheResult<T> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || op(&store)).await?
    }
}

#[async_trait]
impl CacheBackend for FilesystemCache {
    async fn add(&self, key: &str, value: CacheValue, ttl: Option<Duration>) -> CacheResult<bool> {
        let key = key.to_string();
        self.run(move |store| store.add(&key, &value, ttl)).await
    }

    async fn store(
        &self,
        key: &str,
        value: CacheValue,
        ttl: Option<Duration>,
    ) -> CacheResult<bool> {
        let key = key.to_string();
        self.run(move |store| store.store(&key, &value, ttl)).await
    }

    async fn replace(
        &self,
        key: &str,
        value: CacheValue,
        ttl: Option<Duration>,
    ) -> CacheResult<bool> {
        let key = key.to_string();
        self.run(move |store| {
            if !store.is_live(&store.path(&key))? {
                return Ok(false);
            }
            store.store(&key, &value, ttl)
        })
        .await
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        let key = key.to_string();
        self.run(move |store| store.is_live(&store.path(&key))).await
    }

    async fn fetch(&self, key: &str) -> CacheResult<Option<CacheValue>> {
        let key = key.to_string();
        self.run(move |store| store.fetch(&key)).await
    }

    async fn increment(&self, key: &str, step: i64) -> CacheResult<i64> {
        let key = key.to_string();
        self.run(move |store| store.adjust(&key, step)).await
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        let key = key.to_string();
        self.run(move |store| match fs::remove_file(store.path(&key)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        })
        .await
    }

    async fn clear(&self) -> CacheResult<()> {
        self.run(|store| store.clear()).await
    }
}

/// Blocking half of the filesystem cache.
struct FileStore {
    dir: PathBuf,
    prefix: String,
}

impl FileStore {
    fn path(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.dir.join(format!("{}{}", self.prefix, hex::encode(digest)))
    }

    fn is_live(&self, path: &Path) -> CacheResult<bool> {
        match fs::metadata(path) {
            Ok(meta) => Ok(meta.modified()? > SystemTime::now()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Write a complete entry to a temp file beside its final location.
    fn write_temp(&self, value: &CacheValue, ttl: Option<Duration>) -> CacheResult<NamedTempFile> {
        let bytes = value.encode()?;
        let mut temp = NamedTempFile::new_in(&self.dir)?;
        temp.write_all(&bytes)?;
        temp.as_file().set_modified(expiry_for(ttl))?;
        Ok(temp)
    }

    fn store(&self, key: &str, value: &CacheValue, ttl: Option<Duration>) -> CacheResult<bool> {
        let temp = self.write_temp(value, ttl)?;
        temp.persist(self.path(key)).map_err(|e| e.error)?;
        Ok(true)
    }

    fn add(&self, key: &str, value: &CacheValue, ttl: Option<Duration>) -> CacheResult<bool> {
        let path = self.path(key);
        let temp = self.write_temp(value, ttl)?;

        let err = match temp.persist_noclobber(&path) {
            Ok(_) => return Ok(true),
            Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => err,
            Err(err) => return Err(err.error.into()),
        };

        if self.is_live(&path)? {
            return Ok(false);
        }

        // Expired leftover; clear it and race once more for the slot.
        if !self.reclaim_expired(&path)? {
            return Ok(false);
        }

        match err.file.persist_noclobber(&path) {
            Ok(_) => Ok(true),
            Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => Ok(false),
            Err(err) => Err(err.error.into()),
        }
    }

    /// Unlink an expired entry while holding its lock.
    ///
    /// Returns `false` when the slot holds a live entry or a file other than
    /// the one inspected, i.e. another adder got there first.
    fn reclaim_expired(&self, path: &Path) -> CacheResult<bool> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(true),
            Err(e) => return Err(e.into()),
        };

        file.lock()
            .map_err(|e| CacheError::Lock(format!("{:?}: {}", path, e)))?;
        let _locked = LockGuard(&file);

        let current = match fs::metadata(path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(true),
            Err(e) => return Err(e.into()),
        };
        if current.modified()? > SystemTime::now() || !same_file(&file.metadata()?, &current) {
            return Ok(false);
        }

        match fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        debug!(path = ?path, "Reclaimed expired entry");
        Ok(true)
    }

    fn fetch(&self, key: &str) -> CacheResult<Option<CacheValue>> {
        let path = self.path(key);
        if !self.is_live(&path)? {
            return Ok(None);
        }

        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        CacheValue::decode(&bytes).map(Some)
    }

    /// Locked read-modify-write of an integer entry.
    fn adjust(&self, key: &str, step: i64) -> CacheResult<i64> {
        let path = self.path(key);
        let file = match OpenOptions::new().read(true).write(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(CacheError::NotFound(key.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        file.lock()
            .map_err(|e| CacheError::Lock(format!("{:?}: {}", path, e)))?;
        let locked = LockGuard(&file);

        let expiry = locked.0.metadata()?.modified()?;
        if expiry <= SystemTime::now() {
            return Err(CacheError::NotFound(key.to_string()));
        }

        let mut raw = Vec::new();
        (&file).read_to_end(&mut raw)?;
        let content = raw.trim_ascii();

        let (flag, payload) = if content.is_empty() {
            (b'0', &b"0"[..])
        } else {
            split_header(content).ok_or_else(|| CacheError::NotNumeric(key.to_string()))?
        };

        let current: i64 = std::str::from_utf8(payload)
            .ok()
            .and_then(|text| text.trim().parse().ok())
            .ok_or_else(|| {
                warn!(key = %key, "Refusing to adjust non-numeric entry");
                CacheError::NotNumeric(key.to_string())
            })?;
        let new_value = current
            .checked_add(step)
            .ok_or_else(|| CacheError::Overflow(key.to_string()))?;

        file.set_len(0)?;
        (&file).seek(SeekFrom::Start(0))?;
        (&file).write_all(&encode_counter(flag, new_value))?;
        // The write bumped the mtime; put the entry's expiry back.
        file.set_modified(expiry)?;

        drop(locked);
        debug!(key = %key, step, value = new_value, "Adjusted counter");
        Ok(new_value)
    }

    fn clear(&self) -> CacheResult<()> {
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let is_cache_file = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(&self.prefix));
            if !is_cache_file {
                continue;
            }

            match fs::remove_file(entry.path()) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        debug!(path = ?self.dir, "Cleared filesystem cache");
        Ok(())
    }
}

/// Releases the advisory lock on every exit path.
struct LockGuard<'a>(&'a File);

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        let _ = self.0.unlock();
    }
}

#[cfg(unix)]
fn same_file(a: &fs::Metadata, b: &fs::Metadata) -> bool {
    use std::os::unix::fs::MetadataExt;
    a.dev() == b.dev() && a.ino() == b.ino()
}

#[cfg(not(unix))]
fn same_file(a: &fs::Metadata, b: &fs::Metadata) -> bool {
    a.len() == b.len() && a.modified().ok() == b.modified().ok()
}

fn expiry_for(ttl: Option<Duration>) -> SystemTime {
    match effective_ttl(ttl) {
        Some(ttl) => SystemTime::now() + ttl,
        None => UNIX_EPOCH + Duration::from_secs(NEVER_EXPIRES_SECS),
    }
}
