// # YAML Directory Store
//
// File-based implementation of RecordStore: one YAML file per address.
//
// ## Layout
//
// ```text
// tokens/
//   0x0000000000000000000000000000000000000001.yaml
//   0x0000000000000000000000000000000000000002.yaml
// ```
//
// Only files named `0x*.yaml` are treated as records. Anything else in the
// directory (README, temp files) is ignored by `list_keys`.
//
// ## Writes
//
// - Atomic: the record is written to `<address>.tmp`, then renamed
// - Deterministic: the same record always serializes to the same bytes, so
//   re-running with unchanged inputs rewrites identical files
// - Dry-run: writes are logged and skipped

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::Error;
use crate::model::{Address, TokenRecord};
use crate::traits::RecordStore;

/// File name prefix of record files
const RECORD_PREFIX: &str = "0x";

/// File extension of record files
const RECORD_EXTENSION: &str = "yaml";

/// Directory-of-YAML-files record store
///
/// # Example
///
/// ```rust,no_run
/// use tokensync_core::store::YamlDirStore;
/// use tokensync_core::traits::RecordStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = YamlDirStore::new("tokens").await?;
///
///     for address in store.list_keys().await? {
///         let record = store.read(&address).await?;
///         println!("{} -> {}", address, record.website_slug);
///     }
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct YamlDirStore {
    dir: PathBuf,
    dry_run: bool,
}

impl YamlDirStore {
    /// Open a store rooted at `dir`, creating the directory if needed
    pub async fn new<P: AsRef<Path>>(dir: P) -> Result<Self, Error> {
        Self::open(dir, false).await
    }

    /// Open a store that logs writes instead of performing them
    pub async fn new_dry_run<P: AsRef<Path>>(dir: P) -> Result<Self, Error> {
        Self::open(dir, true).await
    }

    async fn open<P: AsRef<Path>>(dir: P, dry_run: bool) -> Result<Self, Error> {
        let dir = dir.as_ref().to_path_buf();

        if !dir.exists() {
            if dry_run {
                tracing::warn!("Record directory {} does not exist (dry-run)", dir.display());
            } else {
                fs::create_dir_all(&dir).await.map_err(|e| {
                    Error::config(format!(
                        "Failed to create record directory {}: {}",
                        dir.display(),
                        e
                    ))
                })?;
            }
        }

        Ok(Self { dir, dry_run })
    }

    /// Directory holding the record files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether writes are skipped
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Path of the record file for `address`
    pub fn record_path(&self, address: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", address, RECORD_EXTENSION))
    }

    fn temp_path(&self, address: &str) -> PathBuf {
        self.dir.join(format!("{}.tmp", address))
    }

    /// Reject keys that would escape the directory or not round-trip
    fn check_key(address: &str) -> Result<(), Error> {
        if !address.starts_with(RECORD_PREFIX)
            || address.contains(['/', '\\', '.'])
            || address.chars().any(char::is_whitespace)
        {
            return Err(Error::store(format!("Invalid record key: {:?}", address)));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for YamlDirStore {
    async fn list_keys(&self) -> Result<Vec<Address>, Error> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut entries = fs::read_dir(&self.dir).await.map_err(|e| {
            Error::store(format!(
                "Failed to list record directory {}: {}",
                self.dir.display(),
                e
            ))
        })?;

        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str())
                && stem.starts_with(RECORD_PREFIX)
            {
                keys.push(stem.to_string());
            }
        }

        keys.sort();
        tracing::debug!("Listed {} record(s) in {}", keys.len(), self.dir.display());
        Ok(keys)
    }

    async fn read(&self, address: &str) -> Result<TokenRecord, Error> {
        Self::check_key(address)?;
        let path = self.record_path(address);

        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::not_found(address));
            }
            Err(e) => {
                return Err(Error::store(format!(
                    "Failed to read record file {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        serde_yaml::from_str(&content).map_err(|e| {
            Error::malformed(format!("Failed to parse record file {}: {}", path.display(), e))
        })
    }

    async fn write(&self, address: &str, record: &TokenRecord) -> Result<(), Error> {
        Self::check_key(address)?;

        let yaml = serde_yaml::to_string(record)?;

        if self.dry_run {
            tracing::info!("[dry-run] would write {}:\n{}", address, yaml);
            return Ok(());
        }

        // Write to temporary file first
        let temp_path = self.temp_path(address);
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::store(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.write_all(yaml.as_bytes()).await.map_err(|e| {
                Error::store(format!(
                    "Failed to write to temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.flush().await.map_err(|e| {
                Error::store(format!(
                    "Failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        // Atomic rename (temp -> actual)
        let path = self.record_path(address);
        fs::rename(&temp_path, &path).await.map_err(|e| {
            Error::store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                path.display(),
                e
            ))
        })?;

        tracing::trace!("Record written: {}", path.display());
        Ok(())
    }
}
