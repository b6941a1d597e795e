//! Durable Storage Module
//!
//! Simple string key-value persistence underneath the in-memory cache layer.
//! `FileStore` keeps one JSON file per key; `MemoryStore` is the
//! process-local stand-in used when no directory is configured.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::error::{CacheError, Result};

/// Synchronous key-value persistence.
///
/// Implementations report failures; the cache decides to swallow them.
pub trait DurableStore: Send + Sync + fmt::Debug {
    /// Reads the raw value stored under `key`, `None` if absent.
    fn read(&self, key: &str) -> Result<Option<String>>;
    /// Replaces the value stored under `key`.
    fn write(&self, key: &str, value: &str) -> Result<()>;
    /// Removes `key`. Removing an absent key is not an error.
    fn delete(&self, key: &str) -> Result<()>;
    /// Lists every stored key.
    fn keys(&self) -> Result<Vec<String>>;
}

// == File Store ==
/// One file per key inside a directory.
///
/// Calls are blocking `std::fs` operations on a single small file each.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

const FILE_SUFFIX: &str = ".json";

impl FileStore {
    /// Opens (and creates if needed) the storage directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}{}", encode_key(key), FILE_SUFFIX))
    }
}

impl DurableStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        // Temp file, then rename over the target.
        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for item in fs::read_dir(&self.dir)? {
            let name = item?.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(stem) = name.strip_suffix(FILE_SUFFIX) else {
                continue;
            };
            match decode_key(stem) {
                Some(key) => keys.push(key),
                None => {
                    return Err(CacheError::Storage(format!(
                        "unrecognised file in cache directory: {}",
                        name
                    )))
                }
            }
        }
        Ok(keys)
    }
}

/// Everything outside `[A-Za-z0-9_-]` is escaped so any key maps to a flat,
/// portable filename.
const KEY_ESCAPES: &AsciiSet = &NON_ALPHANUMERIC.remove(b'_').remove(b'-');

fn encode_key(key: &str) -> String {
    utf8_percent_encode(key, KEY_ESCAPES).to_string()
}

/// `None` when the decoded bytes are not UTF-8.
fn decode_key(encoded: &str) -> Option<String> {
    percent_decode_str(encoded)
        .decode_utf8()
        .ok()
        .map(|key| key.into_owned())
}

// == Memory Store ==
/// Process-local store; state does not survive restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.values
            .lock()
            .map_err(|_| CacheError::Storage("memory store lock poisoned".to_string()))
    }
}

impl DurableStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.lock()?.keys().cloned().collect())
    }
}
