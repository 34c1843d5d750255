//! Local key-value cache of the last-synced (or last locally mutated) state.
//!
//! Values are JSON strings stored under fixed keys:
//!
//! | Key | Contents |
//! |-----|----------|
//! | `customCategories` | `[CategoryRecord]` |
//! | `cifrasPorCategoria` | `{ categoryId: [FileRef] }` |
//! | `darkmode` | `"1"` or `"0"` |
//! | `user_roles` | `{ email: role }` |

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::category::{CategoryRecord, FileRef};
use crate::error::Result;

pub const CUSTOM_CATEGORIES_KEY: &str = "customCategories";
pub const MEMBERSHIP_KEY: &str = "cifrasPorCategoria";
pub const DARK_MODE_KEY: &str = "darkmode";
pub const USER_ROLES_KEY: &str = "user_roles";

/// String-keyed blob storage (browser local storage or an on-disk equivalent)
pub trait LocalCache {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryCache {
    entries: HashMap<String, String>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalCache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One `<key>.json` file per key inside a directory
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    /// Use `dir`, creating it if needed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl LocalCache for FileCache {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        fs::write(&path, value)?;
        debug!(path = %path.display(), "cache entry written");
        Ok(())
    }
}

/// Typed access to the cache entries the songbook uses.
///
/// Reads never fail: a missing, unreadable or corrupt entry reads as empty.
pub struct CacheStore {
    cache: Box<dyn LocalCache>,
}

impl CacheStore {
    pub fn new(cache: Box<dyn LocalCache>) -> Self {
        Self { cache }
    }

    fn read_json<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        let raw = match self.cache.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return T::default(),
            Err(e) => {
                warn!(key, error = %e, "cache read failed, using empty value");
                return T::default();
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(key, error = %e, "corrupt cache entry, using empty value");
            T::default()
        })
    }

    fn write_json<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        self.cache.set(key, &json)
    }

    pub fn custom_categories(&self) -> Vec<CategoryRecord> {
        self.read_json(CUSTOM_CATEGORIES_KEY)
    }

    pub fn set_custom_categories(&mut self, records: &[CategoryRecord]) -> Result<()> {
        self.write_json(CUSTOM_CATEGORIES_KEY, records)
    }

    pub fn membership(&self) -> BTreeMap<String, Vec<FileRef>> {
        self.read_json(MEMBERSHIP_KEY)
    }

    pub fn set_membership(&mut self, members: &BTreeMap<String, Vec<FileRef>>) -> Result<()> {
        self.write_json(MEMBERSHIP_KEY, members)
    }

    pub fn dark_mode(&self) -> bool {
        matches!(self.cache.get(DARK_MODE_KEY), Ok(Some(v)) if v == "1")
    }

    pub fn set_dark_mode(&mut self, enabled: bool) -> Result<()> {
        self.cache.set(DARK_MODE_KEY, if enabled { "1" } else { "0" })
    }

    pub fn user_roles(&self) -> BTreeMap<String, String> {
        self.read_json(USER_ROLES_KEY)
    }

    pub fn set_user_roles(&mut self, roles: &BTreeMap<String, String>) -> Result<()> {
        self.write_json(USER_ROLES_KEY, roles)
    }
}
