//! Local fast-path cache of per-user onboarding completion flags.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::CacheError;

use super::traits::{FlagCache, flag_key};

/// Flags persisted as a JSON object (`{"onboarding_<id>": bool}`) in one
/// file. The whole map is held in memory and rewritten on every change.
pub struct FileFlagCache {
    path: PathBuf,
    entries: RwLock<HashMap<String, bool>>,
}

impl FileFlagCache {
    /// Load the cache file, starting empty if it is missing.
    ///
    /// A corrupt file is logged and treated as empty: every entry is just a
    /// cache of the durable record.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let path = path.into();
        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(map) => map,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Discarding corrupt onboarding cache");
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(CacheError::Io(e)),
        };
        debug!(path = %path.display(), entries = entries.len(), "Onboarding cache loaded");
        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    async fn persist(&self, entries: &HashMap<String, bool>) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let body = serde_json::to_vec_pretty(entries).map_err(|e| CacheError::Corrupt {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        })?;

        // Write-then-rename so a crash never leaves a half-written file.
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl FlagCache for FileFlagCache {
    async fn read_flag(&self, user_id: &str) -> Result<Option<bool>, CacheError> {
        Ok(self.entries.read().await.get(&flag_key(user_id)).copied())
    }

    /// The file is written first; memory only changes once it succeeded.
    async fn write_flag(&self, user_id: &str, completed: bool) -> Result<(), CacheError> {
        let mut entries = self.entries.write().await;
        let mut updated = entries.clone();
        updated.insert(flag_key(user_id), completed);
        self.persist(&updated).await?;
        *entries = updated;
        Ok(())
    }
}

/// In-memory cache (tests, ephemeral deployments).
#[derive(Default)]
pub struct MemoryFlagCache {
    entries: RwLock<HashMap<String, bool>>,
}

impl MemoryFlagCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FlagCache for MemoryFlagCache {
    async fn read_flag(&self, user_id: &str) -> Result<Option<bool>, CacheError> {
        Ok(self.entries.read().await.get(&flag_key(user_id)).copied())
    }

    async fn write_flag(&self, user_id: &str, completed: bool) -> Result<(), CacheError> {
        self.entries
            .write()
            .await
            .insert(flag_key(user_id), completed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_until_written() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileFlagCache::open(dir.path().join("cache.json"))
            .await
            .unwrap();
        assert_eq!(cache.read_flag("u1").await.unwrap(), None);

        cache.write_flag("u1", false).await.unwrap();
        assert_eq!(cache.read_flag("u1").await.unwrap(), Some(false));
    }

    #[tokio::test]
    async fn flags_survive_reopen_under_prefixed_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.json");
        {
            let cache = FileFlagCache::open(&path).await.unwrap();
            cache.write_flag("u1", true).await.unwrap();
        }

        let raw = std::fs::read_to_string(&path).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["onboarding_u1"], true);

        let reopened = FileFlagCache::open(&path).await.unwrap();
        assert_eq!(reopened.read_flag("u1").await.unwrap(), Some(true));
    }

    #[tokio::test]
    async fn corrupt_file_is_treated_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "not json").unwrap();

        let cache = FileFlagCache::open(&path).await.unwrap();
        assert_eq!(cache.read_flag("u1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn failed_write_leaves_memory_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("cache.json");
        let cache = FileFlagCache::open(&path).await.unwrap();

        // A plain file where the cache directory should be.
        std::fs::write(dir.path().join("sub"), "").unwrap();

        assert!(cache.write_flag("u1", true).await.is_err());
        assert_eq!(cache.read_flag("u1").await.unwrap(), None);

        std::fs::remove_file(dir.path().join("sub")).unwrap();
        cache.write_flag("u2", true).await.unwrap();
        let reopened = FileFlagCache::open(&path).await.unwrap();
        assert_eq!(reopened.read_flag("u1").await.unwrap(), None);
        assert_eq!(reopened.read_flag("u2").await.unwrap(), Some(true));
    }

    #[tokio::test]
    async fn memory_cache_roundtrip() {
        let cache = MemoryFlagCache::new();
        assert_eq!(cache.read_flag("u").await.unwrap(), None);
        cache.write_flag("u", true).await.unwrap();
        assert_eq!(cache.read_flag("u").await.unwrap(), Some(true));
    }
}
