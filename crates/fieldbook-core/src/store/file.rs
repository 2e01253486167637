use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::memory::Persist;
use super::{BatchWrite, Document, DocumentStore, MemoryStore, Subscription, COLLECTIONS};
use crate::error::StoreError;

/// Default age after which a saved collection is reported as stale
pub const DEFAULT_STALE_MINUTES: i64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.cached_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Also covers clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            if minutes % 60 >= 30 {
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            let days = minutes / 1440;
            if (minutes % 1440) / 60 >= 12 {
                format!("{}d ago", days + 1)
            } else {
                format!("{}d ago", days)
            }
        }
    }

    pub fn is_stale(&self, stale_minutes: i64) -> bool {
        self.age_minutes() > stale_minutes
    }
}

/// Document store persisted as one JSON file per collection.
///
/// Every change is written to disk before it reaches memory or subscribers;
/// a failed write leaves the store untouched.
pub struct FileStore {
    dir: PathBuf,
    inner: MemoryStore,
}

/// Writes staged collections into the store directory
struct CollectionWriter<'a> {
    dir: &'a Path,
}

impl Persist for CollectionWriter<'_> {
    fn persist(&self, collection: &str, docs: Vec<Document>) -> Result<(), StoreError> {
        let cached = CachedData::new(docs);
        let contents = serde_json::to_string_pretty(&cached)?;
        std::fs::write(FileStore::path_in(self.dir, collection), contents)?;
        debug!(collection, "Collection written to disk");
        Ok(())
    }
}

impl FileStore {
    /// Open (or create) a store directory and load the known collections.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        let inner = MemoryStore::new();

        for collection in COLLECTIONS {
            match Self::read_file(&Self::path_in(&dir, collection)) {
                Ok(Some(cached)) => {
                    debug!(collection, count = cached.data.len(), "Loaded collection from disk");
                    inner.replace_collection(collection, cached.data).await;
                }
                Ok(None) => {}
                Err(e) => {
                    // A corrupt file should not block the other collections
                    warn!(collection, error = %e, "Failed to load collection file");
                }
            }
        }

        Ok(Self { dir, inner })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_in(dir: &Path, collection: &str) -> PathBuf {
        dir.join(format!("{}.json", collection))
    }

    fn read_file(path: &Path) -> Result<Option<CachedData<Vec<Document>>>, StoreError> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&contents)?))
    }

    fn writer(&self) -> CollectionWriter<'_> {
        CollectionWriter { dir: &self.dir }
    }

    /// Replace a whole collection and write it out.
    pub async fn import(&self, collection: &str, docs: Vec<Document>) -> Result<(), StoreError> {
        self.inner
            .replace_collection_with(collection, docs, &self.writer())
            .await
    }

    /// When each collection file was last written, if it exists.
    pub fn cached_info(&self, collection: &str) -> Result<Option<CachedData<usize>>, StoreError> {
        Ok(Self::read_file(&Self::path_in(&self.dir, collection))?.map(|cached| CachedData {
            data: cached.data.len(),
            cached_at: cached.cached_at,
        }))
    }

    /// Age display for a collection, or "never" when it was never saved.
    pub fn age_display(&self, collection: &str) -> String {
        match self.cached_info(collection) {
            Ok(Some(cached)) => cached.age_display(),
            Ok(None) => "never".to_string(),
            Err(e) => {
                debug!(collection, error = %e, "Failed to read collection for age display");
                "unreadable".to_string()
            }
        }
    }

    /// Whether any known collection is missing or older than `stale_minutes`.
    pub fn any_stale(&self, stale_minutes: i64) -> bool {
        COLLECTIONS.iter().any(|collection| match self.cached_info(collection) {
            Ok(Some(cached)) => cached.is_stale(stale_minutes),
            Ok(None) => true,
            Err(e) => {
                debug!(collection, error = %e, "Failed to read collection for staleness check");
                true
            }
        })
    }
}

impl DocumentStore for FileStore {
    async fn get_collection(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        self.inner.get_collection(collection).await
    }

    async fn subscribe(&self, collection: &str, order_by: &str) -> Result<Subscription, StoreError> {
        self.inner.subscribe(collection, order_by).await
    }

    async fn add(&self, collection: &str, fields: Map<String, Value>) -> Result<String, StoreError> {
        self.inner.add_with(collection, fields, &self.writer()).await
    }

    async fn update(&self, collection: &str, id: &str, fields: Map<String, Value>) -> Result<(), StoreError> {
        self.inner.update_with(collection, id, fields, &self.writer()).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.inner.delete_with(collection, id, &self.writer()).await
    }

    async fn batch_upsert(&self, collection: &str, writes: Vec<BatchWrite>) -> Result<Vec<String>, StoreError> {
        self.inner.batch_upsert_with(collection, writes, &self.writer()).await
    }
}
