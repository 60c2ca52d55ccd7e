use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tokio::sync::Mutex;

use super::{KeyValueStore, Slot};
use crate::domain::{ListingKind, Preference, Preferences, Rating, WorkId, WorkMetadata};

/// Result of merging scraped ids into a stored set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOutcome {
    pub added: usize,
    pub total: usize,
}

/// Everything the tracker knows about one work.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkRecord {
    pub work_id: WorkId,
    pub read: bool,
    pub bookmarked: bool,
    pub metadata: Option<WorkMetadata>,
}

/// Point-in-time copy of the user data the annotator needs.
#[derive(Debug, Clone, Default)]
pub struct TrackerSnapshot {
    pub read: BTreeSet<WorkId>,
    pub bookmarked: BTreeSet<WorkId>,
    pub metadata: BTreeMap<WorkId, WorkMetadata>,
    pub preferences: Preferences,
}

/// Typed access to the tracker's slots.
///
/// Reads never fail on malformed persisted values: a slot that does not parse
/// is treated as empty (or as its default) and the problem is only logged.
/// Backend I/O errors still propagate.
#[derive(Clone)]
pub struct TrackerStore {
    kv: Arc<dyn KeyValueStore>,
    // serialises read-modify-write sequences on shared slots
    write_lock: Arc<Mutex<()>>,
}

impl TrackerStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Value of a JSON slot, or `default` when missing or corrupt.
    pub async fn get<T: DeserializeOwned>(&self, slot: Slot, default: T) -> anyhow::Result<T> {
        let Some(raw) = self.kv.get(slot.key()).await? else {
            return Ok(default);
        };
        match serde_json::from_str(&raw) {
            Ok(v) => Ok(v),
            Err(e) => {
                tracing::warn!(slot = slot.key(), error = %e, "stored value is corrupt, using default");
                Ok(default)
            }
        }
    }

    pub async fn set<T: Serialize + ?Sized>(&self, slot: Slot, value: &T) -> anyhow::Result<()> {
        let raw = serde_json::to_string(value)?;
        self.kv.set(slot.key(), &raw).await
    }

    pub async fn delete(&self, slot: Slot) -> anyhow::Result<()> {
        self.kv.delete(slot.key()).await
    }

    // ===== id sets =====

    pub async fn id_set(&self, kind: ListingKind) -> anyhow::Result<BTreeSet<WorkId>> {
        let value = self.get(Slot::IdSet(kind), Value::Null).await?;
        Ok(ids_from_value(kind, value))
    }

    /// Union `ids` into the stored set of `kind` and persist the result.
    pub async fn merge_ids(
        &self,
        kind: ListingKind,
        ids: &BTreeSet<WorkId>,
    ) -> anyhow::Result<MergeOutcome> {
        let _guard = self.write_lock.lock().await;
        let mut set = self.id_set(kind).await?;
        let before = set.len();
        set.extend(ids.iter().cloned());
        self.set(Slot::IdSet(kind), &set).await?;
        Ok(MergeOutcome {
            added: set.len() - before,
            total: set.len(),
        })
    }

    // ===== metadata =====

    pub async fn all_metadata(&self) -> anyhow::Result<BTreeMap<WorkId, WorkMetadata>> {
        let value = self.get(Slot::WorkMetadata, Value::Null).await?;
        Ok(metadata_from_value(value))
    }

    pub async fn metadata(&self, id: &WorkId) -> anyhow::Result<Option<WorkMetadata>> {
        Ok(self.all_metadata().await?.remove(id))
    }

    async fn update_metadata(
        &self,
        id: &WorkId,
        update: impl FnOnce(&mut WorkMetadata),
    ) -> anyhow::Result<WorkMetadata> {
        let mut all = self.all_metadata().await?;
        let entry = all.entry(id.clone()).or_default();
        update(entry);
        let updated = entry.clone();
        self.set(Slot::WorkMetadata, &all).await?;
        Ok(updated)
    }

    /// Store a 0-9 rating. Any other value fails with [`crate::domain::InvalidRating`]
    /// and leaves the stored rating untouched.
    pub async fn set_rating(&self, id: &WorkId, value: i64) -> anyhow::Result<WorkMetadata> {
        let rating = Rating::new(value)?;
        let _guard = self.write_lock.lock().await;
        self.update_metadata(id, |m| m.rating = Some(rating)).await
    }

    /// Add `id` to the read set and stamp its last-read date and chapter count.
    pub async fn mark_read(
        &self,
        id: &WorkId,
        chapters: Option<u32>,
        at: DateTime<Utc>,
    ) -> anyhow::Result<WorkMetadata> {
        let _guard = self.write_lock.lock().await;
        let mut read = self.id_set(ListingKind::History).await?;
        if read.insert(id.clone()) {
            self.set(Slot::IdSet(ListingKind::History), &read).await?;
        }
        self.update_metadata(id, |m| {
            m.last_read_date = Some(at);
            if chapters.is_some() {
                m.last_read_chapters = chapters;
            }
        })
        .await
    }

    pub async fn work_record(&self, id: &WorkId) -> anyhow::Result<WorkRecord> {
        Ok(WorkRecord {
            work_id: id.clone(),
            read: self.id_set(ListingKind::History).await?.contains(id),
            bookmarked: self.id_set(ListingKind::Bookmarks).await?.contains(id),
            metadata: self.metadata(id).await?,
        })
    }

    // ===== preferences =====

    pub async fn preference(&self, pref: Preference) -> anyhow::Result<bool> {
        let raw = self.kv.get(Slot::Preference(pref).key()).await?;
        Ok(match raw.as_deref() {
            Some("yes") => true,
            Some("no") => false,
            _ => pref.default_value(),
        })
    }

    pub async fn set_preference(&self, pref: Preference, value: bool) -> anyhow::Result<()> {
        let raw = if value { "yes" } else { "no" };
        self.kv.set(Slot::Preference(pref).key(), raw).await
    }

    /// Flip a flag and return its new value.
    pub async fn toggle_preference(&self, pref: Preference) -> anyhow::Result<bool> {
        let _guard = self.write_lock.lock().await;
        let value = !self.preference(pref).await?;
        self.set_preference(pref, value).await?;
        Ok(value)
    }

    pub async fn preferences(&self) -> anyhow::Result<Preferences> {
        let mut prefs = Preferences::default();
        for pref in Preference::ALL {
            prefs.set(pref, self.preference(pref).await?);
        }
        Ok(prefs)
    }

    // ===== listing bookkeeping =====

    pub async fn listing_url(&self, kind: ListingKind) -> anyhow::Result<Option<Url>> {
        let raw = self.kv.get(Slot::ListingUrl(kind).key()).await?;
        Ok(raw.and_then(|s| match Url::parse(&s) {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(%kind, error = %e, "stored listing URL is corrupt, ignoring");
                None
            }
        }))
    }

    pub async fn remember_listing_url(&self, kind: ListingKind, url: &Url) -> anyhow::Result<()> {
        self.kv.set(Slot::ListingUrl(kind).key(), url.as_str()).await
    }

    pub async fn last_sync(&self, kind: ListingKind) -> anyhow::Result<Option<DateTime<Utc>>> {
        let raw = self.kv.get(Slot::LastSync(kind).key()).await?;
        Ok(raw
            .and_then(|s| s.trim().parse::<i64>().ok())
            .and_then(DateTime::from_timestamp_millis))
    }

    pub async fn record_sync(&self, kind: ListingKind, at: DateTime<Utc>) -> anyhow::Result<()> {
        self.kv
            .set(Slot::LastSync(kind).key(), &at.timestamp_millis().to_string())
            .await
    }

    pub async fn sync_marker(&self, kind: ListingKind) -> anyhow::Result<bool> {
        Ok(self.kv.get(Slot::SyncInProgress(kind).key()).await?.is_some())
    }

    pub async fn set_sync_marker(&self, kind: ListingKind) -> anyhow::Result<()> {
        self.kv.set(Slot::SyncInProgress(kind).key(), "true").await
    }

    pub async fn clear_sync_marker(&self, kind: ListingKind) -> anyhow::Result<()> {
        self.kv.delete(Slot::SyncInProgress(kind).key()).await
    }

    /// Drop markers left behind by a process that died mid-sync.
    pub async fn clear_stale_sync_markers(&self) -> anyhow::Result<()> {
        for kind in ListingKind::ALL {
            if self.sync_marker(kind).await? {
                tracing::info!(%kind, "clearing stale sync-in-progress marker");
                self.clear_sync_marker(kind).await?;
            }
        }
        Ok(())
    }

    /// Remove read and bookmark sets, metadata and listing bookkeeping. Preferences are kept.
    pub async fn clear_all(&self) -> anyhow::Result<()> {
        let _guard = self.write_lock.lock().await;
        for slot in Slot::user_data() {
            self.delete(slot).await?;
        }
        tracing::info!("cleared all local tracker data");
        Ok(())
    }

    pub async fn snapshot(&self) -> anyhow::Result<TrackerSnapshot> {
        Ok(TrackerSnapshot {
            read: self.id_set(ListingKind::History).await?,
            bookmarked: self.id_set(ListingKind::Bookmarks).await?,
            metadata: self.all_metadata().await?,
            preferences: self.preferences().await?,
        })
    }
}

fn ids_from_value(kind: ListingKind, value: Value) -> BTreeSet<WorkId> {
    let items = match value {
        Value::Array(items) => items,
        Value::Null => return BTreeSet::new(),
        other => {
            tracing::warn!(%kind, found = %type_name(&other), "stored id set is not an array, treating as empty");
            return BTreeSet::new();
        }
    };
    let total = items.len();
    let ids: BTreeSet<WorkId> = items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(s) => WorkId::parse(&s).ok(),
            Value::Number(n) => n.as_u64().map(WorkId::from),
            _ => None,
        })
        .collect();
    if ids.len() < total {
        tracing::debug!(%kind, dropped = total - ids.len(), "dropped malformed or duplicate stored ids");
    }
    ids
}

fn metadata_from_value(value: Value) -> BTreeMap<WorkId, WorkMetadata> {
    let map = match value {
        Value::Object(map) => map,
        Value::Null => return BTreeMap::new(),
        other => {
            tracing::warn!(found = %type_name(&other), "stored metadata is not an object, treating as empty");
            return BTreeMap::new();
        }
    };
    map.into_iter()
        .filter_map(|(key, entry)| {
            let id = WorkId::parse(&key).ok()?;
            match serde_json::from_value::<WorkMetadata>(entry) {
                Ok(meta) => Some((id, meta)),
                Err(e) => {
                    tracing::warn!(work_id = %id, error = %e, "dropping corrupt metadata entry");
                    None
                }
            }
        })
        .collect()
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
