// Persistence behind named slots; a sea-orm table in production, a map in tests

mod database;
mod memory;
mod tracker;

pub use database::SeaOrmStore;
pub use memory::MemoryStore;
pub use tracker::{MergeOutcome, TrackerSnapshot, TrackerStore, WorkRecord};

use crate::domain::{ListingKind, Preference};

/// Raw string key/value persistence. Values are opaque to the backend.
#[async_trait::async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;
    async fn delete(&self, key: &str) -> anyhow::Result<()>;
}

#[async_trait::async_trait]
impl<T: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<T> {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        (**self).set(key, value).await
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        (**self).delete(key).await
    }
}

/// Every named slot the tracker persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// JSON array of work id strings
    IdSet(ListingKind),
    /// JSON object keyed by work id
    WorkMetadata,
    /// "yes" / "no"
    Preference(Preference),
    /// Canonical listing URL
    ListingUrl(ListingKind),
    /// Completion time of the last sync, epoch milliseconds
    LastSync(ListingKind),
    /// Marker written while a sync of that kind runs
    SyncInProgress(ListingKind),
}

impl Slot {
    pub fn key(&self) -> &'static str {
        match self {
            Slot::IdSet(ListingKind::History) => "ao3_read_works",
            Slot::IdSet(ListingKind::Bookmarks) => "ao3_bookmarks",
            Slot::WorkMetadata => "ao3_work_metadata",
            Slot::Preference(Preference::AutoCount) => "alwayscountlocal",
            Slot::Preference(Preference::AutoSort) => "alwayssortlocal",
            Slot::Preference(Preference::HideHitcount) => "hidehitcountlocal",
            Slot::Preference(Preference::HighlightRead) => "highlightreadlocal",
            Slot::ListingUrl(ListingKind::History) => "ao3_history_url",
            Slot::ListingUrl(ListingKind::Bookmarks) => "ao3_bookmarks_url",
            Slot::LastSync(ListingKind::History) => "ao3_last_sync",
            Slot::LastSync(ListingKind::Bookmarks) => "ao3_bookmarks_last_sync",
            Slot::SyncInProgress(ListingKind::History) => "ao3_sync_in_progress",
            Slot::SyncInProgress(ListingKind::Bookmarks) => "ao3_bookmarks_sync_in_progress",
        }
    }

    /// Slots removed by "clear all local data". Preferences survive.
    pub fn user_data() -> Vec<Slot> {
        let mut slots = vec![Slot::WorkMetadata];
        for kind in ListingKind::ALL {
            slots.extend([
                Slot::IdSet(kind),
                Slot::ListingUrl(kind),
                Slot::LastSync(kind),
                Slot::SyncInProgress(kind),
            ]);
        }
        slots
    }
}
