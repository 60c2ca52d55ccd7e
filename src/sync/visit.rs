use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use reqwest::Url;

use super::engine::{SyncEngine, SyncError, SyncHint};
use crate::{
    domain::{
        ListingKind, WorkId,
        pages::{PageKind, listing_base_url},
    },
    scrape,
    storage::MergeOutcome,
};

/// What a page visit caused in the background.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncTrigger {
    NotNeeded,
    Started(ListingKind),
    AlreadyRunning(ListingKind),
    /// The listing could not be resolved or read back from the store.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitOutcome {
    pub page: PageKind,
    pub merged: Option<MergeOutcome>,
    pub marked_read: Option<WorkId>,
    pub sync: SyncTrigger,
}

/// Reacts to the user landing on an archive page.
pub struct VisitHandler {
    engine: Arc<SyncEngine>,
    /// Age after which the last history sync counts as stale. `None` disables auto-sync from other pages.
    stale_after: Option<Duration>,
}

impl VisitHandler {
    pub fn new(engine: Arc<SyncEngine>, stale_after: Option<Duration>) -> Self {
        Self { engine, stale_after }
    }

    #[tracing::instrument(level = "debug", skip(self, html, now), fields(url = %url))]
    pub async fn visit(
        &self,
        url: &Url,
        html: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<VisitOutcome> {
        let store = self.engine.store();
        let page = PageKind::classify(url);
        let mut outcome = VisitOutcome {
            page: page.clone(),
            merged: None,
            marked_read: None,
            sync: SyncTrigger::NotNeeded,
        };

        match page {
            PageKind::Listing { kind, page } => {
                store.remember_listing_url(kind, &listing_base_url(url)).await?;
                let ids = scrape::scrape_work_ids(html);
                outcome.merged = Some(store.merge_ids(kind, &ids).await?);
                if page == 1 {
                    outcome.sync = self.trigger(kind, SyncHint::url(url.clone())).await;
                }
            }
            PageKind::UserWorks => {
                let ids = scrape::scrape_work_ids(html);
                outcome.merged = Some(store.merge_ids(ListingKind::History, &ids).await?);
            }
            PageKind::Work(id) => {
                let chapters = scrape::work_page_chapters(html);
                store.mark_read(&id, chapters, now).await?;
                outcome.marked_read = Some(id);
            }
            PageKind::Other => {
                if self.history_is_stale(now).await? {
                    outcome.sync = self.trigger(ListingKind::History, SyncHint::default()).await;
                }
            }
        }
        Ok(outcome)
    }

    async fn history_is_stale(&self, now: DateTime<Utc>) -> anyhow::Result<bool> {
        let Some(stale_after) = self.stale_after else {
            return Ok(false);
        };
        let store = self.engine.store();
        if store.listing_url(ListingKind::History).await?.is_none() {
            return Ok(false);
        }
        Ok(match store.last_sync(ListingKind::History).await? {
            Some(last) => now - last >= stale_after,
            None => true,
        })
    }

    async fn trigger(&self, kind: ListingKind, hint: SyncHint) -> SyncTrigger {
        match self.engine.start(kind, hint).await {
            Ok(_) => SyncTrigger::Started(kind),
            Err(SyncError::AlreadyRunning(kind)) => SyncTrigger::AlreadyRunning(kind),
            Err(e) => {
                tracing::warn!(%kind, error = %e, "could not start sync");
                SyncTrigger::Failed(e.to_string())
            }
        }
    }
}
