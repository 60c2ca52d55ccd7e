use std::{sync::Arc, time::Duration};

use chrono::Utc;
use reqwest::Url;
use tokio::task::JoinHandle;

use super::{
    lock::{SyncGuard, SyncLocks},
    progress::{NoopObserver, SyncEvent, SyncObserver},
};
use crate::{
    archive_client::{FetchError, PageFetcher},
    domain::{
        ListingKind,
        pages::{PageKind, listing_base_url, page_url},
    },
    scrape,
    storage::{MergeOutcome, TrackerStore},
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error("a {0} sync is already in progress")]
    AlreadyRunning(ListingKind),
    #[error("{0} listing URL unknown: open your {0} listing on the archive once so it can be remembered")]
    Discovery(ListingKind),
    #[error("first listing page could not be fetched: {0}")]
    FirstPage(#[source] FetchError),
    #[error("storage failure: {0}")]
    Storage(String),
}

impl From<anyhow::Error> for SyncError {
    fn from(e: anyhow::Error) -> Self {
        SyncError::Storage(format!("{e:#}"))
    }
}

/// Where a run may look for its listing when none is remembered yet.
#[derive(Debug, Clone, Default)]
pub struct SyncHint {
    /// A URL of the listing itself, any page.
    pub listing_url: Option<Url>,
    /// Markup of the page the user is on, searched for a link to the listing.
    pub page_html: Option<String>,
}

impl SyncHint {
    pub fn url(url: Url) -> Self {
        SyncHint {
            listing_url: Some(url),
            page_html: None,
        }
    }

    pub fn html(html: impl Into<String>) -> Self {
        SyncHint {
            listing_url: None,
            page_html: Some(html.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    /// Fixed pause before every page after the first.
    pub throttle: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            throttle: Duration::from_millis(2500),
        }
    }
}

/// Final counts of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub kind: ListingKind,
    pub pages_total: u32,
    pub pages_fetched: u32,
    pub skipped: Vec<u32>,
    /// Ids new to the set during this run.
    pub added: usize,
    /// Size of the set afterwards.
    pub total: usize,
}

impl SyncReport {
    fn new(kind: ListingKind, pages_total: u32) -> Self {
        SyncReport {
            kind,
            pages_total,
            pages_fetched: 0,
            skipped: Vec::new(),
            added: 0,
            total: 0,
        }
    }

    fn record(&mut self, merged: MergeOutcome) {
        self.pages_fetched += 1;
        self.added += merged.added;
        self.total = merged.total;
    }

    pub fn summary(&self) -> String {
        let mut text = format!(
            "{} sync complete: {} new, {} total from {}/{} pages",
            self.kind, self.added, self.total, self.pages_fetched, self.pages_total
        );
        if !self.skipped.is_empty() {
            let pages: Vec<String> = self.skipped.iter().map(u32::to_string).collect();
            text.push_str(&format!(" (skipped {})", pages.join(", ")));
        }
        text
    }
}

/// Crawls every page of a user listing into the matching id set.
pub struct SyncEngine {
    store: TrackerStore,
    fetcher: Arc<dyn PageFetcher>,
    origin: Url,
    settings: SyncSettings,
    locks: Arc<SyncLocks>,
    observer: Arc<dyn SyncObserver>,
}

impl SyncEngine {
    /// `origin` absolutises relative listing links found in page markup.
    pub fn new(
        store: TrackerStore,
        fetcher: Arc<dyn PageFetcher>,
        origin: Url,
        settings: SyncSettings,
    ) -> Self {
        SyncEngine {
            store,
            fetcher,
            origin,
            settings,
            locks: SyncLocks::new(),
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn SyncObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn store(&self) -> &TrackerStore {
        &self.store
    }

    pub fn is_running(&self, kind: ListingKind) -> bool {
        self.locks.is_active(kind)
    }

    /// Run a sync of `kind` to completion on the current task.
    pub async fn run(&self, kind: ListingKind, hint: SyncHint) -> Result<SyncReport, SyncError> {
        let (guard, base) = self.begin(kind, &hint).await?;
        self.run_locked(guard, base).await
    }

    /// Claim the run guard and resolve the listing, then crawl in a background
    /// task. Conflicts and discovery failures are returned here.
    pub async fn start(
        self: &Arc<Self>,
        kind: ListingKind,
        hint: SyncHint,
    ) -> Result<JoinHandle<Result<SyncReport, SyncError>>, SyncError> {
        let (guard, base) = self.begin(kind, &hint).await?;
        let engine = Arc::clone(self);
        Ok(tokio::spawn(async move { engine.run_locked(guard, base).await }))
    }

    async fn begin(&self, kind: ListingKind, hint: &SyncHint) -> Result<(SyncGuard, Url), SyncError> {
        let guard = self.locks.try_acquire(kind).ok_or_else(|| {
            tracing::info!(%kind, "sync already in progress, ignoring trigger");
            SyncError::AlreadyRunning(kind)
        })?;
        match self.resolve_base_url(kind, hint).await {
            Ok(base) => Ok((guard, base)),
            Err(e) => {
                self.emit(SyncEvent::Failed {
                    kind,
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    #[tracing::instrument(level = "debug", skip(self, guard, base), fields(kind = %guard.kind(), base = %base))]
    async fn run_locked(&self, guard: SyncGuard, base: Url) -> Result<SyncReport, SyncError> {
        let kind = guard.kind();
        let result = self.crawl(kind, &base).await;
        if let Err(e) = self.store.clear_sync_marker(kind).await {
            tracing::warn!(%kind, error = %e, "failed to clear sync-in-progress marker");
        }
        match &result {
            Ok(report) => self.emit(SyncEvent::Completed {
                kind,
                report: report.clone(),
            }),
            Err(e) => self.emit(SyncEvent::Failed {
                kind,
                reason: e.to_string(),
            }),
        }
        drop(guard);
        result
    }

    async fn crawl(&self, kind: ListingKind, base: &Url) -> Result<SyncReport, SyncError> {
        self.store.set_sync_marker(kind).await?;
        self.emit(SyncEvent::Started {
            kind,
            base_url: base.to_string(),
        });

        let first = self
            .fetcher
            .fetch(&page_url(base, 1))
            .await
            .map_err(SyncError::FirstPage)?;
        let pages_total = scrape::total_pages(&first);
        let mut report = SyncReport::new(kind, pages_total);

        let merged = self
            .store
            .merge_ids(kind, &scrape::scrape_work_ids(&first))
            .await?;
        self.store.remember_listing_url(kind, base).await?;
        report.record(merged);
        self.page_fetched(kind, 1, pages_total, merged);

        for page in 2..=pages_total {
            tokio::time::sleep(self.settings.throttle).await;
            match self.fetcher.fetch(&page_url(base, page)).await {
                Ok(html) => {
                    let merged = self
                        .store
                        .merge_ids(kind, &scrape::scrape_work_ids(&html))
                        .await?;
                    report.record(merged);
                    self.page_fetched(kind, page, pages_total, merged);
                }
                Err(e) => {
                    report.skipped.push(page);
                    self.emit(SyncEvent::PageSkipped {
                        kind,
                        page,
                        total_pages: pages_total,
                        reason: e.to_string(),
                    });
                }
            }
        }

        self.store.record_sync(kind, Utc::now()).await?;
        Ok(report)
    }

    /// Explicit listing URL first, then the remembered one, then a link on the current page.
    async fn resolve_base_url(&self, kind: ListingKind, hint: &SyncHint) -> Result<Url, SyncError> {
        if let Some(url) = hint.listing_url.as_ref() {
            if is_listing_of(url, kind) {
                return Ok(listing_base_url(url));
            }
            tracing::debug!(%kind, %url, "hinted URL is not this listing, ignoring");
        }
        if let Some(url) = self.store.listing_url(kind).await? {
            return Ok(url);
        }
        hint.page_html
            .as_deref()
            .and_then(|html| scrape::discover_listing_link(html, kind))
            .and_then(|href| self.origin.join(&href).ok())
            .filter(|url| is_listing_of(url, kind))
            .map(|url| listing_base_url(&url))
            .ok_or(SyncError::Discovery(kind))
    }

    fn page_fetched(&self, kind: ListingKind, page: u32, total_pages: u32, merged: MergeOutcome) {
        self.emit(SyncEvent::PageFetched {
            kind,
            page,
            total_pages,
            added: merged.added,
            total: merged.total,
        });
    }

    fn emit(&self, event: SyncEvent) {
        match &event {
            SyncEvent::Started { kind, base_url } => {
                tracing::info!(%kind, %base_url, "sync started")
            }
            SyncEvent::PageFetched {
                kind,
                page,
                total_pages,
                added,
                total,
            } => tracing::info!(%kind, page, total_pages, added, total, "listing page synced"),
            SyncEvent::PageSkipped {
                kind,
                page,
                total_pages,
                reason,
            } => tracing::warn!(%kind, page, total_pages, %reason, "skipping listing page"),
            SyncEvent::Completed { report, .. } => tracing::info!("{}", report.summary()),
            SyncEvent::Failed { kind, reason } => tracing::error!(%kind, %reason, "sync failed"),
        }
        self.observer.on_event(&event);
    }
}

fn is_listing_of(url: &Url, kind: ListingKind) -> bool {
    matches!(PageKind::classify(url), PageKind::Listing { kind: k, .. } if k == kind)
}
