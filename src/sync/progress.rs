use std::sync::RwLock;

use chrono::{DateTime, Utc};

use super::engine::SyncReport;
use crate::domain::ListingKind;

/// Progress notifications of a sync run, in emission order.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    Started {
        kind: ListingKind,
        base_url: String,
    },
    PageFetched {
        kind: ListingKind,
        page: u32,
        total_pages: u32,
        added: usize,
        total: usize,
    },
    PageSkipped {
        kind: ListingKind,
        page: u32,
        total_pages: u32,
        reason: String,
    },
    Completed {
        kind: ListingKind,
        report: SyncReport,
    },
    Failed {
        kind: ListingKind,
        reason: String,
    },
}

impl SyncEvent {
    pub fn kind(&self) -> ListingKind {
        match self {
            SyncEvent::Started { kind, .. }
            | SyncEvent::PageFetched { kind, .. }
            | SyncEvent::PageSkipped { kind, .. }
            | SyncEvent::Completed { kind, .. }
            | SyncEvent::Failed { kind, .. } => *kind,
        }
    }
}

pub trait SyncObserver: Send + Sync {
    fn on_event(&self, event: &SyncEvent);
}

/// Observer that ignores everything.
pub struct NoopObserver;

impl SyncObserver for NoopObserver {
    fn on_event(&self, _event: &SyncEvent) {}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SyncPhase {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
}

impl SyncPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncPhase::Idle => "idle",
            SyncPhase::Running => "running",
            SyncPhase::Completed => "completed",
            SyncPhase::Failed => "failed",
        }
    }
}

/// Latest known state of one listing kind's sync.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncStatus {
    pub phase: SyncPhase,
    pub page: u32,
    pub total_pages: u32,
    pub ids_total: usize,
    pub ids_added: usize,
    pub skipped_pages: Vec<u32>,
    pub message: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Keeps the most recent [`SyncStatus`] per kind for polling clients.
#[derive(Debug, Default)]
pub struct StatusBoard {
    statuses: RwLock<[SyncStatus; 2]>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: ListingKind) -> SyncStatus {
        let statuses = self.statuses.read().unwrap_or_else(|e| e.into_inner());
        statuses[kind.index()].clone()
    }
}

impl SyncObserver for StatusBoard {
    fn on_event(&self, event: &SyncEvent) {
        let mut statuses = self.statuses.write().unwrap_or_else(|e| e.into_inner());
        let status = &mut statuses[event.kind().index()];
        match event {
            SyncEvent::Started { base_url, .. } => {
                *status = SyncStatus {
                    phase: SyncPhase::Running,
                    message: Some(format!("syncing {base_url}")),
                    ..SyncStatus::default()
                };
            }
            SyncEvent::PageFetched {
                page,
                total_pages,
                added,
                total,
                ..
            } => {
                status.page = *page;
                status.total_pages = *total_pages;
                status.ids_added += added;
                status.ids_total = *total;
                status.message = Some(format!("page {page}/{total_pages}: {total} works known"));
            }
            SyncEvent::PageSkipped {
                page,
                total_pages,
                reason,
                ..
            } => {
                status.page = *page;
                status.total_pages = *total_pages;
                status.skipped_pages.push(*page);
                status.message = Some(format!("page {page}/{total_pages} skipped: {reason}"));
            }
            SyncEvent::Completed { report, .. } => {
                status.phase = SyncPhase::Completed;
                status.page = report.pages_total;
                status.total_pages = report.pages_total;
                status.ids_added = report.added;
                status.ids_total = report.total;
                status.skipped_pages = report.skipped.clone();
                status.message = Some(report.summary());
            }
            SyncEvent::Failed { reason, .. } => {
                status.phase = SyncPhase::Failed;
                status.message = Some(reason.clone());
            }
        }
        status.updated_at = Some(Utc::now());
    }
}
