// Background crawl of a history or bookmark listing into the store.
// Pages are fetched one at a time and persisted as they arrive; only a
// failure before page 1 is merged fails the run.

mod engine;
mod lock;
mod progress;
mod visit;

pub use engine::{SyncEngine, SyncError, SyncHint, SyncReport, SyncSettings};
pub use lock::{SyncGuard, SyncLocks};
pub use progress::{NoopObserver, StatusBoard, SyncEvent, SyncObserver, SyncPhase, SyncStatus};
pub use visit::{SyncTrigger, VisitHandler, VisitOutcome};
