use std::sync::Arc;

use poem_openapi::{
    OpenApi,
    param::Path,
    payload::{Json, PlainText},
};

use super::models::{
    AnnotateRequestDto, AnnotateResponse, ClearDataResponse, MarkReadRequestDto,
    PreferenceToggleResponse, PreferencesResponse, RatingRequestDto, SyncRequestDto,
    SyncStatusResponse, SyncTriggerResponse, VisitRequestDto, VisitResponse, WorkResponse,
};
use super::services::{
    health::HealthService, listing::ListingService, preferences::PreferencesService,
    sync::SyncService, visit::VisitService, works::WorkService,
};
use crate::sync::{StatusBoard, SyncEngine, VisitHandler};

pub struct TrackerApi {
    pub engine: Arc<SyncEngine>,
    pub board: Arc<StatusBoard>,
    pub visits: Arc<VisitHandler>,
}

#[OpenApi]
impl TrackerApi {
    #[oai(path = "/status", method = "get")]
    #[tracing::instrument(level = "debug", skip(self))]
    async fn status(&self) -> PlainText<String> {
        HealthService::new(&self.engine).status_text().await
    }

    // ===== sync =====

    /// Start a full sync of the history or bookmarks listing
    #[oai(path = "/sync/:kind", method = "post")]
    #[tracing::instrument(level = "debug", skip(self, kind, body))]
    async fn start_sync(
        &self,
        kind: Path<String>,
        body: Json<SyncRequestDto>,
    ) -> SyncTriggerResponse {
        SyncService::new(&self.engine, &self.board)
            .trigger(&kind.0, body.0)
            .await
    }

    /// Progress of the latest sync of a listing kind
    #[oai(path = "/sync/:kind", method = "get")]
    #[tracing::instrument(level = "debug", skip(self, kind))]
    async fn sync_status(&self, kind: Path<String>) -> SyncStatusResponse {
        SyncService::new(&self.engine, &self.board)
            .status(&kind.0)
            .await
    }

    /// Page-load hook: records what the page shows and may start a sync
    #[oai(path = "/visit", method = "post")]
    #[tracing::instrument(level = "debug", skip(self, body))]
    async fn visit(&self, body: Json<VisitRequestDto>) -> VisitResponse {
        VisitService::new(&self.visits).visit(body.0).await
    }

    // ===== listing =====

    /// Count kudos/hits ratios and optionally sort the entries of a listing page
    #[oai(path = "/listing/annotate", method = "post")]
    #[tracing::instrument(level = "debug", skip(self, body))]
    async fn annotate_listing(&self, body: Json<AnnotateRequestDto>) -> AnnotateResponse {
        ListingService::new(self.engine.store())
            .annotate(body.0)
            .await
    }

    // ===== preferences =====

    #[oai(path = "/preferences", method = "get")]
    #[tracing::instrument(level = "debug", skip(self))]
    async fn preferences(&self) -> PreferencesResponse {
        PreferencesService::new(self.engine.store()).get().await
    }

    /// Flip one of autoCount, autoSort, hideHitcount, highlightRead
    #[oai(path = "/preferences/:flag/toggle", method = "post")]
    #[tracing::instrument(level = "debug", skip(self, flag))]
    async fn toggle_preference(&self, flag: Path<String>) -> PreferenceToggleResponse {
        PreferencesService::new(self.engine.store())
            .toggle(&flag.0)
            .await
    }

    // ===== works =====

    #[oai(path = "/works/:work_id", method = "get")]
    #[tracing::instrument(level = "debug", skip(self, work_id))]
    async fn work(&self, work_id: Path<String>) -> WorkResponse {
        WorkService::new(self.engine.store()).get(&work_id.0).await
    }

    /// Set a 0-9 rating; anything else is rejected and the old rating kept
    #[oai(path = "/works/:work_id/rating", method = "put")]
    #[tracing::instrument(level = "debug", skip(self, work_id, body))]
    async fn rate_work(&self, work_id: Path<String>, body: Json<RatingRequestDto>) -> WorkResponse {
        WorkService::new(self.engine.store())
            .rate(&work_id.0, body.0)
            .await
    }

    #[oai(path = "/works/:work_id/read", method = "post")]
    #[tracing::instrument(level = "debug", skip(self, work_id, body))]
    async fn mark_read(
        &self,
        work_id: Path<String>,
        body: Json<MarkReadRequestDto>,
    ) -> WorkResponse {
        WorkService::new(self.engine.store())
            .mark_read(&work_id.0, body.0)
            .await
    }

    /// Remove read, bookmark and rating data. Preferences are kept.
    #[oai(path = "/data", method = "delete")]
    #[tracing::instrument(level = "debug", skip(self))]
    async fn clear_data(&self) -> ClearDataResponse {
        WorkService::new(self.engine.store()).clear_all().await
    }
}
