use std::sync::Arc;

use poem_openapi::payload::Json;
use reqwest::Url;

use crate::{
    domain::ListingKind,
    sync::{StatusBoard, SyncEngine, SyncError, SyncHint},
    tracker_api::models::{
        ErrorDto, MessageDto, SyncRequestDto, SyncStatusDto, SyncStatusResponse,
        SyncTriggerResponse,
    },
};

pub struct SyncService<'a> {
    pub engine: &'a Arc<SyncEngine>,
    pub board: &'a StatusBoard,
}

impl<'a> SyncService<'a> {
    pub fn new(engine: &'a Arc<SyncEngine>, board: &'a StatusBoard) -> Self {
        Self { engine, board }
    }

    #[tracing::instrument(level = "debug", skip(self, body))]
    pub async fn trigger(&self, kind: &str, body: SyncRequestDto) -> SyncTriggerResponse {
        let kind = match kind.parse::<ListingKind>() {
            Ok(k) => k,
            Err(e) => return SyncTriggerResponse::BadRequest(ErrorDto::json(e)),
        };
        let listing_url = match body.listing_url.as_deref().map(Url::parse).transpose() {
            Ok(u) => u,
            Err(e) => {
                return SyncTriggerResponse::BadRequest(ErrorDto::json(format!(
                    "invalid listing_url: {e}"
                )));
            }
        };
        let hint = SyncHint {
            listing_url,
            page_html: body.page_html,
        };

        match self.engine.start(kind, hint).await {
            Ok(_) => SyncTriggerResponse::Accepted(Json(MessageDto {
                message: format!("{kind} sync started"),
            })),
            Err(e @ SyncError::AlreadyRunning(_)) => {
                SyncTriggerResponse::Conflict(ErrorDto::json(e.to_string()))
            }
            Err(e @ SyncError::Discovery(_)) => {
                SyncTriggerResponse::Unprocessable(ErrorDto::json(e.to_string()))
            }
            Err(e) => {
                tracing::error!(%kind, error = %e, "failed to start sync");
                SyncTriggerResponse::InternalError(ErrorDto::json(e.to_string()))
            }
        }
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn status(&self, kind: &str) -> SyncStatusResponse {
        let kind = match kind.parse::<ListingKind>() {
            Ok(k) => k,
            Err(e) => return SyncStatusResponse::BadRequest(ErrorDto::json(e)),
        };
        let last_sync = match self.engine.store().last_sync(kind).await {
            Ok(t) => t,
            Err(e) => {
                tracing::error!(error = %format!("{:?}", e), "failed to read last sync time");
                return SyncStatusResponse::InternalError(ErrorDto::json(format!("{e:#}")));
            }
        };
        let s = self.board.get(kind);
        SyncStatusResponse::Ok(Json(SyncStatusDto {
            kind: kind.to_string(),
            phase: s.phase.as_str().to_string(),
            running: self.engine.is_running(kind),
            page: s.page,
            total_pages: s.total_pages,
            ids_added: s.ids_added as u64,
            ids_total: s.ids_total as u64,
            skipped_pages: s.skipped_pages,
            message: s.message,
            updated_at: s.updated_at,
            last_sync,
        }))
    }
}
