use chrono::Utc;
use poem_openapi::payload::Json;
use reqwest::Url;

use crate::{
    domain::pages::PageKind,
    sync::{SyncTrigger, VisitHandler},
    tracker_api::models::{ErrorDto, VisitRequestDto, VisitResponse, VisitResponseDto},
};

pub struct VisitService<'a> {
    pub handler: &'a VisitHandler,
}

impl<'a> VisitService<'a> {
    pub fn new(handler: &'a VisitHandler) -> Self {
        Self { handler }
    }

    #[tracing::instrument(level = "debug", skip(self, body), fields(url = %body.url))]
    pub async fn visit(&self, body: VisitRequestDto) -> VisitResponse {
        let url = match Url::parse(&body.url) {
            Ok(u) => u,
            Err(e) => return VisitResponse::BadRequest(ErrorDto::json(format!("invalid url: {e}"))),
        };
        let outcome = match self.handler.visit(&url, &body.html, Utc::now()).await {
            Ok(o) => o,
            Err(e) => {
                tracing::error!(error = %format!("{:?}", e), "failed to handle page visit");
                return VisitResponse::InternalError(ErrorDto::json(format!("{e:#}")));
            }
        };

        let (page, listing_kind) = match &outcome.page {
            PageKind::Listing { kind, .. } => ("listing", Some(kind.to_string())),
            PageKind::UserWorks => ("user_works", None),
            PageKind::Work(_) => ("work", None),
            PageKind::Other => ("other", None),
        };
        let (sync, sync_message) = match outcome.sync {
            SyncTrigger::NotNeeded => ("not_needed", None),
            SyncTrigger::Started(kind) => ("started", Some(format!("{kind} sync started"))),
            SyncTrigger::AlreadyRunning(kind) => {
                ("already_running", Some(format!("a {kind} sync is already in progress")))
            }
            SyncTrigger::Failed(reason) => ("failed", Some(reason)),
        };
        VisitResponse::Ok(Json(VisitResponseDto {
            page: page.to_string(),
            listing_kind,
            marked_read: outcome.marked_read.map(String::from),
            ids_added: outcome.merged.map(|m| m.added as u64),
            ids_total: outcome.merged.map(|m| m.total as u64),
            sync: sync.to_string(),
            sync_message,
        }))
    }
}
