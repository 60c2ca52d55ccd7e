use chrono::Utc;
use poem_openapi::payload::Json;

use crate::{
    domain::{Rating, WorkId},
    storage::{TrackerStore, WorkRecord},
    tracker_api::models::{
        ClearDataResponse, ErrorDto, MarkReadRequestDto, MessageDto, RatingRequestDto, WorkDto,
        WorkResponse,
    },
};

pub struct WorkService<'a> {
    pub store: &'a TrackerStore,
}

fn work_dto(record: WorkRecord) -> WorkDto {
    let meta = record.metadata.unwrap_or_default();
    WorkDto {
        work_id: record.work_id.to_string(),
        read: record.read,
        bookmarked: record.bookmarked,
        rating: meta.rating.map(|r| r.value()),
        rating_color: meta.rating.map(|r| r.color().to_string()),
        last_read_date: meta.last_read_date,
        last_read_chapters: meta.last_read_chapters,
    }
}

impl<'a> WorkService<'a> {
    pub fn new(store: &'a TrackerStore) -> Self {
        Self { store }
    }

    async fn record(&self, id: &WorkId) -> WorkResponse {
        match self.store.work_record(id).await {
            Ok(r) => WorkResponse::Ok(Json(work_dto(r))),
            Err(e) => internal(e),
        }
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn get(&self, work_id: &str) -> WorkResponse {
        match WorkId::parse(work_id) {
            Ok(id) => self.record(&id).await,
            Err(e) => WorkResponse::BadRequest(ErrorDto::json(e.to_string())),
        }
    }

    #[tracing::instrument(level = "debug", skip(self, body))]
    pub async fn rate(&self, work_id: &str, body: RatingRequestDto) -> WorkResponse {
        let id = match WorkId::parse(work_id) {
            Ok(id) => id,
            Err(e) => return WorkResponse::BadRequest(ErrorDto::json(e.to_string())),
        };
        let rating = match Rating::parse(&body.rating) {
            Ok(r) => r,
            Err(e) => return WorkResponse::BadRequest(ErrorDto::json(e.to_string())),
        };
        match self.store.set_rating(&id, i64::from(rating.value())).await {
            Ok(_) => {
                tracing::info!(work_id = %id, rating = rating.value(), "rating saved");
                self.record(&id).await
            }
            Err(e) => internal(e),
        }
    }

    #[tracing::instrument(level = "debug", skip(self, body))]
    pub async fn mark_read(&self, work_id: &str, body: MarkReadRequestDto) -> WorkResponse {
        let id = match WorkId::parse(work_id) {
            Ok(id) => id,
            Err(e) => return WorkResponse::BadRequest(ErrorDto::json(e.to_string())),
        };
        match self.store.mark_read(&id, body.chapters, Utc::now()).await {
            Ok(_) => {
                tracing::info!(work_id = %id, chapters = ?body.chapters, "marked as read");
                self.record(&id).await
            }
            Err(e) => internal(e),
        }
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn clear_all(&self) -> ClearDataResponse {
        match self.store.clear_all().await {
            Ok(()) => ClearDataResponse::Ok(Json(MessageDto {
                message: "All read, bookmark and rating data cleared".to_string(),
            })),
            Err(e) => {
                tracing::error!(error = %format!("{:?}", e), "failed to clear data");
                ClearDataResponse::InternalError(ErrorDto::json(format!("{e:#}")))
            }
        }
    }
}

fn internal(e: anyhow::Error) -> WorkResponse {
    tracing::error!(error = %format!("{:?}", e), "work store failure");
    WorkResponse::InternalError(ErrorDto::json(format!("{e:#}")))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::storage::MemoryStore;

    fn rating(r: &str) -> RatingRequestDto {
        RatingRequestDto { rating: r.into() }
    }

    #[tokio::test]
    async fn invalid_rating_is_rejected_and_previous_kept() {
        let store = TrackerStore::new(Arc::new(MemoryStore::new()));
        let svc = WorkService::new(&store);

        let WorkResponse::Ok(Json(work)) = svc.rate("42", rating(" 7 ")).await else {
            panic!("expected rating to be stored");
        };
        assert_eq!(work.rating, Some(7));
        assert_eq!(work.rating_color.as_deref(), Some("#5bc0de"));

        for bad in ["10", "-1", "seven", ""] {
            assert!(matches!(svc.rate("42", rating(bad)).await, WorkResponse::BadRequest(_)));
        }
        let WorkResponse::Ok(Json(work)) = svc.get("42").await else {
            panic!("expected work");
        };
        assert_eq!(work.rating, Some(7));
        assert!(!work.read);

        assert!(matches!(svc.get("4x2").await, WorkResponse::BadRequest(_)));
    }

    #[tokio::test]
    async fn mark_read_then_clear() {
        let store = TrackerStore::new(Arc::new(MemoryStore::new()));
        let svc = WorkService::new(&store);

        let WorkResponse::Ok(Json(work)) = svc
            .mark_read("9", MarkReadRequestDto { chapters: Some(3) })
            .await
        else {
            panic!("expected work");
        };
        assert!(work.read);
        assert_eq!(work.last_read_chapters, Some(3));
        assert!(work.last_read_date.is_some());

        assert!(matches!(svc.clear_all().await, ClearDataResponse::Ok(_)));
        let WorkResponse::Ok(Json(work)) = svc.get("9").await else {
            panic!("expected work");
        };
        assert!(!work.read);
        assert_eq!(work.last_read_chapters, None);
    }
}
