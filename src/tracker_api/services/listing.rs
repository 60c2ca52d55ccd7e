use chrono::Utc;
use poem_openapi::payload::Json;

use crate::{
    annotate::{self, Annotation, SortKey},
    scrape,
    storage::TrackerStore,
    tracker_api::models::{AnnotateRequestDto, AnnotateResponse, AnnotateResponseDto, AnnotationDto, ErrorDto},
};

pub struct ListingService<'a> {
    pub store: &'a TrackerStore,
}

fn sort_key(raw: &str) -> Result<SortKey, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "ratio" | "kudos" => Ok(SortKey::Ratio),
        "rating" => Ok(SortKey::Rating),
        other => Err(format!("unknown sort {other:?}, expected ratio or rating")),
    }
}

fn annotation_dto(a: Annotation) -> AnnotationDto {
    AnnotationDto {
        work_id: a.work_id.to_string(),
        ratio: a.ratio.map(|r| (r * 10.0).round() / 10.0),
        ratio_text: a.ratio.map(|r| format!("{r:.1}%")),
        ratio_band: a.band.map(|b| b.as_str().to_string()),
        hide_hits: a.hide_hits,
        read: a.read,
        bookmarked: a.bookmarked,
        highlight: a.highlight,
        rating: a.rating.map(|r| r.value()),
        rating_color: a.rating.map(|r| r.color().to_string()),
        last_read: a.last_read,
        chapters_left: a.chapters_left,
        complete: a.complete,
        update: a.update.map(|u| u.label()),
    }
}

impl<'a> ListingService<'a> {
    pub fn new(store: &'a TrackerStore) -> Self {
        Self { store }
    }

    #[tracing::instrument(level = "debug", skip(self, body))]
    pub async fn annotate(&self, body: AnnotateRequestDto) -> AnnotateResponse {
        let requested = match body.sort.as_deref().map(sort_key).transpose() {
            Ok(k) => k,
            Err(e) => return AnnotateResponse::BadRequest(ErrorDto::json(e)),
        };
        let snapshot = match self.store.snapshot().await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %format!("{:?}", e), "failed to read tracker data");
                return AnnotateResponse::InternalError(ErrorDto::json(format!("{e:#}")));
            }
        };

        let entries = scrape::parse_listing_entries(&body.html);
        let mut items = annotate::annotate(&entries, &snapshot, Utc::now());
        let sort = requested.or(snapshot.preferences.auto_sort.then_some(SortKey::Ratio));
        if let Some(key) = sort {
            annotate::sort_annotations(&mut items, key, body.ascending.unwrap_or(false));
        }
        if !body.count.unwrap_or(snapshot.preferences.auto_count) {
            for a in &mut items {
                a.ratio = None;
                a.band = None;
                a.hide_hits = false;
            }
        }
        tracing::debug!(entries = items.len(), sorted = ?sort, "annotated listing");

        AnnotateResponse::Ok(Json(AnnotateResponseDto {
            sorted_by: sort.map(|k| match k {
                SortKey::Ratio => "ratio".to_string(),
                SortKey::Rating => "rating".to_string(),
            }),
            entries: items.into_iter().map(annotation_dto).collect(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::BTreeSet, sync::Arc};

    use super::*;
    use crate::domain::{ListingKind, Preference, WorkId};
    use crate::storage::MemoryStore;

    fn blurb(id: u64, hits: u32, kudos: u32) -> String {
        format!(
            r#"<li class="work blurb group" id="work_{id}">
  <h4 class="heading"><a href="/works/{id}">Work {id}</a></h4>
  <dl class="stats"><dd class="kudos">{kudos}</dd><dd class="hits">{hits}</dd></dl>
</li>"#
        )
    }

    fn page() -> String {
        format!(
            r#"<ol class="work index group">{}{}{}</ol>"#,
            blurb(1, 1000, 50),
            blurb(2, 100, 80),
            blurb(3, 0, 0)
        )
    }

    fn request(sort: Option<&str>, count: Option<bool>) -> AnnotateRequestDto {
        AnnotateRequestDto {
            html: page(),
            count,
            sort: sort.map(String::from),
            ascending: None,
        }
    }

    async fn annotate(store: &TrackerStore, body: AnnotateRequestDto) -> AnnotateResponseDto {
        match ListingService::new(store).annotate(body).await {
            AnnotateResponse::Ok(Json(dto)) => dto,
            _ => panic!("expected annotations"),
        }
    }

    fn order(dto: &AnnotateResponseDto) -> Vec<&str> {
        dto.entries.iter().map(|e| e.work_id.as_str()).collect()
    }

    #[tokio::test]
    async fn counts_in_document_order_by_default() {
        let store = TrackerStore::new(Arc::new(MemoryStore::new()));
        store
            .merge_ids(ListingKind::History, &BTreeSet::from([WorkId::from(2)]))
            .await
            .unwrap();

        let dto = annotate(&store, request(None, None)).await;

        assert_eq!(dto.sorted_by, None);
        assert_eq!(order(&dto), vec!["1", "2", "3"]);
        let first = &dto.entries[0];
        assert_eq!(first.ratio, Some(5.0));
        assert_eq!(first.ratio_text.as_deref(), Some("5.0%"));
        assert_eq!(first.ratio_band.as_deref(), Some("mid"));
        assert!(first.hide_hits);
        assert!(!first.read);
        assert!(dto.entries[1].read);
        assert_eq!(dto.entries[1].ratio_band.as_deref(), Some("high"));
        assert_eq!(dto.entries[2].ratio, None);
        assert!(!dto.entries[2].hide_hits);
    }

    #[tokio::test]
    async fn sorts_by_ratio_on_request_or_preference() {
        let store = TrackerStore::new(Arc::new(MemoryStore::new()));

        let dto = annotate(&store, request(Some("kudos"), None)).await;
        assert_eq!(dto.sorted_by.as_deref(), Some("ratio"));
        assert_eq!(order(&dto), vec!["2", "1", "3"]);

        store.toggle_preference(Preference::AutoSort).await.unwrap();
        let dto = annotate(&store, request(None, None)).await;
        assert_eq!(dto.sorted_by.as_deref(), Some("ratio"));
        assert_eq!(order(&dto), vec!["2", "1", "3"]);
    }

    #[tokio::test]
    async fn count_off_strips_ratios_but_keeps_order() {
        let store = TrackerStore::new(Arc::new(MemoryStore::new()));

        let dto = annotate(&store, request(Some("ratio"), Some(false))).await;
        assert_eq!(order(&dto), vec!["2", "1", "3"]);
        assert!(dto.entries.iter().all(|e| e.ratio.is_none() && !e.hide_hits));
    }

    #[tokio::test]
    async fn unknown_sort_is_rejected() {
        let store = TrackerStore::new(Arc::new(MemoryStore::new()));
        assert!(matches!(
            ListingService::new(&store).annotate(request(Some("title"), None)).await,
            AnnotateResponse::BadRequest(_)
        ));
    }
}
