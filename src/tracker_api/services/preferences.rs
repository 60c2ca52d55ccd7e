use poem_openapi::payload::Json;

use crate::{
    domain::Preference,
    storage::TrackerStore,
    tracker_api::models::{
        ErrorDto, PreferenceDto, PreferenceToggleResponse, PreferencesDto, PreferencesResponse,
    },
};

pub struct PreferencesService<'a> {
    pub store: &'a TrackerStore,
}

impl<'a> PreferencesService<'a> {
    pub fn new(store: &'a TrackerStore) -> Self {
        Self { store }
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn get(&self) -> PreferencesResponse {
        match self.store.preferences().await {
            Ok(p) => PreferencesResponse::Ok(Json(PreferencesDto {
                auto_count: p.auto_count,
                auto_sort: p.auto_sort,
                hide_hitcount: p.hide_hitcount,
                highlight_read: p.highlight_read,
            })),
            Err(e) => {
                tracing::error!(error = %format!("{:?}", e), "failed to read preferences");
                PreferencesResponse::InternalError(ErrorDto::json(format!("{e:#}")))
            }
        }
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn toggle(&self, flag: &str) -> PreferenceToggleResponse {
        let pref = match flag.parse::<Preference>() {
            Ok(p) => p,
            Err(e) => return PreferenceToggleResponse::NotFound(ErrorDto::json(e)),
        };
        match self.store.toggle_preference(pref).await {
            Ok(value) => {
                tracing::info!(flag = pref.as_str(), value, "preference toggled");
                PreferenceToggleResponse::Ok(Json(PreferenceDto {
                    flag: pref.as_str().to_string(),
                    value,
                }))
            }
            Err(e) => {
                tracing::error!(error = %format!("{:?}", e), "failed to toggle preference");
                PreferenceToggleResponse::InternalError(ErrorDto::json(format!("{e:#}")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::storage::MemoryStore;

    #[tokio::test]
    async fn toggle_flips_one_flag() {
        let store = TrackerStore::new(Arc::new(MemoryStore::new()));
        let svc = PreferencesService::new(&store);

        let PreferencesResponse::Ok(Json(before)) = svc.get().await else {
            panic!("expected preferences");
        };
        assert!(before.auto_count);
        assert!(!before.auto_sort);

        let PreferenceToggleResponse::Ok(Json(flag)) = svc.toggle("autosort").await else {
            panic!("expected toggle");
        };
        assert_eq!(flag.flag, "autoSort");
        assert!(flag.value);

        let PreferencesResponse::Ok(Json(after)) = svc.get().await else {
            panic!("expected preferences");
        };
        assert!(after.auto_sort);
        assert_eq!(after.hide_hitcount, before.hide_hitcount);
    }

    #[tokio::test]
    async fn unknown_flag_is_not_found() {
        let store = TrackerStore::new(Arc::new(MemoryStore::new()));
        assert!(matches!(
            PreferencesService::new(&store).toggle("darkMode").await,
            PreferenceToggleResponse::NotFound(_)
        ));
    }
}
