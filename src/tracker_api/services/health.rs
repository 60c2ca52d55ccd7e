use poem_openapi::payload::PlainText;

use crate::{domain::ListingKind, sync::SyncEngine};

pub struct HealthService<'a> {
    pub engine: &'a SyncEngine,
}

impl<'a> HealthService<'a> {
    pub fn new(engine: &'a SyncEngine) -> Self {
        Self { engine }
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn status_text(&self) -> PlainText<String> {
        let running: Vec<&str> = ListingKind::ALL
            .iter()
            .filter(|k| self.engine.is_running(**k))
            .map(ListingKind::as_str)
            .collect();
        PlainText(format!(
            "{} version={} syncing={}",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            if running.is_empty() { "none".to_string() } else { running.join(",") }
        ))
    }
}
