use anyhow::Context;
use chrono::Utc;
use entities::kv_entry;
use sea_orm::{
    ActiveValue::Set, DatabaseConnection, EntityTrait, sea_query::OnConflict,
};

use super::KeyValueStore;

/// [`KeyValueStore`] over the `kv_entries` table.
#[derive(Clone, Debug)]
pub struct SeaOrmStore {
    db: DatabaseConnection,
}

impl SeaOrmStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl KeyValueStore for SeaOrmStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let row = kv_entry::Entity::find_by_id(key.to_string())
            .one(&self.db)
            .await
            .with_context(|| format!("Failed to read slot {key}"))?;
        Ok(row.map(|m| m.value))
    }

    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let row = kv_entry::ActiveModel {
            key: Set(key.to_string()),
            value: Set(value.to_string()),
            updated_at_ms: Set(Utc::now().timestamp_millis()),
        };
        kv_entry::Entity::insert(row)
            .on_conflict(
                OnConflict::column(kv_entry::Column::Key)
                    .update_columns([kv_entry::Column::Value, kv_entry::Column::UpdatedAtMs])
                    .to_owned(),
            )
            .exec(&self.db)
            .await
            .with_context(|| format!("Failed to write slot {key}"))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        kv_entry::Entity::delete_by_id(key.to_string())
            .exec(&self.db)
            .await
            .with_context(|| format!("Failed to delete slot {key}"))?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use migration::MigratorTrait;
    use sea_orm::{ConnectOptions, Database};

    use super::*;

    /// In-memory sqlite lives per connection, so the pool is pinned to one.
    pub(crate) async fn memory_db() -> DatabaseConnection {
        let mut opts = ConnectOptions::new("sqlite::memory:");
        opts.max_connections(1).min_connections(1);
        Database::connect(opts).await.unwrap()
    }

    async fn store() -> SeaOrmStore {
        let db = memory_db().await;
        migration::Migrator::up(&db, None).await.unwrap();
        SeaOrmStore::new(db)
    }

    #[tokio::test]
    async fn set_get_overwrite_delete() {
        let s = store().await;
        assert_eq!(s.get("ao3_read_works").await.unwrap(), None);

        s.set("ao3_read_works", r#"["1"]"#).await.unwrap();
        assert_eq!(s.get("ao3_read_works").await.unwrap().as_deref(), Some(r#"["1"]"#));

        s.set("ao3_read_works", r#"["1","2"]"#).await.unwrap();
        assert_eq!(
            s.get("ao3_read_works").await.unwrap().as_deref(),
            Some(r#"["1","2"]"#)
        );

        s.delete("ao3_read_works").await.unwrap();
        assert_eq!(s.get("ao3_read_works").await.unwrap(), None);
        s.delete("ao3_read_works").await.unwrap();
    }
}
