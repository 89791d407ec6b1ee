use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveValue::Set, DatabaseConnection, EntityTrait, sea_query::OnConflict};
use tracing::trace;

use super::SessionStore;
use crate::config::DatabaseConfig;
use crate::errors::Result;
use crate::storage::retry::{RetryPolicy, with_retry};
use crate::storage::{StoreKey, connection};
use migration::entities::session;

/// Sessions in the `sessions` table (SQLite, PostgreSQL or MySQL)
pub struct SeaOrmSessionStore {
    db: DatabaseConnection,
    retry: RetryPolicy,
}

impl SeaOrmSessionStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let db = connection::connect(config).await?;
        Ok(Self::from_connection(db, RetryPolicy::from(config)))
    }

    pub fn from_connection(db: DatabaseConnection, retry: RetryPolicy) -> Self {
        Self { db, retry }
    }
}

#[async_trait]
impl SessionStore for SeaOrmSessionStore {
    async fn load_raw(&self, key: StoreKey<'_>) -> Result<Option<String>> {
        let id = key.encode();
        let row = session::Entity::find_by_id(id.clone()).one(&self.db).await?;
        trace!("session lookup {} -> {}", id, row.is_some());
        Ok(row.map(|model| model.value))
    }

    async fn store_raw(&self, key: StoreKey<'_>, value: String) -> Result<()> {
        let id = key.encode();
        with_retry("session upsert", self.retry, || {
            let record = session::ActiveModel {
                id: Set(id.clone()),
                value: Set(value.clone()),
                updated_at: Set(Utc::now()),
            };
            let db = &self.db;
            async move {
                session::Entity::insert(record)
                    .on_conflict(
                        OnConflict::column(session::Column::Id)
                            .update_columns([session::Column::Value, session::Column::UpdatedAt])
                            .to_owned(),
                    )
                    .exec(db)
                    .await
                    .map(|_| ())
            }
        })
        .await?;
        Ok(())
    }

    async fn health_check(&self) -> Result<()> {
        self.db.ping().await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "database"
    }
}
