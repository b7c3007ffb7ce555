use super::{decode_entry, encode_entry, CacheBackend, CacheKey};
use crate::error::{Result, StarNetworkError};
use crate::models::StarRecord;
use crate::pool::{SurrealConnectionManager, SurrealPool};
use async_trait::async_trait;
use chrono::NaiveDate;
use deadpool::managed::Object;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::warn;

const TABLE: &str = "star_cache";

/// Stored row; `payload` holds the encoded entry verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheRow {
    login: String,
    day: String,
    payload: String,
}

#[derive(Debug, Deserialize)]
struct CacheRowKey {
    login: String,
    day: String,
}

/// Entries as rows of the `star_cache` table, one record per login and day
#[derive(Clone)]
pub struct SurrealCacheBackend {
    db_pool: Arc<SurrealPool>,
}

impl SurrealCacheBackend {
    pub fn new(db_pool: Arc<SurrealPool>) -> Self {
        Self { db_pool }
    }

    async fn connection(&self) -> Result<Object<SurrealConnectionManager>> {
        self.db_pool
            .get()
            .await
            .map_err(|e| {
                StarNetworkError::CacheError(format!("Failed to get DB connection: {}", e))
            })
    }

    fn record_key(key: &CacheKey) -> String {
        key.to_string()
    }
}

fn query_error(e: surrealdb::Error) -> StarNetworkError {
    StarNetworkError::CacheError(format!("Cache query failed: {}", e))
}

async fn select_row(db: &Surreal<Any>, key: &CacheKey) -> Result<Option<CacheRow>> {
    let mut response = db
        .query("SELECT login, day, payload FROM type::thing($tb, $id)")
        .bind(("tb", TABLE))
        .bind(("id", SurrealCacheBackend::record_key(key)))
        .await
        .map_err(query_error)?;
    let rows: Vec<CacheRow> = response.take(0).map_err(query_error)?;
    Ok(rows.into_iter().next())
}

#[async_trait]
impl CacheBackend for SurrealCacheBackend {
    async fn load(&self, key: &CacheKey) -> Result<Option<Vec<StarRecord>>> {
        let db = self.connection().await?;
        match select_row(&db, key).await? {
            Some(row) => Ok(Some(decode_entry(row.payload.as_bytes())?)),
            None => Ok(None),
        }
    }

    async fn store(&self, key: &CacheKey, records: &[StarRecord]) -> Result<()> {
        let payload = String::from_utf8(encode_entry(records)?)
            .map_err(|e| StarNetworkError::CacheError(format!("Entry is not UTF-8: {}", e)))?;
        let row = CacheRow {
            login: key.login.clone(),
            day: key.date.format("%Y-%m-%d").to_string(),
            payload,
        };

        let db = self.connection().await?;
        db.query("UPSERT type::thing($tb, $id) CONTENT $row")
            .bind(("tb", TABLE))
            .bind(("id", Self::record_key(key)))
            .bind(("row", row))
            .await
            .map_err(query_error)?
            .check()
            .map_err(query_error)?;

        Ok(())
    }

    async fn keys(&self) -> Result<Vec<CacheKey>> {
        let db = self.connection().await?;
        let mut response = db
            .query("SELECT login, day FROM type::table($tb)")
            .bind(("tb", TABLE))
            .await
            .map_err(query_error)?;
        let rows: Vec<CacheRowKey> = response.take(0).map_err(query_error)?;

        Ok(rows
            .into_iter()
            .filter_map(|row| match NaiveDate::parse_from_str(&row.day, "%Y-%m-%d") {
                Ok(date) => Some(CacheKey { login: row.login, date }),
                Err(e) => {
                    warn!(
                        login = %row.login,
                        day = %row.day,
                        error = %e,
                        "Skipping cache row with bad date"
                    );
                    None
                }
            })
            .collect())
    }

    async fn remove(&self, key: &CacheKey) -> Result<()> {
        let db = self.connection().await?;
        db.query("DELETE type::thing($tb, $id)")
            .bind(("tb", TABLE))
            .bind(("id", Self::record_key(key)))
            .await
            .map_err(query_error)?
            .check()
            .map_err(query_error)?;
        Ok(())
    }
}
