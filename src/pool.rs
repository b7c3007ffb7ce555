use deadpool::{managed, Runtime};
use std::time::Duration;
use surrealdb::engine::any::{connect, Any};
use surrealdb::opt::auth::Root;
use surrealdb::Surreal;
use tracing::debug;

use crate::error::StarNetworkError as ServerError;

#[derive(Debug, Clone)]
pub struct SurrealConnectionConfig {
    pub url: String,
    /// Root credentials; embedded engines such as `mem://` run without them.
    pub credentials: Option<(String, String)>,
    pub namespace: String,
    pub database: String,
}

#[derive(Debug)]
pub struct SurrealConnectionManager {
    config: SurrealConnectionConfig,
}

impl SurrealConnectionManager {
    pub fn new(config: SurrealConnectionConfig) -> Self {
        Self { config }
    }
}

fn cache_db_error(action: &str, e: surrealdb::Error) -> ServerError {
    ServerError::CacheError(format!("Failed to {}: {}", action, e))
}

impl managed::Manager for SurrealConnectionManager {
    type Type = Surreal<Any>;
    type Error = ServerError;

    async fn create(&self) -> Result<Self::Type, Self::Error> {
        debug!(url = %self.config.url, "Opening cache database connection");
        let db = connect(&self.config.url).await.map_err(|e| cache_db_error("connect", e))?;

        if let Some((username, password)) = &self.config.credentials {
            db.signin(Root { username, password })
                .await
                .map_err(|e| cache_db_error("signin", e))?;
        }

        db.use_ns(&self.config.namespace)
            .use_db(&self.config.database)
            .await
            .map_err(|e| cache_db_error("select namespace/database", e))?;

        Ok(db)
    }

    async fn recycle(
        &self,
        conn: &mut Self::Type,
        _: &managed::Metrics,
    ) -> managed::RecycleResult<Self::Error> {
        match conn.query("RETURN 1").await {
            Ok(_) => Ok(()),
            Err(e) => Err(managed::RecycleError::Backend(cache_db_error("recycle connection", e))),
        }
    }
}

pub type SurrealPool = managed::Pool<SurrealConnectionManager>;

#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_size: usize,
    pub connection_timeout: Duration,
    pub recycle_timeout: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 10,
            connection_timeout: Duration::from_secs(30),
            recycle_timeout: Some(Duration::from_secs(600)),
        }
    }
}

pub fn create_pool(
    connection_config: SurrealConnectionConfig,
    pool_config: PoolConfig,
) -> Result<SurrealPool, ServerError> {
    let manager = SurrealConnectionManager::new(connection_config);

    managed::Pool::builder(manager)
        .max_size(pool_config.max_size)
        .runtime(Runtime::Tokio1)
        .create_timeout(Some(pool_config.connection_timeout))
        .recycle_timeout(pool_config.recycle_timeout)
        .build()
        .map_err(|e| ServerError::CacheError(format!("Failed to create connection pool: {}", e)))
}
