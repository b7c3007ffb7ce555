use crate::cache::RetentionPolicy;
use crate::engine::neighborhood::{DEFAULT_MAX_NEIGHBORS, DEFAULT_MAX_SEED_RESOURCES};
use crate::engine::NeighborFailurePolicy;
use crate::pool::{PoolConfig, SurrealConnectionConfig};
use crate::service::{RecommendationSettings, DEFAULT_RESULT_LIMIT};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CacheBackendKind {
    /// JSON files under --cache-dir
    File,
    /// SurrealDB table reached through --db-url
    Surreal,
    /// Process memory, lost on restart
    Memory,
}

#[derive(Parser, Debug)]
#[command(name = "github-star-network")]
#[command(
    about = "GitHub Star Network - Recommends repositories and similar users from shared stars"
)]
#[command(version)]
pub struct Cli {
    /// GitHub access token used for API requests
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: String,

    /// GitHub REST API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = crate::github::API_BASE_URL)]
    pub github_api_url: String,

    /// Maximum pages followed per paginated GitHub listing
    #[arg(long, env = "GITHUB_MAX_PAGES", default_value_t = 10)]
    pub github_max_pages: u32,

    /// Address the HTTP server binds to
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:5000")]
    pub bind: String,

    /// API key required on every route except /health
    #[arg(long, env = "API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Where daily star listings are cached
    #[arg(long, env = "CACHE_BACKEND", value_enum, default_value_t = CacheBackendKind::File)]
    pub cache_backend: CacheBackendKind,

    /// Directory for the file cache backend
    #[arg(long, env = "CACHE_DIR", default_value = "star_cache")]
    pub cache_dir: PathBuf,

    /// Purge cache entries older than this many days
    #[arg(long, env = "CACHE_MAX_AGE_DAYS")]
    pub cache_max_age_days: Option<u32>,

    /// Keep at most this many daily entries per user
    #[arg(long, env = "CACHE_MAX_ENTRIES_PER_USER")]
    pub cache_max_entries_per_user: Option<usize>,

    /// SurrealDB connection URL
    #[arg(long, env = "DB_URL", default_value = "ws://localhost:8000")]
    pub db_url: String,

    /// SurrealDB username
    #[arg(long, env = "DB_USER", default_value = "root")]
    pub db_user: String,

    /// SurrealDB password
    #[arg(long, env = "DB_PASS", default_value = "root", hide_env_values = true)]
    pub db_pass: String,

    /// SurrealDB namespace
    #[arg(long, env = "DB_NAMESPACE", default_value = "gitstars")]
    pub db_namespace: String,

    /// SurrealDB database
    #[arg(long, env = "DB_DATABASE", default_value = "stars")]
    pub db_database: String,

    /// Maximum pooled SurrealDB connections
    #[arg(long, env = "DB_POOL_MAX_SIZE", default_value_t = 10)]
    pub db_pool_max_size: usize,

    /// Seconds to wait for a new SurrealDB connection
    #[arg(long, env = "DB_CONNECTION_TIMEOUT", default_value_t = 30)]
    pub db_connection_timeout: u64,

    /// Maximum neighborhood size
    #[arg(long, env = "MAX_NEIGHBORS", default_value_t = DEFAULT_MAX_NEIGHBORS)]
    pub max_neighbors: usize,

    /// Seed repositories whose stargazers are collected
    #[arg(long, env = "MAX_SEED_RESOURCES", default_value_t = DEFAULT_MAX_SEED_RESOURCES)]
    pub max_seed_resources: usize,

    /// Recommendations returned per request
    #[arg(long, env = "RESULT_LIMIT", default_value_t = DEFAULT_RESULT_LIMIT)]
    pub result_limit: usize,

    /// Skip neighbors whose listing cannot be fetched instead of failing the request
    #[arg(long, env = "SKIP_FAILED_NEIGHBORS")]
    pub skip_failed_neighbors: bool,
}

impl Cli {
    pub fn retention_policy(&self) -> RetentionPolicy {
        RetentionPolicy {
            max_age_days: self.cache_max_age_days,
            max_entries_per_user: self.cache_max_entries_per_user,
        }
    }

    pub fn recommendation_settings(&self) -> RecommendationSettings {
        RecommendationSettings {
            max_neighbors: self.max_neighbors,
            max_seed_resources: self.max_seed_resources,
            result_limit: self.result_limit,
            failure_policy: if self.skip_failed_neighbors {
                NeighborFailurePolicy::SkipNeighbor
            } else {
                NeighborFailurePolicy::Propagate
            },
        }
    }

    pub fn surreal_connection(&self) -> SurrealConnectionConfig {
        // Embedded engines have no root user to sign in as
        let credentials = if self.db_url.starts_with("mem://") {
            None
        } else {
            Some((self.db_user.clone(), self.db_pass.clone()))
        };

        SurrealConnectionConfig {
            url: self.db_url.clone(),
            credentials,
            namespace: self.db_namespace.clone(),
            database: self.db_database.clone(),
        }
    }

    pub fn pool_config(&self) -> PoolConfig {
        // Every mem:// connection opens its own datastore
        let max_size = if self.db_url.starts_with("mem://") { 1 } else { self.db_pool_max_size };
        PoolConfig {
            max_size,
            connection_timeout: Duration::from_secs(self.db_connection_timeout),
            ..Default::default()
        }
    }
}
