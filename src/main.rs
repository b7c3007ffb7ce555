use anyhow::Context;
use clap::Parser;
use colored::*;
use github_star_network::cache::{
    CacheBackend, FileCacheBackend, MemoryCacheBackend, ResourceCache, SurrealCacheBackend,
};
use github_star_network::cli::{CacheBackendKind, Cli};
use github_star_network::github::{GitHubClient, StarSource};
use github_star_network::pool::create_pool;
use github_star_network::server::{self, AppState};
use github_star_network::service::RecommendationService;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let cli = Cli::parse();

    println!("{}", "GitHub Star Network".bold().green());
    println!("{}\n", "=".repeat(50).dimmed());

    let backend: Arc<dyn CacheBackend> = match cli.cache_backend {
        CacheBackendKind::File => {
            println!("📁 Caching star listings under {}", cli.cache_dir.display());
            Arc::new(FileCacheBackend::new(cli.cache_dir.clone()))
        }
        CacheBackendKind::Surreal => {
            let pool = create_pool(cli.surreal_connection(), cli.pool_config())
                .context("Failed to create SurrealDB connection pool")?;
            println!(
                "✅ Created SurrealDB connection pool with {} connections ({})",
                cli.db_pool_max_size, cli.db_url
            );
            Arc::new(SurrealCacheBackend::new(Arc::new(pool)))
        }
        CacheBackendKind::Memory => {
            println!("{}", "Running with in-memory cache (entries are lost on restart)".yellow());
            Arc::new(MemoryCacheBackend::new())
        }
    };

    let cache = ResourceCache::new(backend).with_retention(cli.retention_policy());
    let removed = cache
        .purge(chrono::Utc::now().date_naive())
        .await
        .context("Failed to apply cache retention policy")?;
    if removed > 0 {
        println!("🧹 Removed {} expired cache entries", removed);
    }

    let github = Arc::new(
        GitHubClient::with_base_url(cli.github_token.clone(), &cli.github_api_url)
            .context("Failed to create GitHub client")?
            .with_max_pages(cli.github_max_pages),
    );

    let source: Arc<dyn StarSource> = github.clone();
    let settings = cli.recommendation_settings();
    let service = RecommendationService::new(source, cache, settings);

    info!(
        max_neighbors = settings.max_neighbors,
        max_seed_resources = settings.max_seed_resources,
        result_limit = settings.result_limit,
        "Recommendation service configured"
    );
    if cli.api_key.is_none() {
        println!("{}", "No API key configured, routes are open".yellow());
    }

    println!("📡 Listening on {}", cli.bind);
    println!("\nPress Ctrl+C to stop the server\n");

    let state = AppState::new(service, github, cli.api_key.clone());
    server::serve(state, &cli.bind)
        .await
        .context("HTTP server failed")?;

    println!("\n✅ Server stopped");
    Ok(())
}
