use anyhow::Result;
use gpu_activity::*;
use std::sync::Arc;
use std::time::Duration;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init();

    let app_config = config::AppConfig::load()?;
    let repo = Arc::new(
        activity_repo::ActivityRepo::connect(
            &app_config.database.path,
            app_config.database.max_pool_size,
            app_config.database.timeout_ms,
        )
        .await?,
    );
    // The collector normally creates the table; creating it here lets the API start first.
    repo.init().await?;

    let cache = Arc::new(cache::RenderCache::new(Duration::from_secs(
        app_config.graph.cache_ttl_secs,
    )));
    let app = routes::app(repo, cache, app_config.clone());
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            telemetry::shutdown_signal().await;
            tracing::info!("Received shutdown signal");
        })
        .await?;

    Ok(())
}
