// HTTP routes: contribution graph, health, service info

mod http;

use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use axum::{Router, routing::get};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::activity_repo::ActivityRepo;
use crate::cache::RenderCache;
use crate::config::AppConfig;
use crate::graph::GraphStyle;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) repo: Arc<ActivityRepo>,
    pub(crate) cache: Arc<RenderCache>,
    pub(crate) style: GraphStyle,
    pub(crate) config: AppConfig,
}

pub fn app(repo: Arc<ActivityRepo>, cache: Arc<RenderCache>, config: AppConfig) -> Router {
    let origins: Vec<HeaderValue> = config
        .graph
        .allowed_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(origin = %o, error = %e, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET]);

    let state = AppState {
        repo,
        cache,
        style: GraphStyle::from_config(&config.graph),
        config,
    };
    Router::new()
        .route("/", get(http::info_handler)) // GET /
        .route("/health", get(http::health_handler)) // GET /health
        .route("/gpu-activity.svg", get(http::graph_handler)) // GET /gpu-activity.svg
        .layer(cors)
        .with_state(state)
}
