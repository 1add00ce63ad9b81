// GET handlers: graph SVG, health, info

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use chrono::Local;
use serde::Deserialize;

use super::AppState;
use crate::cache::CacheKey;
use crate::config::GraphConfig;
use crate::error::{ApiError, RequestError};
use crate::graph;
use crate::models::{RenderRequest, Theme};

#[derive(Debug, Deserialize)]
pub(super) struct GraphQuery {
    theme: Option<String>,
    weeks: Option<String>,
}

/// Validate query parameters; absent values take configured defaults, bad values are errors.
fn parse_graph_query(
    query: &GraphQuery,
    config: &GraphConfig,
    today: chrono::NaiveDate,
) -> Result<RenderRequest, RequestError> {
    let theme = match query.theme.as_deref() {
        Some(s) => s.parse()?,
        None => config.default_theme,
    };
    let weeks = match query.weeks.as_deref() {
        Some(s) => s
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|w| (1..=config.max_weeks).contains(w))
            .ok_or_else(|| RequestError::InvalidWeeks {
                value: s.to_string(),
                max: config.max_weeks,
            })?,
        None => config.default_weeks,
    };
    Ok(RenderRequest {
        theme,
        weeks,
        reference_date: today,
    })
}

/// GET /gpu-activity.svg?theme={light|dark}&weeks={1..max}
pub(super) async fn graph_handler(
    State(state): State<AppState>,
    Query(query): Query<GraphQuery>,
) -> Result<Response, ApiError> {
    let today = Local::now().date_naive();
    let request = parse_graph_query(&query, &state.config.graph, today)?;
    let key = CacheKey {
        theme: request.theme,
        weeks: request.weeks,
        day: today,
    };
    let body = state
        .cache
        .get_or_render(key, || {
            graph::render_from_store(&state.repo, &request, today, &state.style)
        })
        .await?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "image/svg+xml")
        .header(
            header::CACHE_CONTROL,
            format!("public, max-age={}", state.cache.ttl().as_secs()),
        )
        .header(header::X_CONTENT_TYPE_OPTIONS, "nosniff")
        .body(Body::from(body))
        .map_err(|e| ApiError::Render(e.to_string()))
}

/// GET /health: store reachability and recency of the last aggregation write.
pub(super) async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let reachable = match state.repo.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, operation = "health_ping", "store unreachable");
            false
        }
    };
    let last_updated = if reachable {
        state.repo.latest_update().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, operation = "latest_update", "health check read failed");
            None
        })
    } else {
        None
    };
    let age_secs = last_updated.map(|t| (Local::now() - t).num_seconds().max(0));
    let stale = age_secs.is_none_or(|age| age as u64 > state.config.server.aggregation_stale_secs);
    let status = if reachable && !stale { "ok" } else { "degraded" };

    axum::Json(serde_json::json!({
        "status": status,
        "store": { "reachable": reachable },
        "aggregation": {
            "lastUpdated": last_updated.map(|t| t.to_rfc3339()),
            "ageSecs": age_secs,
            "stale": stale,
        },
    }))
}

/// GET /: service name, version, endpoints and defaults.
pub(super) async fn info_handler(State(state): State<AppState>) -> impl IntoResponse {
    let graph = &state.config.graph;
    axum::Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "message": "GPU Activity SVG Generator",
        "endpoints": {
            "/gpu-activity.svg": "GitHub-style contribution graph of daily GPU activity",
            "/health": "Store reachability and aggregation recency",
            "/": "This help message",
        },
        "usage": {
            "svg": format!("/gpu-activity.svg?theme={}&weeks={}", graph.default_theme.as_str(), graph.default_weeks),
            "themes": Theme::ALL.iter().map(|t| t.as_str()).collect::<Vec<_>>(),
            "weeks": format!("Number of weeks to display (1-{})", graph.max_weeks),
        },
        "defaults": {
            "theme": graph.default_theme,
            "weeks": graph.default_weeks,
            "maxWeeks": graph.max_weeks,
            "cacheTtlSecs": graph.cache_ttl_secs,
            "weekStart": graph.week_start,
            "levelThresholds": graph.level_thresholds,
        },
    }))
}
