//! Dashboard HTTP server.
//!
//! Routes:
//!   GET  /                 full page; `?sites=..` sets the comparison
//!   GET  /compare          comparison fragment only
//!   GET  /api/report       report as JSON
//!   POST /api/cache/clear  drop the cached table

pub mod dashboard;

pub use dashboard::{Dashboard, DashboardError, DashboardSettings};

use crate::report::{escape_html, PageMode};
use anyhow::{Context, Result};
use axum::extract::{Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

type SharedDashboard = Arc<Dashboard>;

/// Build the dashboard router.
pub fn router(dashboard: SharedDashboard) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/compare", get(compare))
        .route("/api/report", get(api_report))
        .route("/api/cache/clear", post(clear_cache))
        .layer(middleware::from_fn(log_request))
        .with_state(dashboard)
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(dashboard: SharedDashboard, addr: &str) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    let local = listener.local_addr()?;

    info!("Dashboard listening on http://{}", local);
    println!("🌐 Dashboard available at http://{}", local);

    axum::serve(listener, router(dashboard))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Dashboard server failed")?;

    info!("Dashboard stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for Ctrl-C, running until killed: {}", e);
        std::future::pending::<()>().await;
    }
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    info!(
        "{} {} -> {} ({:.1?})",
        method,
        path,
        response.status().as_u16(),
        start.elapsed()
    );
    response
}

async fn index(
    State(dashboard): State<SharedDashboard>,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    let selection = selected_sites(&params);
    let result = run_blocking(dashboard.clone(), move |d| {
        d.page(selection, PageMode::Interactive)
    })
    .await;

    match result {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            let status = status_for(&e);
            (status, Html(dashboard.error_page(&e))).into_response()
        }
    }
}

async fn compare(
    State(dashboard): State<SharedDashboard>,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    let selection = selected_sites(&params).unwrap_or_default();
    let result = run_blocking(dashboard, move |d| d.comparison_fragment(&selection)).await;

    match result {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            let fragment = format!("<div class=\"error\">{}</div>", escape_html(&e.to_string()));
            (status_for(&e), Html(fragment)).into_response()
        }
    }
}

async fn api_report(
    State(dashboard): State<SharedDashboard>,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    let selection = selected_sites(&params);

    match run_blocking(dashboard, move |d| d.report(selection)).await {
        Ok(report) => Json(report).into_response(),
        Err(e) => {
            let body = serde_json::json!({ "error": e.to_string() });
            (status_for(&e), Json(body)).into_response()
        }
    }
}

async fn clear_cache(State(dashboard): State<SharedDashboard>) -> StatusCode {
    dashboard.clear_cache();
    StatusCode::NO_CONTENT
}

/// Loading a workbook and drawing charts is blocking work.
async fn run_blocking<T, F>(dashboard: SharedDashboard, f: F) -> Result<T, DashboardError>
where
    F: FnOnce(&Dashboard) -> Result<T, DashboardError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&dashboard))
        .await
        .map_err(|e| DashboardError::Render(anyhow::anyhow!("Render task failed: {}", e)))?
}

fn status_for(error: &DashboardError) -> StatusCode {
    match error {
        DashboardError::UnknownSites(sites) => {
            warn!("Rejected unknown sites: {}", sites.join(", "));
            StatusCode::BAD_REQUEST
        }
        DashboardError::Load(e) => {
            error!("Erreur lors du chargement des données: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
        other => {
            error!("Request failed: {}", other);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Collect `sites` query values; comma lists are accepted too.
///
/// `None` when the key never appears, so the default selection applies.
fn selected_sites(params: &[(String, String)]) -> Option<Vec<String>> {
    let mut found = false;
    let mut sites = Vec::new();

    for (key, value) in params {
        if key != "sites" {
            continue;
        }
        found = true;
        sites.extend(
            value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from),
        );
    }

    found.then_some(sites)
}
