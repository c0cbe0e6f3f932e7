use std::net::SocketAddr;

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    admin, audits, auth,
    security::{headers::security_headers, payload::check_request_size, rate_limit::enforce},
    state::AppState,
};

async fn index() -> Json<Value> {
    Json(json!({
        "message": "CYBAK API Backend",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "auth": ["/api/auth/signup", "/api/auth/login", "/api/auth/me"],
            "audits": ["/api/audits"],
            "admin": ["/api/admin/stats", "/api/admin/users", "/api/admin/promote/{id}"],
        }
    }))
}

/// Full router. Request path through the layers, outermost first: trace,
/// CORS, security headers, payload size, global rate limit, then the
/// per-route stages and extractors.
pub fn build_app(state: AppState) -> Router {
    let max_body = state.config.max_body_bytes;
    let environment = state.config.environment;

    Router::new()
        .route("/", get(index))
        .nest(
            "/api",
            Router::new()
                .merge(auth::router(&state))
                .merge(audits::router())
                .merge(admin::router(&state))
                .route("/health", get(|| async { "ok" })),
        )
        .layer(from_fn_with_state(state.limiters.global.clone(), enforce))
        .layer(from_fn_with_state(max_body, check_request_size))
        .layer(DefaultBodyLimit::max(max_body))
        .layer(from_fn_with_state(environment, security_headers))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
