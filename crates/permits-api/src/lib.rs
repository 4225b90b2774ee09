//! # permits-api: Axum API Service for the County Permits Portal
//!
//! Citizens apply for business permits with their supporting documents,
//! officers review them, and approved applications are paid for through an
//! external payment collaborator. Every status change is recorded and shown
//! back as a timeline.
//!
//! ## API Surface
//!
//! | Prefix                         | Module                     | Domain          |
//! |--------------------------------|----------------------------|-----------------|
//! | `/v1/permit-types*`            | [`routes::permits`]        | Catalog         |
//! | `/v1/users*`                   | [`routes::users`]          | Accounts        |
//! | `/v1/applications*`            | [`routes::applications`]   | Applications    |
//! | `/v1/dashboard`, `/v1/officer/*` | [`routes::officer`]      | Dashboards      |
//! | `/v1/applications/{n}/payment`, `/v1/payments/callback` | [`routes::payments`] | Payments |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware → Handler
//! ```
//!
//! Health probes, `/metrics` and the payment callback sit outside bearer
//! auth. The callback carries its own signature check.

pub mod auth;
pub mod config;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod model;
pub mod openapi;
pub mod routes;
pub mod service;
pub mod state;
pub mod store;

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;
use crate::state::AppState;

/// Assemble the full application router.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };

    let api = Router::new()
        .merge(routes::permits::router())
        .merge(routes::users::router())
        .merge(routes::applications::router())
        .merge(routes::officer::router())
        .merge(routes::payments::router())
        .merge(openapi::router())
        .layer(from_fn(auth::auth_middleware))
        .layer(axum::Extension(auth_config));

    let public = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .route("/metrics", get(render_metrics))
        .merge(routes::payments::callback_router());

    Router::new()
        .merge(public)
        .merge(api)
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn liveness() -> &'static str {
    "ok"
}

/// Ready once the store answers.
async fn readiness(State(state): State<AppState>) -> Response {
    match state.service.store().ping().await {
        Ok(()) => (StatusCode::OK, "ready").into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "store unavailable").into_response()
        }
    }
}

async fn render_metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4",
            )],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}
