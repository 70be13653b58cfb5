// src/routes.rs

use axum::{
    Router,
    http::{HeaderName, HeaderValue, header},
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};

use crate::{
    error::panic_response,
    handlers::{health, submit},
    state::AppState,
};

/// The four CORS headers sent on every response, errors included.
///
/// The quiz page is served from another origin. `CorsLayer` refuses to pair a
/// wildcard origin with credentials, so the headers are set directly.
const CORS_HEADERS: [(HeaderName, &str); 4] = [
    (header::ACCESS_CONTROL_ALLOW_CREDENTIALS, "true"),
    (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
    (header::ACCESS_CONTROL_ALLOW_METHODS, "POST, OPTIONS"),
    (header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
];

/// Assembles the application router.
///
/// * `/api/submit`: POST submits, OPTIONS answers preflight, anything else is 405.
/// * `/api/health`: liveness probe.
/// * Global middleware: Trace, panic-to-500, CORS headers.
pub fn create_router(state: AppState) -> Router {
    let submit_routes = post(submit::submit_test)
        .options(submit::preflight)
        .fallback(submit::method_not_allowed);

    let [credentials, origin, methods, headers] =
        CORS_HEADERS.map(|(name, value)| {
            SetResponseHeaderLayer::overriding(name, HeaderValue::from_static(value))
        });

    Router::new()
        .route("/api/submit", submit_routes)
        .route("/api/health", get(health::health_check))
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(credentials)
                .layer(origin)
                .layer(methods)
                .layer(headers)
                .layer(CatchPanicLayer::custom(panic_response)),
        )
        .with_state(state)
}
