//! Route definitions

use axum::{
    Router,
    http::{Method, header},
    routing::{delete, get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::{
    handlers::{fallback, tasks},
    middleware::{BodyCaptureLayer, RequestMetricsLayer, ServerSpan},
    state::AppState,
};

/// Permissive CORS policy applied to every response
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

/// Create the task API router
///
/// CORS and metrics are route layers: metrics wrap CORS so preflight
/// responses are counted, and both see the matched route template.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/tasks",
            get(tasks::list_tasks)
                .post(tasks::create_task)
                .options(tasks::preflight)
                .fallback(tasks::method_not_allowed),
        )
        .route(
            "/tasks/{id}",
            delete(tasks::delete_task)
                .options(tasks::preflight)
                .fallback(tasks::method_not_allowed),
        )
        .route(
            "/tasks/{id}/complete",
            post(tasks::complete_task)
                .options(tasks::preflight)
                .fallback(tasks::method_not_allowed),
        )
        .route_layer(cors_layer())
        .route_layer(RequestMetricsLayer::new(state.telemetry.clone()))
        .with_state(state)
}

/// Wrap the task API with the non-API fallback and request instrumentation
///
/// With `static_dir` set, every non-API path is served from that directory.
pub fn create_app(state: AppState, static_dir: Option<&str>) -> Router {
    let non_api = match static_dir {
        Some(dir) => Router::new().fallback_service(ServeDir::new(dir)),
        None => Router::new().fallback(fallback::not_found),
    }
    .layer(cors_layer());

    create_router(state)
        .fallback_service(non_api)
        .layer(BodyCaptureLayer::new())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(ServerSpan)
                .on_response(ServerSpan),
        )
}
