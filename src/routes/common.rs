//! Shell routes: welcome, health, readiness, OpenAPI document and docs, then the versioned dispatcher.

use crate::handlers::{docs, health, openapi, ready, root};
use crate::state::AppState;
use axum::{extract::Request, extract::State, response::Response, routing::get, Router};

async fn dispatch_versioned(State(state): State<AppState>, req: Request) -> Response {
    state.api.clone().dispatch(req).await
}

/// GET /, /health, /ready, {prefix}/openapi.json and {prefix}/docs; everything else goes to the composer.
pub fn common_routes(state: AppState) -> Router {
    let openapi_path = state.settings.openapi_path();
    let docs_path = state.settings.docs_path();
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route(&openapi_path, get(openapi))
        .route(&docs_path, get(docs))
        .fallback(dispatch_versioned)
        .with_state(state)
}
