//! Unversioned shell handlers: welcome, health, readiness, OpenAPI document and docs page.

use crate::state::AppState;
use crate::store::ConnectionState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::openapi::OpenApi;

#[derive(Serialize, Deserialize)]
pub struct WelcomeBody {
    pub message: String,
    pub version: String,
    pub docs: String,
}

#[derive(Serialize, Deserialize)]
pub struct HealthBody {
    pub status: String,
    pub environment: String,
}

#[derive(Serialize)]
struct ReadyBody {
    status: &'static str,
    database: &'static str,
}

pub async fn root(State(state): State<AppState>) -> Json<WelcomeBody> {
    Json(WelcomeBody {
        message: format!("Welcome to {}", state.settings.project_name),
        version: state.settings.version.clone(),
        docs: state.settings.docs_path(),
    })
}

/// Liveness. Always 200; reports unhealthy once the pool has ever failed to come up, or after dispose.
pub async fn health(State(state): State<AppState>) -> Json<HealthBody> {
    let status = match state.connections.state() {
        _ if state.connections.has_failed() => "unhealthy",
        ConnectionState::Failed | ConnectionState::Disposed => "unhealthy",
        ConnectionState::Uninitialized | ConnectionState::Ready => "healthy",
    };
    Json(HealthBody {
        status: status.to_string(),
        environment: state.settings.environment.clone(),
    })
}

pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    match state.connections.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ReadyBody {
                status: "ok",
                database: "ok",
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadyBody {
                    status: "degraded",
                    database: "unavailable",
                }),
            )
        }
    }
}

pub async fn openapi(State(state): State<AppState>) -> Json<OpenApi> {
    Json(state.openapi.as_ref().clone())
}

pub async fn docs(State(state): State<AppState>) -> Html<String> {
    Html(swagger_page(
        &state.settings.project_name,
        &state.settings.openapi_path(),
    ))
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn swagger_page(title: &str, spec_url: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title} - Swagger UI</title>
    <link rel="stylesheet" type="text/css" href="https://unpkg.com/swagger-ui-dist@5.9.0/swagger-ui.css" />
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5.9.0/swagger-ui-bundle.js"></script>
    <script>
        window.onload = function() {{
            window.ui = SwaggerUIBundle({{
                url: "{spec_url}",
                dom_id: '#swagger-ui',
                deepLinking: true,
                presets: [SwaggerUIBundle.presets.apis],
                validatorUrl: null
            }});
        }};
    </script>
</body>
</html>"#,
        title = escape_html(title),
        spec_url = escape_html(spec_url),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn docs_page_points_at_document() {
        let page = swagger_page("A <b> API", "/api/v1/openapi.json");
        assert!(page.contains("url: \"/api/v1/openapi.json\""));
        assert!(page.contains("<title>A &lt;b&gt; API - Swagger UI</title>"));
    }
}
