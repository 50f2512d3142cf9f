//! Application shell: wires settings, the connection manager, the schema registry and the versioned
//! router into one HTTP service, and drives start -> serve -> drain -> stop.

use crate::config::{SchemaMode, Settings};
use crate::error::{AppError, ConfigError};
use crate::lifecycle::Lifecycle;
use crate::model::{default_registry, SchemaRegistry};
use crate::openapi::build_openapi;
use crate::routes::{api_router, common_routes, RouterComposer};
use crate::state::AppState;
use crate::store::{ensure_database_exists, ConnectionManager};
use async_trait::async_trait;
use axum::{
    http::HeaderValue,
    response::{IntoResponse, Response},
    Router,
};
use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

pub struct Application {
    settings: Arc<Settings>,
    connections: Arc<ConnectionManager>,
    registry: Arc<SchemaRegistry>,
    api: Arc<RouterComposer>,
}

impl Application {
    /// Assemble from parts. The composer must be mounted under the configured `API_V1_STR`.
    pub fn new(
        settings: Settings,
        connections: Arc<ConnectionManager>,
        registry: SchemaRegistry,
        api: RouterComposer,
    ) -> Result<Self, ConfigError> {
        if api.version_prefix() != settings.api_v1_str {
            return Err(ConfigError::Invalid {
                key: "API_V1_STR",
                reason: format!(
                    "router composed under '{}' but settings say '{}'",
                    api.version_prefix(),
                    settings.api_v1_str
                ),
            });
        }
        Ok(Application {
            settings: Arc::new(settings),
            connections,
            registry: Arc::new(registry),
            api: Arc::new(api),
        })
    }

    /// Default wiring: every built-in entity registered and routed under `API_V1_STR`.
    pub fn from_settings(settings: Settings) -> Result<Self, ConfigError> {
        let connections = Arc::new(ConnectionManager::new(settings.database.clone()));
        let registry = default_registry()?;
        let api = api_router(&settings.api_v1_str, connections.clone())?;
        Application::new(settings, connections, registry, api)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn connections(&self) -> &Arc<ConnectionManager> {
        &self.connections
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// The complete HTTP service with middleware attached.
    pub fn router(&self) -> Router {
        let state = AppState {
            settings: self.settings.clone(),
            connections: self.connections.clone(),
            api: self.api.clone(),
            openapi: Arc::new(build_openapi(&self.settings, &self.api)),
        };
        let router = common_routes(state)
            .layer(CatchPanicLayer::custom(panic_response))
            .layer(RequestBodyLimitLayer::new(self.settings.max_body_bytes))
            .layer(TraceLayer::new_for_http());
        match cors_layer(&self.settings.backend_cors_origins) {
            Some(cors) => router.layer(cors),
            None => router,
        }
    }

    async fn prepare_schema(&self) -> Result<(), AppError> {
        match &self.settings.schema_mode {
            SchemaMode::AutoCreate => {
                let report = self.connections.create_schema(&self.registry.all_tables()).await?;
                if report.is_noop() {
                    tracing::info!(tables = report.existing.len(), "schema already up to date");
                }
            }
            SchemaMode::Migrate { dir } => self.connections.run_migrations(dir).await?,
            SchemaMode::None => tracing::info!("schema preparation disabled"),
        }
        Ok(())
    }

    /// Serve on `listener` until `shutdown` resolves, then wait for in-flight requests to finish.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<(), AppError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::info!(
            addr = %listener.local_addr()?,
            environment = %self.settings.environment,
            api = %self.settings.api_v1_str,
            routers = self.api.mounts().len(),
            "listening"
        );
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;
        tracing::info!("server drained");
        Ok(())
    }

    /// Full lifecycle: start (fatal on error), bind, serve until `shutdown`, drain, stop.
    pub async fn run<F>(&self, shutdown: F) -> Result<(), AppError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if let Err(e) = self.start().await {
            tracing::error!(error = %e, "startup failed");
            if let Err(stop_err) = self.stop().await {
                tracing::warn!(error = %stop_err, "cleanup after failed startup");
            }
            return Err(e);
        }
        let listener = TcpListener::bind(self.settings.bind_addr).await?;
        let served = self.serve(listener, shutdown).await;
        let stopped = self.stop().await;
        served.and(stopped)
    }
}

#[async_trait]
impl Lifecycle for Application {
    async fn start(&self) -> Result<(), AppError> {
        if self.settings.schema_mode == SchemaMode::AutoCreate {
            if let Err(e) = ensure_database_exists(&self.settings.database.url).await {
                tracing::warn!(error = %e, "could not ensure database exists; connecting anyway");
            }
        }
        self.connections.start().await?;
        self.prepare_schema().await?;
        tracing::info!(project = %self.settings.project_name, version = %self.settings.version, "started");
        Ok(())
    }

    async fn stop(&self) -> Result<(), AppError> {
        self.connections.stop().await
    }
}

/// Credentialed CORS restricted to `origins`; methods and headers mirror the request.
/// `None` for an empty list: no cross-origin headers at all.
pub fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    if origins.is_empty() {
        return None;
    }
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();
    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_credentials(true)
            .allow_methods(AllowMethods::mirror_request())
            .allow_headers(AllowHeaders::mirror_request()),
    )
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    AppError::Internal(format!("handler panicked: {}", detail)).into_response()
}

/// Resolves on SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received SIGINT, shutting down"),
        () = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
