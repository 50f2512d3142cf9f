use minimalist_api::{
    api_router, default_registry, AppError, Application, ConnectionManager, ConnectionState, Lifecycle, SchemaMode,
    Settings,
};
use sqlx::postgres::PgPoolOptions;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const UNREACHABLE: &str = "postgres://127.0.0.1:1/unreachable";

fn settings(pairs: &[(&str, &str)]) -> Settings {
    let mut map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    map.entry("DATABASE_URL".into()).or_insert_with(|| UNREACHABLE.into());
    Settings::from_lookup(|k| map.get(k).cloned()).unwrap()
}

fn app(settings: Settings) -> Application {
    let pool = PgPoolOptions::new()
        .acquire_timeout(Duration::from_millis(100))
        .connect_lazy(UNREACHABLE)
        .unwrap();
    let connections = Arc::new(ConnectionManager::from_pool(pool));
    let api = api_router(&settings.api_v1_str, connections.clone()).unwrap();
    Application::new(settings, connections, default_registry().unwrap(), api).unwrap()
}

#[tokio::test]
async fn start_without_schema_preparation_succeeds() {
    let app = app(settings(&[("SCHEMA_MODE", "none")]));
    assert_eq!(app.settings().schema_mode, SchemaMode::None);
    assert_eq!(app.registry().len(), 2);

    app.start().await.unwrap();
    assert_eq!(app.connections().state(), ConnectionState::Ready);
    app.stop().await.unwrap();
    assert_eq!(app.connections().state(), ConnectionState::Disposed);
}

#[tokio::test]
async fn auto_create_against_unreachable_database_fails_start() {
    let app = app(settings(&[("SCHEMA_MODE", "auto_create")]));
    let err = app.start().await.unwrap_err();
    assert!(matches!(err, AppError::Db(sqlx::Error::PoolTimedOut)), "{err}");
    assert_eq!(app.connections().checked_out(), 0);
}

#[tokio::test]
async fn run_stops_before_serving_when_start_fails() {
    // BIND_ADDR is never bound: startup fails first.
    let app = app(settings(&[("SCHEMA_MODE", "auto_create"), ("BIND_ADDR", "127.0.0.1:0")]));
    let result = tokio::time::timeout(Duration::from_secs(10), app.run(std::future::pending())).await;
    let err = result.expect("run must return instead of serving").unwrap_err();
    assert!(matches!(err, AppError::Db(_)));
    assert_eq!(app.connections().state(), ConnectionState::Disposed);
}

#[tokio::test]
async fn migrate_with_missing_directory_fails_start() {
    let dir = std::env::temp_dir().join(format!("minimalist-missing-{}", uuid::Uuid::new_v4().simple()));
    let dir_str = dir.to_string_lossy().into_owned();
    let app = app(settings(&[("SCHEMA_MODE", "migrate"), ("MIGRATIONS_DIR", dir_str.as_str())]));
    assert_eq!(app.settings().schema_mode, SchemaMode::Migrate { dir: PathBuf::from(&dir_str) });

    let err = app.start().await.unwrap_err();
    assert!(matches!(err, AppError::Migrate(_)), "{err}");
    assert_eq!(app.connections().checked_out(), 0);
    app.stop().await.unwrap();
}
