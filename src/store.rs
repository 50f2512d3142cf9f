//! Connection manager: the process-wide PostgreSQL pool and its lifecycle.
//!
//! States run `Uninitialized -> Ready -> Disposed`. A failed connect parks the manager in `Failed`
//! (it may be retried). `Disposed` is terminal: every later `acquire` fails.

use crate::config::DatabaseSettings;
use crate::error::AppError;
use crate::lifecycle::Lifecycle;
use crate::migration::{self, SchemaReport};
use crate::model::TableDescriptor;
use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{ConnectOptions, PgConnection, PgPool, Postgres};
use std::ops::{Deref, DerefMut};
use std::path::Path;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Uninitialized,
    Ready,
    Failed,
    Disposed,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Uninitialized => "uninitialized",
            ConnectionState::Ready => "ready",
            ConnectionState::Failed => "failed",
            ConnectionState::Disposed => "disposed",
        }
    }
}

struct Inner {
    state: ConnectionState,
    pool: Option<PgPool>,
}

/// Counts one checked-out handle for as long as it lives.
pub(crate) struct Lease(Arc<AtomicUsize>);

impl Drop for Lease {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A pooled connection checked out for one unit of work. Returned to the pool when dropped.
pub struct PooledHandle {
    conn: PoolConnection<Postgres>,
    _lease: Lease,
}

impl Deref for PooledHandle {
    type Target = PgConnection;

    fn deref(&self) -> &PgConnection {
        &self.conn
    }
}

impl DerefMut for PooledHandle {
    fn deref_mut(&mut self) -> &mut PgConnection {
        &mut self.conn
    }
}

pub struct ConnectionManager {
    settings: Option<DatabaseSettings>,
    inner: RwLock<Inner>,
    leases: Arc<AtomicUsize>,
    ever_failed: AtomicBool,
}

impl ConnectionManager {
    /// New manager in `Uninitialized`; the pool is created by `connect` (or `Lifecycle::start`).
    pub fn new(settings: DatabaseSettings) -> Self {
        ConnectionManager {
            settings: Some(settings),
            inner: RwLock::new(Inner {
                state: ConnectionState::Uninitialized,
                pool: None,
            }),
            leases: Arc::new(AtomicUsize::new(0)),
            ever_failed: AtomicBool::new(false),
        }
    }

    /// Wrap an existing pool; the manager starts in `Ready`.
    pub fn from_pool(pool: PgPool) -> Self {
        ConnectionManager {
            settings: None,
            inner: RwLock::new(Inner {
                state: ConnectionState::Ready,
                pool: Some(pool),
            }),
            leases: Arc::new(AtomicUsize::new(0)),
            ever_failed: AtomicBool::new(false),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>, AppError> {
        self.inner
            .read()
            .map_err(|_| AppError::Internal("connection state lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>, AppError> {
        self.inner
            .write()
            .map_err(|_| AppError::Internal("connection state lock poisoned".into()))
    }

    pub fn state(&self) -> ConnectionState {
        match self.inner.read() {
            Ok(inner) => inner.state,
            Err(poisoned) => poisoned.into_inner().state,
        }
    }

    /// True once any `connect` attempt has failed, even if a later retry reached `Ready`.
    pub fn has_failed(&self) -> bool {
        self.ever_failed.load(Ordering::SeqCst)
    }

    /// Number of handles currently checked out.
    pub fn checked_out(&self) -> usize {
        self.leases.load(Ordering::SeqCst)
    }

    /// Build the pool and verify connectivity. No-op when already `Ready`.
    pub async fn connect(&self) -> Result<(), AppError> {
        match self.state() {
            ConnectionState::Ready => return Ok(()),
            ConnectionState::Disposed => return Err(AppError::Disposed),
            ConnectionState::Uninitialized | ConnectionState::Failed => {}
        }
        let settings = self.settings.as_ref().ok_or(AppError::NotReady)?;

        let connected = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(settings.acquire_timeout)
            .connect(&settings.url)
            .await;

        let pool = match connected {
            Ok(pool) => pool,
            Err(e) => {
                self.ever_failed.store(true, Ordering::SeqCst);
                let mut inner = self.write()?;
                if inner.state != ConnectionState::Disposed {
                    inner.state = ConnectionState::Failed;
                }
                tracing::error!(error = %e, "connection pool failed to initialize");
                return Err(AppError::Db(e));
            }
        };

        // Disposed while connecting: the new pool is closed instead of installed.
        let rejected = {
            let mut inner = self.write()?;
            if inner.state == ConnectionState::Disposed {
                Some(pool)
            } else {
                inner.state = ConnectionState::Ready;
                inner.pool = Some(pool);
                None
            }
        };
        if let Some(pool) = rejected {
            pool.close().await;
            return Err(AppError::Disposed);
        }
        tracing::info!(max_connections = settings.max_connections, "connection pool ready");
        Ok(())
    }

    /// Reserve a lease and clone the pool handle, under the state lock so `dispose` cannot interleave.
    pub(crate) fn begin_lease(&self) -> Result<(PgPool, Lease), AppError> {
        let inner = self.read()?;
        match inner.state {
            ConnectionState::Ready => {}
            ConnectionState::Disposed => return Err(AppError::Disposed),
            ConnectionState::Uninitialized | ConnectionState::Failed => return Err(AppError::NotReady),
        }
        let pool = inner.pool.clone().ok_or(AppError::NotReady)?;
        self.leases.fetch_add(1, Ordering::SeqCst);
        Ok((pool, Lease(self.leases.clone())))
    }

    /// Check out a connection. Only valid in `Ready`; after `dispose` this always fails.
    pub async fn acquire(&self) -> Result<PooledHandle, AppError> {
        let (pool, lease) = self.begin_lease()?;
        let conn = pool.acquire().await?;
        Ok(PooledHandle { conn, _lease: lease })
    }

    /// Create every missing table in `tables` on a scoped connection.
    pub async fn create_schema(&self, tables: &[TableDescriptor]) -> Result<SchemaReport, AppError> {
        let mut handle = self.acquire().await?;
        migration::create_schema(&mut handle, tables).await
    }

    /// Apply migrations from `dir`. Counts as a checked-out handle until it returns.
    pub async fn run_migrations(&self, dir: &Path) -> Result<(), AppError> {
        let (pool, _lease) = self.begin_lease()?;
        migration::run_migrations(&pool, dir).await
    }

    pub async fn ping(&self) -> Result<(), AppError> {
        let mut handle = self.acquire().await?;
        sqlx::query("SELECT 1").execute(&mut *handle).await?;
        Ok(())
    }

    /// Close every pooled connection and enter `Disposed`. Fails while handles are checked out.
    pub async fn dispose(&self) -> Result<(), AppError> {
        let pool = {
            let mut inner = self.write()?;
            if inner.state == ConnectionState::Disposed {
                return Ok(());
            }
            let in_use = self.checked_out();
            if in_use > 0 {
                tracing::error!(in_use, "refusing to dispose connection pool with checked-out connections");
                return Err(AppError::ConnectionsInUse(in_use));
            }
            inner.state = ConnectionState::Disposed;
            inner.pool.take()
        };
        if let Some(pool) = pool {
            pool.close().await;
        }
        tracing::info!("connection pool disposed");
        Ok(())
    }
}

#[async_trait]
impl Lifecycle for ConnectionManager {
    async fn start(&self) -> Result<(), AppError> {
        self.connect().await
    }

    async fn stop(&self) -> Result<(), AppError> {
        self.dispose().await
    }
}

/// Create the target database if missing, by connecting to the `postgres` admin database on the same server.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = PgConnectOptions::from_str(&admin_url)
        .map_err(|e| AppError::BadRequest(format!("invalid DATABASE_URL: {}", e)))?;
    let mut conn: PgConnection = opts.connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        sqlx::query(&format!("CREATE DATABASE {}", migration::quote(&db_name)))
            .execute(&mut conn)
            .await?;
        tracing::info!(database = %db_name, "created database");
    }
    Ok(())
}

fn parse_db_name_from_url(url: &str) -> Result<(String, String), AppError> {
    let scheme_end = url.find("://").map(|i| i + 3).unwrap_or(0);
    let path_start = url[scheme_end..]
        .find('/')
        .map(|i| scheme_end + i + 1)
        .ok_or_else(|| AppError::BadRequest("DATABASE_URL: no database path".into()))?;
    let path_and_query = url.get(path_start..).unwrap_or("");
    let mut parts = path_and_query.splitn(2, '?');
    let db_name = parts.next().unwrap_or("").trim().to_string();
    let query = parts.next().map(|q| format!("?{}", q)).unwrap_or_default();
    let base = url.get(..path_start).unwrap_or(url);
    Ok((format!("{}postgres{}", base, query), db_name))
}
