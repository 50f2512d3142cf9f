//! Shared state for the unversioned shell routes and the versioned dispatcher.

use crate::config::Settings;
use crate::routes::RouterComposer;
use crate::store::ConnectionManager;
use std::sync::Arc;
use utoipa::openapi::OpenApi;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub connections: Arc<ConnectionManager>,
    pub api: Arc<RouterComposer>,
    /// Built once from the mounted routes.
    pub openapi: Arc<OpenApi>,
}
