//! Two-phase start/stop contract driven by the process entry point around the serve loop.

use crate::error::AppError;
use async_trait::async_trait;

#[async_trait]
pub trait Lifecycle: Send + Sync {
    /// Bring the component up. An error here must stop the process from serving.
    async fn start(&self) -> Result<(), AppError>;

    /// Release everything acquired in `start`. Called once, after in-flight work has drained.
    async fn stop(&self) -> Result<(), AppError>;
}
