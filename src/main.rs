use minimalist_api::{shutdown_signal, Application, Settings};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("minimalist_api=info,tower_http=info")),
        )
        .init();

    let settings = Settings::from_env()?;
    let app = Application::from_settings(settings)?;
    app.run(shutdown_signal()).await?;
    Ok(())
}
