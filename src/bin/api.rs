use finsight::{api::start_server, app::App, config::AppConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;
    let port = config.port;

    info!("Financial Document Analysis - API Server");
    info!("Port: {}", port);

    let app = App::from_config(config)?;
    if finsight::credentials::api_key(app.credentials.as_ref())?.is_none() {
        info!("No Gemini API key configured yet; PUT /api/credential to set one");
    }

    start_server(app.orchestrator, app.credentials, port).await?;

    Ok(())
}
