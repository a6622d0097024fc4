use aideas_server::{cors_layer, router, AppState, BoxedError, IdeaRepository, ServerConfig};
use dotenvy::dotenv;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), BoxedError> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env()?;
    let repository = IdeaRepository::connect(&config.database_url).await?;

    let app = router(AppState::new(repository)).layer(cors_layer(&config.app_url)?);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    info!("Server listening on http://localhost:{}", config.port);

    axum::serve(listener, app).await?;

    Ok(())
}
