use chrono::Duration;
use tracing_subscriber::EnvFilter;

use todo_api::config::Config;
use todo_api::database::{self, create_database_connection, run_migrations};
use todo_api::models::token::TokenSigner;
use todo_api::{app, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("todo_api=debug,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool = create_database_connection(&config.database_url, config.max_connections).await?;
    run_migrations(&pool).await?;

    let signer = TokenSigner::new(
        config.jwt_secret.as_bytes(),
        Duration::hours(config.token_ttl_hours),
    );
    let state = AppState::new(pool.clone(), signer, config.bcrypt_cost);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Server running at http://{}", config.bind_addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    database::close(pool).await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
