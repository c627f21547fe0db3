//! schoolgate server — application entry point.

use schoolgate_server::{AppState, ServerConfig, router};
use schoolgate_store::MemoryDb;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("schoolgate=info".parse()?))
        .json()
        .init();

    let config = ServerConfig::from_env()?;
    tracing::info!(
        addr = %config.http_addr,
        require_step_up = config.auth.require_step_up,
        all_modules_fallback = config.entitlements.all_modules_fallback,
        mfa_enrollment = config.auth.mfa_encryption_key.is_some(),
        "Starting schoolgate server..."
    );

    let state = AppState::new(MemoryDb::new(), config.auth, config.entitlements);
    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    tracing::info!("schoolgate server stopped.");
    Ok(())
}
