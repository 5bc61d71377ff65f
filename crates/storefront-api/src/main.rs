//! Storefront API Server
//!
//! REST API server for storefront authentication and access control.

use anyhow::Context;
use secrecy::ExposeSecret;
use std::sync::Arc;
use storefront_api::auth::{CredentialVerifier, PasswordConfig, TokenCodec};
use storefront_api::{create_router, state::AppState};
use storefront_core::{AppConfig, IdentityRepository, MemoryIdentityStore, PgIdentityStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = match std::env::var("STOREFRONT_CONFIG") {
        Ok(path) => AppConfig::from_file(path)?.with_env_override()?,
        Err(_) => AppConfig::from_env()?,
    };

    init_tracing(&config);

    config.validate().context("Invalid configuration")?;

    let codec = TokenCodec::from_config(&config.auth)?;

    let repo: Arc<dyn IdentityRepository> = match config.database.postgres_url.as_deref() {
        Some(url) => {
            let store = PgIdentityStore::new(url, config.database.pool_size).await?;
            store.ensure_schema().await?;
            tracing::info!("Connected to PostgreSQL identity store");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory identity store");
            Arc::new(MemoryIdentityStore::new())
        }
    };

    // Create application state
    let state = Arc::new(AppState::new(
        repo,
        codec,
        CredentialVerifier::new(PasswordConfig::default()),
    ));

    if let (Some(email), Some(password)) = (
        config.auth.bootstrap_admin_email.as_deref(),
        config.auth.bootstrap_admin_password.as_ref(),
    ) {
        let created = state
            .auth
            .bootstrap_admin(email, password.expose_secret().to_string())
            .await
            .map_err(|e| anyhow::anyhow!("Admin bootstrap failed: {e:?}"))?;
        match created {
            Some(admin) => tracing::info!(user_id = %admin.id, "Bootstrap admin created"),
            None => tracing::info!("Admin account already present, bootstrap skipped"),
        }
    }

    let app = create_router(state, &config.server.cors_origins);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Storefront API Server starting on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);
    tracing::info!("OpenAPI spec at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "storefront_api={level},storefront_core={level},tower_http=info",
            level = config.logging.level
        )
        .into()
    });

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::warn!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::warn!("Received SIGTERM, shutting down"),
    }
}
