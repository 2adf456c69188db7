use std::sync::Arc;

use anyhow::Context;
use chirpy_server::{
    api::ApiState,
    auth::{jwt::AccessTokenCodec, password::PasswordHasher, session::SessionService},
    build_router,
    config::{LogFormat, ServerConfig},
    db::{
        migrations::run_migrations,
        pool::{check_pool_health, create_pg_pool, PoolConfig},
    },
    store::AuthStore,
};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env();
    init_tracing(&config);

    if config.is_dev_jwt_secret() {
        warn!("CHIRPY_JWT_SECRET is not set; using the development signing secret");
    }
    if config.polka_key.is_none() {
        warn!("CHIRPY_POLKA_KEY is not set; every webhook call will be refused");
    }

    let store = open_store(&config).await?;
    let access =
        AccessTokenCodec::with_ttl_ceiling(&config.jwt_secret, config.access_ttl_ceiling_secs)
            .context("invalid chirpy access token settings")?;
    let hasher = PasswordHasher::new().context("failed to initialize password hasher")?;
    let sessions = Arc::new(SessionService::new(store, hasher, access));

    let app = build_router(ApiState::new(sessions, config.polka_key.clone(), config.platform));

    let listener = TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind chirpy listener on {}", config.listen_addr))?;

    info!(
        listen_addr = %config.listen_addr,
        platform = ?config.platform,
        access_ttl_ceiling_secs = config.access_ttl_ceiling_secs,
        "starting chirpy server"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("chirpy server exited unexpectedly")
}

fn init_tracing(config: &ServerConfig) {
    let filter = EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match config.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

async fn open_store(config: &ServerConfig) -> anyhow::Result<AuthStore> {
    let Some(database_url) = config.database_url.as_deref() else {
        warn!("CHIRPY_DATABASE_URL is not set; users and sessions live in memory only");
        return Ok(AuthStore::memory());
    };

    let pool = create_pg_pool(database_url, PoolConfig::from_env(!config.is_dev()))
        .await
        .context("failed to initialize chirpy PostgreSQL pool")?;
    check_pool_health(&pool).await?;
    run_migrations(&pool).await?;

    info!("connected to PostgreSQL and applied migrations");
    Ok(AuthStore::Postgres(pool))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            error!(%error, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                error!(%error, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received");
}
