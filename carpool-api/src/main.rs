use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use carpool_api::{app, AppState, AuthConfig};
use carpool_store::app_config::{Config, StoreBackend};
use carpool_store::{DbClient, RedisClient, Stores};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "carpool_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Carpool API on port {}", config.server.port);

    let stores = match config.store.backend {
        StoreBackend::Postgres => {
            let db = DbClient::new(&config.database)
                .await
                .context("Failed to connect to Postgres")?;
            db.migrate().await.context("Failed to run migrations")?;
            Stores::postgres(&db)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on restart");
            Stores::memory()
        }
    };

    let auth = AuthConfig {
        secret: config.auth.jwt_secret.clone(),
        expiration: config.auth.jwt_expiration_seconds,
    };
    let mut app_state = AppState::new(stores, auth).with_paging(config.paging.clone());

    if let Some(redis) = &config.redis {
        let redis_client = RedisClient::new(&redis.url)
            .await
            .context("Failed to connect to Redis")?;
        app_state = app_state.with_redis(Arc::new(redis_client), config.rate_limit.clone());
    }

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
