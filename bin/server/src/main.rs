use nowplaying_identity::SessionCodec;
use nowplaying_server::{
    auth::{AppState, PgUserDirectory},
    cache::RedisSessionCache,
    config::ServerConfig,
    routes,
};
use nowplaying_upstream::{HttpActivityClient, OAuthTokenRefresher};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = ServerConfig::from_env().expect("failed to load configuration");
    tracing::info!("Loaded configuration");

    if config.session.signing_secret.is_none() {
        tracing::warn!("SESSION__SIGNING_SECRET is not set; session tokens cannot be issued");
    }

    // Create database connection pool
    let store_timeout = config.store.timeout();
    let db_pool = PgPoolOptions::new()
        .max_connections(config.store.max_connections)
        .acquire_timeout(store_timeout)
        .connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    // Run migrations
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("failed to run migrations");

    let cache = RedisSessionCache::connect(&config.redis_url, store_timeout)
        .await
        .expect("failed to connect to Redis");

    let refresher = OAuthTokenRefresher::new(
        config.spotify.client_id.clone(),
        config.spotify.client_secret.clone(),
        &config.spotify.token_url,
        config.spotify.request_timeout(),
    )
    .expect("invalid Spotify token endpoint");
    let client = HttpActivityClient::new(
        &config.spotify.currently_playing_url,
        config.spotify.request_timeout(),
    )
    .expect("invalid Spotify currently-playing endpoint");

    let codec = SessionCodec::new(
        config.session.signing_secret.clone(),
        config.session.issuer.clone(),
        config.session.validity(),
    );

    // Create application state
    let app_state = Arc::new(AppState::new(
        codec,
        Arc::new(PgUserDirectory::new(db_pool, store_timeout)),
        Arc::new(cache),
        Arc::new(refresher),
        Arc::new(client),
    ));

    let app = routes::router(app_state)
        .layer(routes::cors_layer(&config.cors))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .expect("failed to bind to address");

    tracing::info!("listening on http://{}", config.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
