use {
    shiftpay::{
        AppState,
        adapters::{http, notify::LogNotifier},
        domain::notify::StatusNotifier,
        infra::postgres::PgStore,
        services::sweeper::{self, SweepConfig},
    },
    sqlx::postgres::PgPoolOptions,
    std::{env, time::Duration},
    tokio::{signal, sync::watch},
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    dotenvy::dotenv().ok();
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let webhook_secret = env::var("WEBHOOK_SECRET").expect("WEBHOOK_SECRET must be set");
    let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .acquire_timeout(Duration::from_secs(3))
        .connect(&database_url)
        .await
        .expect("failed to connect to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("failed to run migrations");

    let store = PgStore::new(pool);
    let notifier: std::sync::Arc<dyn StatusNotifier> = std::sync::Arc::new(LogNotifier);
    let state = AppState {
        store: store.clone(),
        notifier: notifier.clone(),
        webhook_secret: webhook_secret.into(),
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    // Gateway polling stays off until a rail adapter is wired in; the sweep
    // still re-opens retryable ledger entries.
    let sweeper_handle = tokio::spawn(sweeper::run_sweeper(
        store,
        None,
        notifier,
        SweepConfig::default(),
        shutdown_rx,
    ));

    let app = http::router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await.unwrap();
    tracing::info!("listening on {bind_addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    shutdown_tx.send(true).ok();
    sweeper_handle.await.ok();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to listen for ctrl+c");
    };

    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to listen for SIGTERM")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => tracing::info!("received ctrl+c, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
