use std::net::TcpListener;
use std::sync::Arc;

use chirpy_auth::auth::AuthService;
use chirpy_auth::configuration::get_configuration;
use chirpy_auth::routes::Shutdown;
use chirpy_auth::startup::run;
use chirpy_auth::store::{PgRefreshTokenStore, PgUserLookup};
use chirpy_auth::telemetry::init_telemetry;
use sqlx::postgres::PgPoolOptions;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry();

    tracing::info!("Starting application");

    let configuration = match get_configuration() {
        Ok(config) => {
            tracing::info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    tracing::info!("Attempting to connect to database");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&configuration.database.connection_string())
        .await
        .map_err(|e| {
            tracing::error!("Failed to create connection pool: {}", e);
            std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "Database connection error",
            )
        })?;
    tracing::info!("Database connection pool created successfully");

    let auth = AuthService::from_settings(
        Arc::new(PgUserLookup::new(pool.clone())),
        Arc::new(PgRefreshTokenStore::new(pool)),
        &configuration.auth,
    )
    .map_err(|e| {
        tracing::error!("Failed to initialise authentication: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, "Authentication setup error")
    })?;

    let address = configuration.application.address();
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    let shutdown = Shutdown::default();
    let server = run(listener, auth, shutdown.clone())?;
    let handle = server.handle();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            // Abort in-flight store calls, then drain the server
            shutdown.0.cancel();
            handle.stop(true).await;
        }
    });

    server.await
}
