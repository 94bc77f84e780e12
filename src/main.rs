use std::process;
use std::sync::Arc;

use sqlx::{postgres::PgPoolOptions, PgPool};
use tokio::net::TcpListener;

use bank_ledger::{
    db::PgStore,
    ledger::LedgerService,
    notify::LogNotifier,
    routes::{self, auth::AuthService},
    telemetry, Config,
};

#[tokio::main]
async fn main() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Invalid configuration: {err}");
            process::exit(1);
        }
    };

    let _guards = match telemetry::init(&config.log_file) {
        Ok(guards) => guards,
        Err(err) => {
            eprintln!("Unable to set global subscriber: {err}");
            process::exit(1);
        }
    };

    let database_pool = match process_database(&config.database_url, config.max_connection_pooling).await {
        Ok(db) => {
            tracing::info!("Connected to database");
            db
        }
        Err(err) => {
            tracing::error!("Failed to connect to database: {}", err);
            process::exit(1);
        }
    };

    let listener = match TcpListener::bind(("0.0.0.0", config.port)).await {
        Ok(listener) => {
            tracing::info!("Listening on port: {}", config.port);
            listener
        }
        Err(err) => {
            tracing::error!("Failed to bind to port: {}", err);
            process::exit(1);
        }
    };

    let store = Arc::new(PgStore::new(database_pool));
    let ledger = Arc::new(LedgerService::new(store, Arc::new(LogNotifier), config.limits.clone()));
    let service = Arc::new(AuthService::new(config.jwt_secret.clone()));
    let router = routes::router(service, ledger);
    tracing::info!("Routes constructed successfully");

    //start the http service
    let http_service = axum::serve(listener, router);
    if let Err(err) = http_service.await {
        tracing::error!("Failed to start server: {}", err);
        process::exit(1);
    }
}

async fn process_database(url: &str, max_conn_pool: u32) -> Result<PgPool, String> {
    let db_pool = PgPoolOptions::new()
        .max_connections(max_conn_pool)
        .connect(url)
        .await
        .map_err(|err| format!("Failed to connect to database: {}", err))?;

    match sqlx::migrate!("./migrations").run(&db_pool).await {
        Ok(_) => {
            tracing::info!("Migrations run successfully");
        }
        Err(err) => {
            // assume the schema is already in place
            tracing::warn!("Failed to run migrations: {err}");
        }
    }

    Ok(db_pool)
}
