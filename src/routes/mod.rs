use std::sync::Arc;

use axum::Router;
use tower_http::{compression::CompressionLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::ledger::LedgerService;

pub mod accounts;
pub mod admin;
pub mod auth;
pub mod error;
pub mod loans;
pub mod tx;
pub mod utils;

use auth::AuthService;

/// Every route, mounted under `/v1`.
pub fn router(service: Arc<AuthService>, ledger: Arc<LedgerService>) -> Router {
    let account_routes = accounts::account_routes(service.clone(), ledger.clone());
    let transfer_routes = tx::tx_route(service.clone(), ledger.clone())
        .route_layer(CompressionLayer::new().gzip(true));
    let loan_routes = loans::loan_routes(service.clone(), ledger.clone());
    let admin_routes = admin::admin_routes(service, ledger);

    Router::new()
        .nest("/v1", account_routes)
        .nest("/v1", transfer_routes)
        .nest("/v1", loan_routes)
        .nest("/v1", admin_routes)
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(1024 * 10)) // 10KB limit
}
