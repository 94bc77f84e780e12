use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use super::{auth::AuthService, error::ApiError, utils};
use crate::ledger::{AccountType, LedgerService};

#[derive(Debug, Deserialize)]
pub struct OpenAccount {
    pub account_type: AccountType,
}

async fn open_account(
    headers: HeaderMap,
    State((service, ledger)): State<(Arc<AuthService>, Arc<LedgerService>)>,
    payload: Result<Json<OpenAccount>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = utils::validate_auth_token(&headers, &service)?;
    let Json(req) = payload?;
    let account = ledger.open_account(principal.user_id, req.account_type).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

async fn get_account(
    headers: HeaderMap,
    State((service, ledger)): State<(Arc<AuthService>, Arc<LedgerService>)>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = utils::validate_auth_token(&headers, &service)?;
    let account = ledger.account(principal.user_id).await?;
    Ok(Json(account))
}

pub fn account_routes(service: Arc<AuthService>, ledger: Arc<LedgerService>) -> Router {
    Router::new()
        .route("/accounts", post(open_account))
        .route("/accounts/me", get(get_account))
        .with_state((service, ledger))
}
