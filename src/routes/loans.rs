use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};

use super::{auth::AuthService, error::ApiError, tx::AmountRequest, utils};
use crate::ledger::LedgerService;

async fn request_loan(
    headers: HeaderMap,
    State((service, ledger)): State<(Arc<AuthService>, Arc<LedgerService>)>,
    payload: Result<Json<AmountRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = utils::validate_auth_token(&headers, &service)?;
    let Json(req) = payload?;
    let record = ledger.request_loan(principal.user_id, req.amount).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn list_loans(
    headers: HeaderMap,
    State((service, ledger)): State<(Arc<AuthService>, Arc<LedgerService>)>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = utils::validate_auth_token(&headers, &service)?;
    let loans = ledger.loans(principal.user_id).await?;
    Ok(Json(loans))
}

async fn pay_loan(
    headers: HeaderMap,
    State((service, ledger)): State<(Arc<AuthService>, Arc<LedgerService>)>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = utils::validate_auth_token(&headers, &service)?;
    let Path(transaction_id) = path?;
    let record = ledger.repay_loan(principal.user_id, transaction_id).await?;
    Ok(Json(record))
}

pub fn loan_routes(service: Arc<AuthService>, ledger: Arc<LedgerService>) -> Router {
    Router::new()
        .route("/loans", post(request_loan).get(list_loans))
        .route("/loans/:id/pay", post(pay_loan))
        .with_state((service, ledger))
}
