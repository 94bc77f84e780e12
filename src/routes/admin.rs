use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;

use super::{auth::AuthService, error::ApiError, utils};
use crate::ledger::LedgerService;

#[derive(Debug, Deserialize)]
pub struct CreateLoan {
    pub account_no: i64,
    pub amount: Decimal,
    #[serde(default)]
    pub loan_approve: bool,
}

#[derive(Debug, Deserialize)]
pub struct SetApproval {
    pub loan_approve: bool,
}

async fn list_loans(
    headers: HeaderMap,
    State((service, ledger)): State<(Arc<AuthService>, Arc<LedgerService>)>,
) -> Result<impl IntoResponse, ApiError> {
    utils::require_admin(&headers, &service)?;
    Ok(Json(ledger.all_transactions(true).await?))
}

async fn list_transactions(
    headers: HeaderMap,
    State((service, ledger)): State<(Arc<AuthService>, Arc<LedgerService>)>,
) -> Result<impl IntoResponse, ApiError> {
    utils::require_admin(&headers, &service)?;
    Ok(Json(ledger.all_transactions(false).await?))
}

async fn create_loan(
    headers: HeaderMap,
    State((service, ledger)): State<(Arc<AuthService>, Arc<LedgerService>)>,
    payload: Result<Json<CreateLoan>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let admin = utils::require_admin(&headers, &service)?;
    let Json(req) = payload?;
    tracing::info!("Admin {} creating loan for account {}", admin.user_id, req.account_no);
    let record = ledger
        .create_loan(req.account_no, req.amount, req.loan_approve)
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn approve_loan(
    headers: HeaderMap,
    State((service, ledger)): State<(Arc<AuthService>, Arc<LedgerService>)>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    utils::require_admin(&headers, &service)?;
    let Path(transaction_id) = path?;
    Ok(Json(ledger.approve_loan(transaction_id).await?))
}

async fn revert_loan(
    headers: HeaderMap,
    State((service, ledger)): State<(Arc<AuthService>, Arc<LedgerService>)>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    utils::require_admin(&headers, &service)?;
    let Path(transaction_id) = path?;
    Ok(Json(ledger.revert_loan_approval(transaction_id).await?))
}

async fn set_approval(
    headers: HeaderMap,
    State((service, ledger)): State<(Arc<AuthService>, Arc<LedgerService>)>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<SetApproval>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    utils::require_admin(&headers, &service)?;
    let Path(transaction_id) = path?;
    let Json(req) = payload?;
    let approval = ledger
        .set_loan_approval(transaction_id, req.loan_approve)
        .await?;
    Ok(Json(approval))
}

async fn audit_account(
    headers: HeaderMap,
    State((service, ledger)): State<(Arc<AuthService>, Arc<LedgerService>)>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    utils::require_admin(&headers, &service)?;
    let Path(account_no) = path?;
    Ok(Json(ledger.audit_account(account_no).await?))
}

pub fn admin_routes(service: Arc<AuthService>, ledger: Arc<LedgerService>) -> Router {
    Router::new()
        .route("/admin/loans", get(list_loans).post(create_loan))
        .route("/admin/transactions", get(list_transactions))
        .route("/admin/loans/:id/approve", post(approve_loan))
        .route("/admin/loans/:id/revert", post(revert_loan))
        .route("/admin/loans/:id/approval", put(set_approval))
        .route("/admin/accounts/:account_no/audit", get(audit_account))
        .with_state((service, ledger))
}
