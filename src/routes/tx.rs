use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

use super::{auth::AuthService, error::ApiError, utils};
use crate::ledger::{DateRange, LedgerService};

#[derive(Debug, Deserialize)]
pub struct AmountRequest {
    pub amount: Decimal,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl ReportQuery {
    /// A range needs both ends; anything less lists recent records.
    pub fn range(&self) -> Option<DateRange> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => Some(DateRange::new(start, end)),
            _ => None,
        }
    }
}

async fn deposit(
    headers: HeaderMap,
    State((service, ledger)): State<(Arc<AuthService>, Arc<LedgerService>)>,
    payload: Result<Json<AmountRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = utils::validate_auth_token(&headers, &service)?;
    let Json(req) = payload?;
    let record = ledger.deposit(principal.user_id, req.amount).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn withdraw(
    headers: HeaderMap,
    State((service, ledger)): State<(Arc<AuthService>, Arc<LedgerService>)>,
    payload: Result<Json<AmountRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = utils::validate_auth_token(&headers, &service)?;
    let Json(req) = payload?;
    let record = ledger.withdraw(principal.user_id, req.amount).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn report(
    headers: HeaderMap,
    State((service, ledger)): State<(Arc<AuthService>, Arc<LedgerService>)>,
    query: Result<Query<ReportQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = utils::validate_auth_token(&headers, &service)?;
    let Query(query) = query?;
    let statement = ledger.statement(principal.user_id, query.range()).await?;
    Ok(Json(statement))
}

pub fn tx_route(service: Arc<AuthService>, ledger: Arc<LedgerService>) -> Router {
    Router::new()
        .route("/tx/deposit", post(deposit))
        .route("/tx/withdraw", post(withdraw))
        .route("/tx/report", get(report))
        .with_state((service, ledger))
}
