use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use super::auth::AuthError;
use crate::ledger::LedgerError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("admin role required")]
    Forbidden,

    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Ledger(err) => match err {
                LedgerError::Validation(_) => StatusCode::BAD_REQUEST,
                LedgerError::InsufficientBalance { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
                LedgerError::AccountExists | LedgerError::IllegalTransition { .. } => StatusCode::CONFLICT,
                LedgerError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Ledger(err) => match err {
                LedgerError::Validation(_) => "validation_error",
                LedgerError::InsufficientBalance { .. } => "insufficient_balance",
                LedgerError::NotFound(_) => "not_found",
                LedgerError::AccountExists => "account_exists",
                LedgerError::IllegalTransition { .. } => "illegal_transition",
                LedgerError::Store(_) => "store_error",
            },
            ApiError::Auth(_) => "unauthorized",
            ApiError::Forbidden => "forbidden",
            ApiError::BadRequest(_) => "bad_request",
        }
    }
}

// Extractor rejections get the same JSON body as every other error.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        let body = match &self {
            ApiError::Ledger(LedgerError::Validation(violation)) => json!({
                "error": code,
                "message": violation.to_string(),
                "field": violation.field(),
            }),
            ApiError::Ledger(LedgerError::Store(err)) => {
                tracing::error!("storage failure: {err}");
                json!({ "error": code, "message": "internal error" })
            }
            _ => json!({ "error": code, "message": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::db::StoreError;
    use crate::ledger::{Entry, Operation, Violation};

    #[test]
    fn ledger_errors_map_to_statuses() {
        let cases = [
            (LedgerError::Validation(Violation::PendingLoan), StatusCode::BAD_REQUEST),
            (
                LedgerError::InsufficientBalance {
                    operation: Operation::Withdrawal,
                    balance: Decimal::ZERO,
                    required: Decimal::from(500),
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                LedgerError::Validation(Violation::BalanceLimit {
                    maximum: Decimal::from(10),
                }),
                StatusCode::BAD_REQUEST,
            ),
            (LedgerError::NotFound("loan"), StatusCode::NOT_FOUND),
            (LedgerError::AccountExists, StatusCode::CONFLICT),
            (
                LedgerError::IllegalTransition {
                    action: "approve",
                    state: Entry::LoanPaid,
                },
                StatusCode::CONFLICT,
            ),
            (
                LedgerError::Store(StoreError::Corrupt("bad".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code(), status);
        }
    }

    #[test]
    fn auth_failures_are_unauthorized_or_forbidden() {
        assert_eq!(ApiError::Auth(AuthError::MissingToken).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden.status_code(), StatusCode::FORBIDDEN);
    }
}
