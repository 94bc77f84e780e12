mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use bank_ledger::routes::{
    self,
    auth::{AuthService, Role},
};

use common::Fixture;

const SECRET: &str = "test-secret";

struct Api {
    router: Router,
    auth: Arc<AuthService>,
}

impl Api {
    fn new() -> Self {
        let fx = Fixture::new();
        let auth = Arc::new(AuthService::new(SECRET.to_string()));
        Api {
            router: routes::router(auth.clone(), fx.ledger),
            auth,
        }
    }

    fn token(&self, user: Uuid, role: Role) -> String {
        self.auth.issue_token(user, role, Duration::from_secs(300)).unwrap()
    }

    async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let req = match body {
            Some(body) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };

        let res = self.router.clone().oneshot(req).await.expect("response");
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }
}

#[tokio::test]
async fn requests_without_a_valid_token_are_unauthorized() {
    let api = Api::new();

    let (status, body) = api.call(Method::GET, "/v1/accounts/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (status, _) = api.call(Method::GET, "/v1/accounts/me", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn customer_flow_over_http() {
    let api = Api::new();
    let token = api.token(Uuid::new_v4(), Role::Customer);

    let (status, account) = api
        .call(Method::POST, "/v1/accounts", Some(&token), Some(json!({ "account_type": "savings" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(account["account_type"], "savings");

    let (status, _) = api
        .call(Method::POST, "/v1/accounts", Some(&token), Some(json!({ "account_type": "current" })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = api
        .call(Method::POST, "/v1/tx/deposit", Some(&token), Some(json!({ "amount": "1500" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = api
        .call(Method::POST, "/v1/tx/deposit", Some(&token), Some(json!({ "amount": "50" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["field"], "amount");
    assert_eq!(body["message"], "You need to deposit at least 100 $");

    let (status, body) = api
        .call(Method::POST, "/v1/tx/withdraw", Some(&token), Some(json!({ "amount": "5000" })))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "insufficient_balance");

    let (status, loan) = api
        .call(Method::POST, "/v1/loans", Some(&token), Some(json!({ "amount": "2000" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(loan["entry"], "loan_requested");

    let (status, loans) = api.call(Method::GET, "/v1/loans", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(loans.as_array().map(Vec::len), Some(1));

    let (status, report) = api.call(Method::GET, "/v1/tx/report", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["transactions"].as_array().map(Vec::len), Some(2));
    assert_eq!(report["balance"], "1500");
}

#[tokio::test]
async fn admin_routes_require_the_admin_role() {
    let api = Api::new();
    let customer = api.token(Uuid::new_v4(), Role::Customer);

    let (status, body) = api.call(Method::GET, "/v1/admin/loans", Some(&customer), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");
}

#[tokio::test]
async fn admin_approves_and_audits_a_loan() {
    let api = Api::new();
    let customer = api.token(Uuid::new_v4(), Role::Customer);
    let admin = api.token(Uuid::new_v4(), Role::Admin);

    let (_, account) = api
        .call(Method::POST, "/v1/accounts", Some(&customer), Some(json!({ "account_type": "current" })))
        .await;
    let account_no = account["account_no"].as_i64().unwrap();
    let (_, loan) = api
        .call(Method::POST, "/v1/loans", Some(&customer), Some(json!({ "amount": "2500" })))
        .await;
    let loan_id = loan["id"].as_i64().unwrap();

    let (status, pending) = api.call(Method::GET, "/v1/admin/loans", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pending[0]["id"], loan_id);

    let uri = format!("/v1/admin/loans/{loan_id}/approve");
    let (status, approval) = api.call(Method::POST, &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approval["outcome"], "applied");
    assert_eq!(approval["transaction"]["entry"], "loan_approved");

    let (_, approval) = api.call(Method::POST, &uri, Some(&admin), None).await;
    assert_eq!(approval["outcome"], "unchanged");

    let (_, me) = api.call(Method::GET, "/v1/accounts/me", Some(&customer), None).await;
    assert_eq!(me["balance"], "2500");

    let uri = format!("/v1/loans/{loan_id}/pay");
    let (status, paid) = api.call(Method::POST, &uri, Some(&customer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["entry"], "loan_paid");

    let uri = format!("/v1/admin/loans/{loan_id}/approval");
    let (status, body) = api
        .call(Method::PUT, &uri, Some(&admin), Some(json!({ "loan_approve": false })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "illegal_transition");

    let (status, others) = api.call(Method::GET, "/v1/admin/transactions", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(others.as_array().map(Vec::len), Some(1));

    let uri = format!("/v1/admin/accounts/{account_no}/audit");
    let (status, report) = api.call(Method::GET, &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["consistent"], true);

    let (status, _) = api
        .call(Method::GET, "/v1/admin/accounts/1/audit", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_input_gets_a_json_bad_request() {
    let api = Api::new();
    let token = api.token(Uuid::new_v4(), Role::Customer);

    let req = Request::builder()
        .method(Method::POST)
        .uri("/v1/tx/deposit")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"amount\": "))
        .unwrap();
    let res = api.router.clone().oneshot(req).await.expect("response");
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "bad_request");

    let (status, body) = api
        .call(Method::POST, "/v1/tx/deposit", Some(&token), Some(json!({ "sum": "500" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");

    let (status, body) = api
        .call(Method::GET, "/v1/tx/report?start_date=nope&end_date=2025-01-01", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");

    let admin = api.token(Uuid::new_v4(), Role::Admin);
    let (status, body) = api
        .call(Method::POST, "/v1/admin/loans/abc/approve", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}
