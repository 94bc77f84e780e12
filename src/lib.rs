//! A small retail bank: customer accounts, deposits and withdrawals, and a
//! loan workflow with admin approval, exposed over an axum HTTP API.

pub mod config;
pub mod db;
pub mod ledger;
pub mod notify;
pub mod routes;
pub mod telemetry;

pub use config::Config;
pub use routes::router;
