use std::str::FromStr;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::ledger::Limits;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Process settings, read from the environment (a `.env` file is honoured).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub max_connection_pooling: u32,
    pub port: u16,
    pub log_file: String,
    pub limits: Limits,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| dotenv::var(name).ok())
    }

    /// Builds the config from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // mandatory fields
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        // optional fields
        let jwt_secret = lookup("JWT_SECRET").unwrap_or_else(|| "your-jwt-secret".to_string());
        let max_connection_pooling = parse_or(&lookup, "MAX_CONNECTION_POOLING", 5)?;
        let port = parse_or(&lookup, "PORT", 3000)?;
        let log_file = lookup("LOG_FILE").unwrap_or_else(|| "app.log".to_string());

        let defaults = Limits::default();
        let limits = Limits {
            min_deposit: parse_or(&lookup, "MIN_DEPOSIT", defaults.min_deposit)?,
            min_withdrawal: parse_or(&lookup, "MIN_WITHDRAWAL", defaults.min_withdrawal)?,
            max_withdrawal: parse_or(&lookup, "MAX_WITHDRAWAL", defaults.max_withdrawal)?,
            min_loan: parse_or(&lookup, "MIN_LOAN", defaults.min_loan)?,
            max_loan: parse_or(&lookup, "MAX_LOAN", defaults.max_loan)?,
            monthly_loan_limit: parse_or(&lookup, "MONTHLY_LOAN_LIMIT", defaults.monthly_loan_limit)?,
            recent_history: parse_or(&lookup, "RECENT_HISTORY", defaults.recent_history)?,
        };
        check_limits(&limits)?;

        Ok(Config {
            database_url,
            jwt_secret,
            max_connection_pooling,
            port,
            log_file,
            limits,
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

fn check_limits(limits: &Limits) -> Result<(), ConfigError> {
    let invalid = |name: &'static str, value: Decimal| ConfigError::Invalid {
        name,
        value: value.to_string(),
    };
    if limits.min_deposit <= Decimal::ZERO {
        return Err(invalid("MIN_DEPOSIT", limits.min_deposit));
    }
    if limits.min_withdrawal <= Decimal::ZERO || limits.min_withdrawal > limits.max_withdrawal {
        return Err(invalid("MIN_WITHDRAWAL", limits.min_withdrawal));
    }
    if limits.min_loan <= Decimal::ZERO || limits.min_loan > limits.max_loan {
        return Err(invalid("MIN_LOAN", limits.min_loan));
    }
    if limits.recent_history <= 0 {
        return Err(ConfigError::Invalid {
            name: "RECENT_HISTORY",
            value: limits.recent_history.to_string(),
        });
    }
    Ok(())
}
