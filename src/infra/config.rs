use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use axum::http::HeaderValue;
use env_helpers::get_env_default;
use secrecy::{ExposeSecret, SecretString};

use crate::{application::use_cases::subscription::SumStrategy, infra::error::InfraError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" | "text" | "console" => Ok(LogFormat::Pretty),
            _ => Err(format!("Invalid log format: {s}")),
        }
    }
}

/// Connection pieces used when `DATABASE_URL` is not set.
pub struct DbParts {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: SecretString,
    pub name: String,
    pub sslmode: String,
}

impl DbParts {
    fn from_env() -> Self {
        Self {
            host: get_env_default("DB_HOST", "localhost".to_string()),
            port: get_env_default("DB_PORT", 5432),
            user: get_env_default("DB_USER", "postgres".to_string()),
            password: SecretString::from(get_env_default("DB_PASSWORD", "postgres".to_string())),
            name: get_env_default("DB_NAME", "subscriptions".to_string()),
            sslmode: get_env_default("DB_SSLMODE", "disable".to_string()),
        }
    }

    pub fn to_url(&self) -> SecretString {
        SecretString::from(format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            self.user,
            self.password.expose_secret(),
            self.host,
            self.port,
            self.name,
            self.sslmode
        ))
    }
}

pub struct AppConfig {
    pub database_url: SecretString,
    pub db_max_connections: u32,
    pub bind_addr: SocketAddr,
    pub cors_origin: HeaderValue,
    /// Default directive for the log filter when `RUST_LOG` is unset.
    pub log_level: String,
    pub log_format: LogFormat,
    /// Run the embedded migrations before serving.
    pub auto_migrate: bool,
    pub sum_strategy: SumStrategy,
    /// Page size of the in-process sum scan.
    pub sum_scan_limit: i64,
    pub shutdown_grace: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, InfraError> {
        let database_url = match std::env::var("DATABASE_URL") {
            Ok(url) if !url.trim().is_empty() => SecretString::from(url),
            _ => DbParts::from_env().to_url(),
        };

        let db_max_connections: u32 = get_env_default("DB_MAX_CONNECTIONS", 10);
        let bind_addr = resolve_bind_addr(
            std::env::var("BIND_ADDR").ok(),
            std::env::var("APP_PORT").ok(),
        )?;
        let cors_origin: HeaderValue =
            get_env_default("CORS_ORIGIN", String::from("http://localhost:3000"))
                .parse()
                .map_err(|_| InfraError::ConfigInvalid {
                    var: "CORS_ORIGIN",
                    reason: "not a valid header value".into(),
                })?;

        let log_level: String = get_env_default("LOG_LEVEL", "info".to_string());
        let log_format: LogFormat = get_env_default("LOG_FORMAT", "json".to_string())
            .parse()
            .map_err(|reason| InfraError::ConfigInvalid {
                var: "LOG_FORMAT",
                reason,
            })?;

        let auto_migrate: bool = get_env_default("AUTO_MIGRATE", false);
        let sum_strategy: SumStrategy = get_env_default("SUM_STRATEGY", "pushdown".to_string())
            .parse()
            .map_err(|reason| InfraError::ConfigInvalid {
                var: "SUM_STRATEGY",
                reason,
            })?;
        let sum_scan_limit: i64 = get_env_default("SUM_SCAN_LIMIT", 1000);
        let shutdown_grace_secs: u64 = get_env_default("SHUTDOWN_GRACE_SECS", 15);

        Ok(Self {
            database_url,
            db_max_connections,
            bind_addr,
            cors_origin,
            log_level,
            log_format,
            auto_migrate,
            sum_strategy,
            sum_scan_limit,
            shutdown_grace: Duration::from_secs(shutdown_grace_secs),
        })
    }
}

/// `BIND_ADDR` wins; otherwise `APP_PORT` on all interfaces; otherwise `0.0.0.0:8080`.
fn resolve_bind_addr(
    bind_addr: Option<String>,
    app_port: Option<String>,
) -> Result<SocketAddr, InfraError> {
    let present = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

    if let Some(raw) = present(bind_addr) {
        return raw.trim().parse().map_err(|_| InfraError::ConfigInvalid {
            var: "BIND_ADDR",
            reason: format!("expected host:port, got {raw:?}"),
        });
    }
    let port = match present(app_port) {
        Some(raw) => raw.trim().parse::<u16>().map_err(|_| InfraError::ConfigInvalid {
            var: "APP_PORT",
            reason: format!("expected a port number, got {raw:?}"),
        })?,
        None => 8080,
    };
    Ok(SocketAddr::from(([0, 0, 0, 0], port)))
}
