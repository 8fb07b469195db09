use std::sync::Arc;

use sqlx::PgPool;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    adapters::{http::app_state::AppState, persistence::PostgresPersistence},
    application::use_cases::subscription::{SubscriptionRepoTrait, SubscriptionUseCases},
    infra::{
        config::{AppConfig, LogFormat},
        db::{init_db, run_migrations},
    },
};

/// Builds the application state and returns the pool so the caller can close it
/// once the server has drained.
pub async fn init_app_state(config: AppConfig) -> anyhow::Result<(AppState, PgPool)> {
    let pool = init_db(&config.database_url, config.db_max_connections).await?;
    if config.auto_migrate {
        run_migrations(&pool).await?;
    }

    let postgres_arc = Arc::new(PostgresPersistence::new(pool.clone()));
    let subscription_repo_arc = postgres_arc as Arc<dyn SubscriptionRepoTrait>;

    let subscription_use_cases = SubscriptionUseCases::new(subscription_repo_arc)
        .with_sum_strategy(config.sum_strategy, config.sum_scan_limit);

    Ok((
        AppState {
            config: Arc::new(config),
            subscription_use_cases: Arc::new(subscription_use_cases),
        },
        pool,
    ))
}

pub fn init_tracing(log_level: &str, log_format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{log_level},tower_http=info,sqlx=warn")));

    let registry = tracing_subscriber::registry().with(filter);

    match log_format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .try_init()
            .ok(),
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .pretty(),
            )
            .try_init()
            .ok(),
    };
}
