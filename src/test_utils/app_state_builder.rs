//! Test app state builder for HTTP-level testing.
//!
//! `TestAppStateBuilder` creates an `AppState` backed by the in-memory store
//! and hands the store back so tests can inspect it.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use secrecy::SecretString;

use crate::{
    adapters::http::app_state::AppState,
    application::use_cases::subscription::{SubscriptionUseCases, SumStrategy},
    domain::entities::subscription::Subscription,
    infra::config::{AppConfig, LogFormat},
    test_utils::InMemorySubscriptionRepo,
};

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: SecretString::from("postgres://test@localhost/test".to_string()),
        db_max_connections: 1,
        bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        cors_origin: HeaderValue::from_static("http://localhost:3000"),
        log_level: "debug".into(),
        log_format: LogFormat::Pretty,
        auto_migrate: false,
        sum_strategy: SumStrategy::PushDown,
        sum_scan_limit: 1000,
        shutdown_grace: Duration::from_secs(1),
    }
}

#[derive(Default)]
pub struct TestAppStateBuilder {
    subscriptions: Vec<Subscription>,
    sum_strategy: SumStrategy,
    scan_limit: Option<i64>,
}

impl TestAppStateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subscription(mut self, subscription: Subscription) -> Self {
        self.subscriptions.push(subscription);
        self
    }

    pub fn with_subscriptions(mut self, subscriptions: Vec<Subscription>) -> Self {
        self.subscriptions.extend(subscriptions);
        self
    }

    pub fn with_sum_strategy(mut self, strategy: SumStrategy, scan_limit: i64) -> Self {
        self.sum_strategy = strategy;
        self.scan_limit = Some(scan_limit);
        self
    }

    pub fn build(self) -> (AppState, Arc<InMemorySubscriptionRepo>) {
        let repo = Arc::new(InMemorySubscriptionRepo::with_subscriptions(
            self.subscriptions,
        ));
        let mut config = test_config();
        config.sum_strategy = self.sum_strategy;
        if let Some(limit) = self.scan_limit {
            config.sum_scan_limit = limit;
        }

        let use_cases = SubscriptionUseCases::new(repo.clone())
            .with_sum_strategy(config.sum_strategy, config.sum_scan_limit);

        (
            AppState {
                config: Arc::new(config),
                subscription_use_cases: Arc::new(use_cases),
            },
            repo,
        )
    }
}
