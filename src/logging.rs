//! # Structured Logging
//!
//! Environment-aware structured logging for debugging asynchronous phase
//! execution.

use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging once per process.
///
/// The filter comes from `FLOWGATE_LOG` when set, otherwise from the
/// detected environment. Safe to call repeatedly and from tests; an already
/// installed global subscriber is left in place.
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let filter = std::env::var("FLOWGATE_LOG")
            .unwrap_or_else(|_| default_log_level(&environment).to_string());

        let subscriber = tracing_subscriber::registry().with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_filter(EnvFilter::new(filter)),
        );

        if subscriber.try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized");
        }

        tracing::info!(environment = %environment, "Structured logging initialized");
    });
}

fn get_environment() -> String {
    std::env::var("FLOWGATE_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

fn default_log_level(environment: &str) -> &'static str {
    match environment {
        "production" => "info",
        _ => "debug",
    }
}
