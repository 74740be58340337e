//! Logging setup.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "info,api_server=debug,quill_infra=debug";

/// Telemetry configuration.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// One JSON object per event instead of the pretty console format.
    pub json_logs: bool,
    /// Emit every SQL statement (`sqlx` at info level).
    pub sql_logs: bool,
    pub service_name: String,
}

impl TelemetryConfig {
    /// Read `LOG_FORMAT`, `LOG_SQL` and `SERVICE_NAME`.
    pub fn from_env() -> Self {
        Self {
            json_logs: std::env::var("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
            sql_logs: std::env::var("LOG_SQL")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            service_name: std::env::var("SERVICE_NAME")
                .unwrap_or_else(|_| "quill-api".to_string()),
        }
    }

    /// Filter used when `RUST_LOG` is not set.
    fn default_filter(&self) -> String {
        let sql = if self.sql_logs { "info" } else { "warn" };
        format!("{DEFAULT_FILTER},sqlx={sql},sea_orm={sql}")
    }
}

/// Install the global tracing subscriber.
pub fn init_telemetry(config: &TelemetryConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_filter()));

    if config.json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .flatten_event(true),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }

    tracing::info!(
        service = %config.service_name,
        json_logs = config.json_logs,
        sql_logs = config.sql_logs,
        "Telemetry initialized"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_logs_raise_sqlx_level() {
        let mut config = TelemetryConfig {
            json_logs: false,
            sql_logs: false,
            service_name: "quill-api".to_string(),
        };
        assert!(config.default_filter().ends_with("sqlx=warn,sea_orm=warn"));

        config.sql_logs = true;
        assert!(config.default_filter().contains("sqlx=info"));
    }
}
