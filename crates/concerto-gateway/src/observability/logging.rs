//! Structured logging initialization.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable pretty format (for development).
    Pretty,
    /// JSON format (for log aggregation).
    Json,
}

impl LogFormat {
    /// Parse log format from string. Anything but `json` is pretty.
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
        }
    }
}

/// Builds the default filter directive for a level.
///
/// `RUST_LOG` takes precedence when set.
pub(crate) fn default_directive(level: &str) -> String {
    format!(
        "concerto_gateway={level},concerto_git={level},concerto_auth={level},tower_http=debug,axum::rejection=trace"
    )
}

/// Initialize the logging system.
///
/// # Arguments
///
/// * `level` - Log level (trace, debug, info, warn, error)
/// * `format` - Output format
///
/// # Example
///
/// ```rust,no_run
/// use concerto_gateway::observability::{init_logging, LogFormat};
///
/// init_logging("info", LogFormat::Json);
/// ```
pub fn init_logging(level: &str, format: LogFormat) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_directive(level).into());

    let registry = tracing_subscriber::registry().with(env_filter);

    match format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_file(true)
                    .with_line_number(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_thread_names(false),
            )
            .init(),
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).init(),
    }

    tracing::info!(level = %level, format = format.as_str(), "Logging initialized");
}
