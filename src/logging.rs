//! Logging initialization (§9.1), keyed off the descriptor's `config:`
//! block: `environment: development` gets pretty, debug-level output on
//! stderr; anything else gets structured JSON at info level. An optional
//! `turbo_log_path` additionally tees output to a daily-rolling file via
//! `tracing-appender`, mirroring the reference framework's `logging`
//! module.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

use crate::config::ServiceConfig;

/// Must be kept alive for the process lifetime: dropping it stops the
/// non-blocking file writer from flushing.
#[must_use]
pub struct LoggingGuard(#[allow(dead_code)] Option<WorkerGuard>);

/// Initialize the global `tracing` subscriber from the descriptor's
/// service config. Call once, at startup, before the Server Shell runs.
pub fn init(config: &ServiceConfig) -> LoggingGuard {
    let is_dev = config.environment == "development";
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(if is_dev { "debug" } else { "info" }));

    let file_guard = if config.turbo_log_path.is_empty() {
        None
    } else {
        let (directory, prefix) = split_log_path(&config.turbo_log_path);
        let file_appender = tracing_appender::rolling::daily(directory, prefix);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .with_writer(non_blocking)
            .json();
        if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
            eprintln!("logging already initialized: {err}");
        }
        return LoggingGuard(Some(guard));
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_span_events(FmtSpan::CLOSE);
    let result = if is_dev { builder.pretty().try_init() } else { builder.json().try_init() };
    if let Err(err) = result {
        eprintln!("logging already initialized: {err}");
    }
    LoggingGuard(file_guard)
}

/// `tracing_appender::rolling` wants a directory and a file-name prefix
/// separately; the descriptor only gives us one path string.
fn split_log_path(path: &str) -> (String, String) {
    match path.rsplit_once('/') {
        Some((dir, file)) if !dir.is_empty() => (dir.to_string(), file.to_string()),
        Some((_, file)) => (".".to_string(), file.to_string()),
        None => (".".to_string(), path.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_directory_from_prefix() {
        assert_eq!(split_log_path("/var/log/turbogate.log"), ("/var/log".to_string(), "turbogate.log".to_string()));
        assert_eq!(split_log_path("turbogate.log"), (".".to_string(), "turbogate.log".to_string()));
        assert_eq!(split_log_path("/turbogate.log"), (".".to_string(), "turbogate.log".to_string()));
    }
}
