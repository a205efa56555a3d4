//! Logging service

use crate::models::{ChannelKind, DispatchResult, LogLevel};

/// Filter directive for the configured level, covering the library and the CLI
pub fn filter_directive(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "sendtext_core=error,sendtext=error",
        LogLevel::Warn => "sendtext_core=warn,sendtext=warn",
        LogLevel::Info => "sendtext_core=info,sendtext=info",
        LogLevel::Debug => "sendtext_core=debug,sendtext=debug",
        LogLevel::Trace => "sendtext_core=trace,sendtext=trace",
    }
}

/// Initialize logging with the specified level
pub fn init_logging(level: LogLevel) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(filter_directive(level))
        .with_writer(std::io::stderr)
        .try_init()
}

/// Log the outcome of one dispatch. Debug blocks are never logged.
pub fn log_dispatch(channel: ChannelKind, result: &DispatchResult) {
    if result.is_ok() {
        tracing::info!(
            channel = %channel,
            status_code = ?result.status_code,
            "Text delivered"
        );
    } else {
        tracing::warn!(
            channel = %channel,
            status_code = ?result.status_code,
            "Text delivery failed"
        );
    }
}

/// Log a system error
pub fn log_error(error: &str, context: Option<&str>) {
    tracing::error!(
        error = error,
        context = context.unwrap_or(""),
        "System error occurred"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Once;

    static INIT: Once = Once::new();

    fn init_test_logging() {
        INIT.call_once(|| {
            let _ = init_logging(LogLevel::Debug);
        });
    }

    #[test]
    fn test_filter_directive() {
        assert_eq!(filter_directive(LogLevel::Warn), "sendtext_core=warn,sendtext=warn");
    }

    #[test]
    fn test_second_initialization_is_an_error() {
        init_test_logging();
        assert!(init_logging(LogLevel::Info).is_err());
    }

    #[test]
    fn test_log_functions() {
        init_test_logging();

        // These should not panic
        log_dispatch(ChannelKind::Slack, &DispatchResult::ok(json!({"ok": true})));
        log_dispatch(ChannelKind::Email, &DispatchResult::error(json!("boom")));
        log_error("test error", Some("test context"));
    }
}
