use std::io;
use tracing_appender::rolling;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::environment::get_env_string_or;

const STDOUT_FILTER: &str = "info,llm_request=info,web_request=info,db_query=warn,sqlx=off";
const FILE_FILTER: &str = "llm_request=debug,info,sqlx=warn";
const LOG_FILE_NAME: &str = "pubtrends.log";

/// Installs the stdout and daily-rolling file layers.
///
/// `RUST_LOG` replaces the stdout filter; `LOG_DIR` moves the log files
/// (default `logs/`). Call once, from a binary's `main`.
pub fn configure_logging() {
    let stdout_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(STDOUT_FILTER));

    // Stdout log configuration
    let stdout_log = fmt::layer()
        .with_writer(io::stdout)
        .with_filter(stdout_filter);

    // File log configuration
    let log_dir = get_env_string_or("LOG_DIR", "logs");
    let file_appender = rolling::daily(log_dir, LOG_FILE_NAME);
    let file_log = fmt::layer()
        .with_ansi(false)
        .with_writer(file_appender)
        .with_filter(EnvFilter::new(FILE_FILTER));

    tracing_subscriber::Registry::default()
        .with(stdout_log)
        .with(file_log)
        .init();
}
