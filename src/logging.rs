use std::io;
use tracing::Level;
use tracing_appender::rolling;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::FmtSubscriber;

const STDOUT_FILTER: &str = "info,llm_request=info,web_request=info,normalize=warn";
const FILE_FILTER: &str = "info,llm_request=debug,normalize=debug";

/// Logging for the relay: stdout (overridable with `RUST_LOG`) plus a daily
/// rolling file under `logs/` that keeps the raw prompts and completions.
pub fn configure_logging() {
    let stdout_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(STDOUT_FILTER));

    let stdout_log = fmt::layer()
        .with_writer(io::stdout)
        .with_filter(stdout_filter);

    let file_appender = rolling::daily("logs", "jobcard.log");
    let file_log = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_filter(EnvFilter::new(FILE_FILTER));

    tracing_subscriber::Registry::default()
        .with(stdout_log)
        .with(file_log)
        .init();
}

/// Logging for the command-line tools. Goes to stderr so stdout stays clean
/// for the job card itself.
pub fn configure_cli_logging(verbose: bool) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(if verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set default subscriber: {}", e);
    }
}
