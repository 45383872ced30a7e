use anyhow::Result;
use tracing::info;

use jobcard::app_api::app_api_loop;
use jobcard::environment::Settings;
use jobcard::logging::configure_logging;
use jobcard::OllamaBackend;

#[tokio::main]
async fn main() -> Result<()> {
    configure_logging();

    let settings = Settings::from_env();
    info!(
        "Starting job card relay v{} on {}",
        env!("CARGO_PKG_VERSION"),
        settings.listen_addr()
    );

    let backend = OllamaBackend::new(&settings);
    app_api_loop(&settings, backend).await
}
