use anyhow::Result;
use std::process::ExitCode;
use std::time::Duration;
use tokio::time::timeout;
use tracing::info;

use jobcard::environment::Settings;
use jobcard::logging::configure_cli_logging;
use jobcard::OllamaBackend;

const CONNECTION_TIMEOUT_SECS: u64 = 10;

/// Struct to hold endpoint status
#[derive(Debug)]
enum EndpointStatus {
    Up(Vec<String>), // Available models
    Down(String),    // Error message
}

async fn test_endpoint(backend: &OllamaBackend) -> EndpointStatus {
    match timeout(
        Duration::from_secs(CONNECTION_TIMEOUT_SECS),
        backend.client().list_local_models(),
    )
    .await
    {
        Ok(Ok(models)) => EndpointStatus::Up(models.iter().map(|m| m.name.clone()).collect()),
        Ok(Err(e)) => EndpointStatus::Down(format!("API error: {}", e)),
        Err(_) => EndpointStatus::Down("Connection timed out".to_string()),
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    configure_cli_logging(false);

    let settings = Settings::from_env();
    let backend = OllamaBackend::new(&settings);
    info!(
        "Testing Ollama endpoint at {}:{}",
        settings.ollama_host, settings.ollama_port
    );

    println!("\nOLLAMA ENDPOINT");
    println!("---------------");

    match test_endpoint(&backend).await {
        EndpointStatus::Up(available_models) => {
            println!("✅ {}:{} - UP", settings.ollama_host, settings.ollama_port);

            let others: Vec<&String> = available_models
                .iter()
                .filter(|m| **m != settings.model)
                .collect();
            if !others.is_empty() {
                println!("  ℹ️ OTHER MODELS:");
                for model in others {
                    println!("    - {}", model);
                }
            }

            if available_models.contains(&settings.model) {
                println!("  ✅ AVAILABLE: {}", settings.model);
                Ok(ExitCode::SUCCESS)
            } else {
                println!("  ❌ MISSING: {}", settings.model);
                println!("\nPull it with: ollama pull {}", settings.model);
                Ok(ExitCode::FAILURE)
            }
        }
        EndpointStatus::Down(error) => {
            println!("❌ {}:{} - DOWN", settings.ollama_host, settings.ollama_port);
            println!("  ⚠️ Error: {}", error);
            Ok(ExitCode::FAILURE)
        }
    }
}
