use anyhow::{anyhow, Result};
use ollama_rs::generation::completion::request::GenerationRequest;
use ollama_rs::generation::options::GenerationOptions;
use ollama_rs::Ollama;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::environment::Settings;
use crate::TARGET_LLM_REQUEST;

/// A text-completion service: prompt in, completion text out.
///
/// Implementations report failures (unreachable service, non-success status,
/// timeout) as errors and never retry on their own.
pub trait CompletionBackend: Send + Sync {
    fn complete(&self, prompt: &str) -> impl Future<Output = Result<String>> + Send;

    /// Model name, for logs and status output.
    fn model(&self) -> &str;
}

/// Locally hosted Ollama, called through the non-streaming generate endpoint.
#[derive(Clone, Debug)]
pub struct OllamaBackend {
    ollama: Ollama,
    model: String,
    temperature: f32,
    timeout: Duration,
}

impl OllamaBackend {
    pub fn new(settings: &Settings) -> Self {
        Self {
            ollama: Ollama::new(settings.ollama_host.clone(), settings.ollama_port),
            model: settings.model.clone(),
            temperature: settings.temperature,
            timeout: settings.timeout,
        }
    }

    pub fn client(&self) -> &Ollama {
        &self.ollama
    }
}

impl CompletionBackend for OllamaBackend {
    fn complete(&self, prompt: &str) -> impl Future<Output = Result<String>> + Send {
        let mut request = GenerationRequest::new(self.model.clone(), prompt.to_string());
        request.options = Some(GenerationOptions::default().temperature(self.temperature));

        async move {
            debug!(target: TARGET_LLM_REQUEST, "Sending generate request to model {}", self.model);

            match timeout(self.timeout, self.ollama.generate(request)).await {
                Ok(Ok(response)) => {
                    debug!(target: TARGET_LLM_REQUEST, "LLM response received: {}", response.response);
                    Ok(response.response)
                }
                Ok(Err(e)) => {
                    warn!(target: TARGET_LLM_REQUEST, "Error generating response: {}", e);
                    Err(anyhow!("Ollama error: {}", e))
                }
                Err(_) => {
                    warn!(
                        target: TARGET_LLM_REQUEST,
                        "LLM request timed out after {} seconds",
                        self.timeout.as_secs()
                    );
                    Err(anyhow!(
                        "Ollama request timed out after {} seconds",
                        self.timeout.as_secs()
                    ))
                }
            }
        }
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_uses_configured_model() {
        let settings = Settings {
            model: "mistral".to_string(),
            ..Settings::default()
        };
        let backend = OllamaBackend::new(&settings);
        assert_eq!(backend.model(), "mistral");
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_an_error() {
        // Nothing serves Ollama on the discard port.
        let settings = Settings {
            ollama_port: 9,
            timeout: Duration::from_secs(5),
            ..Settings::default()
        };
        let backend = OllamaBackend::new(&settings);
        assert!(backend.complete("hello").await.is_err());
    }
}
