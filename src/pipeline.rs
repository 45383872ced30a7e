use tracing::{info, warn};

use crate::job_card::{JobCard, JobCardRequest, JobCardResponse};
use crate::llm::CompletionBackend;
use crate::normalize::normalize_response;
use crate::prompt::job_card_prompt;
use crate::TARGET_LLM_REQUEST;

/// Runs one capture through the model and returns a complete card.
///
/// A backend failure is not an error here: the fallback card comes back with
/// a `warning` describing what went wrong.
pub async fn generate_job_card<B: CompletionBackend>(
    backend: &B,
    request: &JobCardRequest,
) -> JobCardResponse {
    let fallback = JobCard::fallback(request);
    let prompt = job_card_prompt(request);

    info!(
        target: TARGET_LLM_REQUEST,
        "Generating job card for '{}' with model {}",
        fallback.source_title,
        backend.model()
    );

    match backend.complete(&prompt).await {
        Ok(response_text) => JobCardResponse {
            job_card: normalize_response(&response_text, &fallback),
            warning: None,
        },
        Err(e) => {
            warn!(target: TARGET_LLM_REQUEST, "Local model call failed, using fallback: {:#}", e);
            JobCardResponse {
                job_card: fallback,
                warning: Some(format!("Used fallback (local model call failed): {:#}", e)),
            }
        }
    }
}
