pub mod app_api;
pub mod environment;
pub mod job_card;
pub mod llm;
pub mod logging;
pub mod normalize;
pub mod pipeline;
pub mod prompt;

pub const TARGET_WEB_REQUEST: &str = "web_request";
pub const TARGET_LLM_REQUEST: &str = "llm_request";
pub const TARGET_NORMALIZE: &str = "normalize";

pub use job_card::{JobCard, JobCardRequest, JobCardResponse};
pub use llm::{CompletionBackend, OllamaBackend};
pub use pipeline::generate_job_card;
