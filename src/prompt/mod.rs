mod common;
mod job_card;

pub use common::{safe_slice, TEXT_MAX_CHARS, TITLE_MAX_CHARS, URL_MAX_CHARS};
pub use job_card::job_card_prompt;
