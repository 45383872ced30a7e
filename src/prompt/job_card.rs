use crate::job_card::{JobCardRequest, YOUTUBE_PLACEHOLDER};
use crate::prompt::common::{
    safe_slice, JSON_ONLY, TEXT_MAX_CHARS, TITLE_MAX_CHARS, TRADE_VOICE, URL_MAX_CHARS,
};

/// Generate a prompt asking the model to turn a captured page into a job card.
///
/// Source fields are trimmed and cut to a fixed length before being embedded,
/// so arbitrarily large captures never reach the model whole.
pub fn job_card_prompt(request: &JobCardRequest) -> String {
    format!(
        r#"{voice}{json_only}
Schema (use exactly these keys):
{{
  "task_name": string,
  "source_title": string,
  "source_url": string,
  "when_to_use": string,
  "tools_ppe": string[],
  "steps": string[],
  "common_mistakes": string[],
  "safety_notes": string[],
  "acceptance_checks": string[],
  "youtube_link": string,
  "needs_review": boolean
}}

Rules:
- steps: 6-10 items, each 14 words or fewer, each starting with a verb.
- safety_notes: 3-6 items, no filler.
- common_mistakes: 3-6 items.
- acceptance_checks: 3-6 items.
- If you are unsure about tools or PPE, use "TBD (site-specific)".
- youtube_link: "{youtube}"
- needs_review: always true

Source:
Title: {title}
URL: {url}
Text:
{text}
"#,
        voice = TRADE_VOICE,
        json_only = JSON_ONLY,
        youtube = YOUTUBE_PLACEHOLDER,
        title = safe_slice(request.title.as_deref(), TITLE_MAX_CHARS),
        url = safe_slice(request.url.as_deref(), URL_MAX_CHARS),
        text = safe_slice(request.text.as_deref(), TEXT_MAX_CHARS),
    )
}
