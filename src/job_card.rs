use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::normalize::{stringify_value, truncate_chars};

pub const TASK_NAME_MAX_CHARS: usize = 120;
pub const SOURCE_TITLE_MAX_CHARS: usize = 200;
pub const SOURCE_URL_MAX_CHARS: usize = 600;

/// Placeholder the model is told to use until someone attaches a real video.
pub const YOUTUBE_PLACEHOLDER: &str = "https://www.youtube.com/watch?v=VIDEO_ID_TBD";

const DEFAULT_TASK_NAME: &str = "Untitled Task";
const DEFAULT_SOURCE_TITLE: &str = "Unknown Source";
const DEFAULT_WHEN_TO_USE: &str =
    "Before performing this task, or when reviewing the procedure on-site.";
const DEFAULT_TOOLS_PPE: &str = "TBD";
const DEFAULT_STEP: &str = "Review the procedure and confirm the work area is safe.";
const DEFAULT_MISTAKE: &str = "Skipping checks because the task feels routine.";
const DEFAULT_SAFETY_NOTE: &str = "Follow site safety rules and stop if conditions differ.";
const DEFAULT_ACCEPTANCE_CHECK: &str = "Work completed to spec and documented.";

/// A page capture sent by the browser extension.
///
/// Every field may be missing or `null`. Scalars that are not strings are
/// accepted and converted to text.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct JobCardRequest {
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub text: Option<String>,
}

impl JobCardRequest {
    pub fn new(title: &str, url: &str, text: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            url: Some(url.to_string()),
            text: Some(text.to_string()),
        }
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.map(|v| match v {
        Value::String(s) => s,
        other => stringify_value(&other),
    }))
}

/// A normalized procedural-knowledge record.
///
/// Field order matches the order the JSON is serialized in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobCard {
    pub task_name: String,
    pub source_title: String,
    pub source_url: String,
    pub when_to_use: String,
    pub tools_ppe: Vec<String>,
    pub steps: Vec<String>,
    pub safety_notes: Vec<String>,
    pub common_mistakes: Vec<String>,
    pub acceptance_checks: Vec<String>,
    pub youtube_link: String,
    pub needs_review: bool,
}

impl JobCard {
    /// Builds the safety-first card used whenever the model output can't be
    /// trusted, seeded from the page the request came from.
    pub fn fallback(request: &JobCardRequest) -> Self {
        let title = request.title.as_deref().filter(|t| !t.is_empty());
        let url = request.url.as_deref().unwrap_or_default();

        JobCard {
            task_name: truncate_chars(title.unwrap_or(DEFAULT_TASK_NAME), TASK_NAME_MAX_CHARS),
            source_title: truncate_chars(
                title.unwrap_or(DEFAULT_SOURCE_TITLE),
                SOURCE_TITLE_MAX_CHARS,
            ),
            source_url: truncate_chars(url, SOURCE_URL_MAX_CHARS),
            when_to_use: DEFAULT_WHEN_TO_USE.to_string(),
            tools_ppe: vec![DEFAULT_TOOLS_PPE.to_string()],
            steps: vec![DEFAULT_STEP.to_string()],
            safety_notes: vec![DEFAULT_SAFETY_NOTE.to_string()],
            common_mistakes: vec![DEFAULT_MISTAKE.to_string()],
            acceptance_checks: vec![DEFAULT_ACCEPTANCE_CHECK.to_string()],
            youtube_link: YOUTUBE_PLACEHOLDER.to_string(),
            needs_review: true,
        }
    }

    /// Replaces the video link, e.g. with one the user pasted in.
    pub fn with_youtube_link(mut self, link: &str) -> Self {
        self.youtube_link = link.to_string();
        self
    }

    /// Plain-text summary suitable for pasting into a notes pad.
    pub fn to_notes(&self) -> String {
        let steps = self
            .steps
            .iter()
            .enumerate()
            .map(|(i, step)| format!("{}. {}", i + 1, step))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "JOB CARD: {task}
When to use: {when}

Tools/PPE:
{tools}

Steps:
{steps}

Safety:
{safety}

Mistakes:
{mistakes}

Acceptance:
{acceptance}

Video: {video}

Source: {source}",
            task = self.task_name,
            when = self.when_to_use,
            tools = bullets(&self.tools_ppe),
            steps = steps,
            safety = bullets(&self.safety_notes),
            mistakes = bullets(&self.common_mistakes),
            acceptance = bullets(&self.acceptance_checks),
            video = self.youtube_link,
            source = self.source_url,
        )
    }
}

fn bullets(items: &[String]) -> String {
    format!("- {}", items.join("\n- "))
}

/// What the relay hands back to the extension. `warning` is only present when
/// the backend call failed and `job_card` is the fallback.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobCardResponse {
    pub job_card: JobCard,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}
