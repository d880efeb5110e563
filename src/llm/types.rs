use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// The structured decision produced once per loop iteration. The planner's
/// reply is untyped on the wire; anything that does not parse into one of
/// these variants is normalized to [`Plan::Error`] rather than trusted
/// downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Plan {
    Click {
        #[serde(default)]
        thought: String,
        #[serde(default)]
        target_text: Option<String>,
    },
    Type {
        #[serde(default)]
        thought: String,
        #[serde(default)]
        text_to_type: Option<String>,
        /// Fallback text source when the planner confuses the two fields.
        #[serde(default)]
        target_text: Option<String>,
    },
    Done {
        #[serde(default)]
        thought: String,
    },
    Fail {
        #[serde(default)]
        thought: String,
    },
    Error {
        #[serde(default)]
        thought: String,
    },
}

impl Plan {
    pub fn error(thought: impl Into<String>) -> Self {
        Plan::Error {
            thought: thought.into(),
        }
    }

    pub fn thought(&self) -> &str {
        match self {
            Plan::Click { thought, .. }
            | Plan::Type { thought, .. }
            | Plan::Done { thought }
            | Plan::Fail { thought }
            | Plan::Error { thought } => thought,
        }
    }

    pub fn action_name(&self) -> &'static str {
        match self {
            Plan::Click { .. } => "click",
            Plan::Type { .. } => "type",
            Plan::Done { .. } => "done",
            Plan::Fail { .. } => "fail",
            Plan::Error { .. } => "error",
        }
    }

    /// Parses a raw planner reply. Accepts a bare JSON object or one wrapped
    /// in a fenced code block; any reply without a recognized `action` tag
    /// becomes a canonical error plan.
    pub fn from_response(raw: &str) -> Plan {
        let Some(json) = extract_json(raw) else {
            return Plan::error("planner reply contained no JSON object");
        };
        match serde_json::from_str::<Plan>(&json) {
            Ok(plan) => plan,
            Err(e) => {
                tracing::warn!(error = %e, "planner reply did not parse into a plan");
                Plan::error(format!("unrecognized plan shape: {e}"))
            }
        }
    }
}

/// Pulls the first JSON object out of a reply, stripping a surrounding
/// ``` fence if present.
pub(crate) fn extract_json(raw: &str) -> Option<String> {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    let fence = FENCE.get_or_init(|| {
        Regex::new(r"```(?:json)?\s*([\s\S]*?)```").expect("fence regex")
    });

    let candidate = fence
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(raw);

    let start = candidate.find('{')?;
    let end = candidate.rfind('}')?;
    if end < start {
        return None;
    }
    Some(candidate[start..=end].to_string())
}

// ── Chat wire types (OpenAI-compatible) ──────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn text(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: MessageContent::Text(content.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}
