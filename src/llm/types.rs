use serde::{Deserialize, Serialize};

use crate::agent_engine::action::ActionDescriptor;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn text(role: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn parts(role: impl Into<String>, parts: Vec<ContentPart>) -> Self {
        Self {
            role: role.into(),
            content: MessageContent::Parts(parts),
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

/// Outcome of one model call.
#[derive(Debug, Clone)]
pub struct ModelTurn {
    /// Assistant text verbatim (also what history retains).
    pub text: String,
    /// Full response body for diagnostics.
    pub raw: serde_json::Value,
    pub decoded: DecodedAction,
}

/// Extraction result. The two cases are deliberately distinct types so a
/// caller can never mistake raw text for a validated action.
#[derive(Debug, Clone)]
pub enum DecodedAction {
    Action(ActionDescriptor),
    /// Model output that failed JSON parsing or the action shape; carried
    /// verbatim so the caller can log or recover.
    Unparsed(String),
}
