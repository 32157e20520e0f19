use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A single user turn posted by the chat page.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatRequest {
    pub prompt: String,
    /// Correlates turns on the flow backend. Defaults to this process's session.
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatReply {
    /// Markdown text produced by the flow
    pub reply: String,
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusReply {
    /// False when the page should show the "not configured" banner and disable input
    pub configured: bool,
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorMessage {
    pub error: String,
}
