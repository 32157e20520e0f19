use thiserror::Error;
use tracing::info;

use crate::{
    AppState,
    models::chat::{ChatReply, ChatRequest},
    services::flow::FlowError,
};

#[derive(Debug, Error)]
pub enum ChatHandleError {
    #[error("Prompt is empty")]
    EmptyPrompt,

    // Lets `?` lift flow failures straight through
    #[error(transparent)]
    Flow(#[from] FlowError),
}

/// Runs one chat turn. Turns sharing a session are processed one at a time.
pub async fn handle_chat(state: &AppState, req: ChatRequest) -> Result<ChatReply, ChatHandleError> {
    let prompt = req.prompt.trim();
    if prompt.is_empty() {
        return Err(ChatHandleError::EmptyPrompt);
    }

    let session_id = req
        .session_id
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| state.flow.session_id().to_string());

    let _turn = state.session_locks.lock(session_id.clone()).await;
    info!(session_id = %session_id, "Handling chat turn");

    let reply = state.flow.send_prompt(prompt, Some(session_id.as_str())).await?;
    Ok(ChatReply { reply, session_id })
}
