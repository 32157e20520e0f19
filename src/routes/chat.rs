use axum::{Json, extract::State, http::StatusCode};
use tracing::warn;

use crate::{
    AppState,
    handlers::{self, ChatHandleError},
    models::chat::{ChatReply, ChatRequest, ErrorMessage, StatusReply},
    services::flow::FlowError,
};

type ApiError = (StatusCode, Json<ErrorMessage>);

#[utoipa::path(
    get,
    path = "/status",
    tag = "chat",
    responses(
        (status = 200, description = "Whether the flow backend is configured", body = StatusReply)
    )
)]
pub async fn get_status(State(state): State<AppState>) -> Json<StatusReply> {
    Json(StatusReply {
        configured: state.flow.is_configured(),
        session_id: state.flow.session_id().to_string(),
    })
}

#[utoipa::path(
    post,
    path = "/chat",
    tag = "chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Reply text from the flow", body = ChatReply),
        (status = 400, description = "Blank prompt", body = ErrorMessage),
        (status = 502, description = "Flow backend failed or returned no text", body = ErrorMessage),
        (status = 503, description = "Flow backend is not configured", body = ErrorMessage),
        (status = 504, description = "Flow backend timed out, including the retry", body = ErrorMessage)
    )
)]
pub async fn post_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatReply>, ApiError> {
    handlers::handle_chat(&state, req)
        .await
        .map(Json)
        .map_err(|err| {
            warn!("Chat turn failed: {err}");
            (
                status_for(&err),
                Json(ErrorMessage {
                    error: err.to_string(),
                }),
            )
        })
}

fn status_for(err: &ChatHandleError) -> StatusCode {
    match err {
        ChatHandleError::EmptyPrompt => StatusCode::BAD_REQUEST,
        ChatHandleError::Flow(FlowError::NotConfigured(_)) => StatusCode::SERVICE_UNAVAILABLE,
        ChatHandleError::Flow(FlowError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
        ChatHandleError::Flow(_) => StatusCode::BAD_GATEWAY,
    }
}
