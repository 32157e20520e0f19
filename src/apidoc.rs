use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Flow Chat",
        version = "0.1.0",
        description = "Chat page backend. Forwards each prompt to a flow backend run and returns the reply text."
    ),
    servers(
        (url = "http://localhost:8080", description = "Local dev")
    ),
    tags(
        (name = "chat", description = "Chat turns and client status")
    ),
    paths(
        crate::routes::chat::get_status,
        crate::routes::chat::post_chat,
    ),
    components(
        schemas(
            crate::models::chat::ChatRequest,
            crate::models::chat::ChatReply,
            crate::models::chat::StatusReply,
            crate::models::chat::ErrorMessage
        )
    )
)]
pub struct ApiDoc;
