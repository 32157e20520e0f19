pub mod apidoc;
pub mod config;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod synch;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use config::Config;
use services::flow::FlowClient;
use synch::SessionLocks;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Config,
    pub flow: FlowClient,
    pub session_locks: Arc<SessionLocks<String>>,
}

impl AppState {
    pub fn new(cfg: Config, http: reqwest::Client) -> Self {
        let flow = FlowClient::new(cfg.flow.clone(), http);
        Self {
            cfg,
            flow,
            session_locks: Arc::new(SessionLocks::new()),
        }
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/status", get(routes::chat::get_status))
        .route("/chat", post(routes::chat::post_chat))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", apidoc::ApiDoc::openapi()))
        .with_state(state)
}
