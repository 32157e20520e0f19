use flow_chat::{AppState, app, config::Config};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = Config::from_env().expect("Failed to load configuration");
    let http = reqwest::Client::new();
    let state = AppState::new(cfg, http);
    let addr = state.cfg.bind_addr();
    if state.flow.is_configured() {
        info!(session_id = state.flow.session_id(), "Flow backend configured");
    } else {
        warn!(
            "Flow backend is not configured. Set FLOW_BASE_URL, FLOW_ID and FLOW_API_KEY to enable chat"
        );
    }

    let listener = TcpListener::bind(&addr).await.expect("Failed to bind listener");

    info!("Flow chat listening on http://{addr}");
    axum::serve(listener, app(state)).await.expect("Server error");
}
