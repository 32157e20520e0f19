use std::error::Error as _;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use serde_json::Value;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::FlowConfig;
use crate::models::flow::{RunRequest, extract_text};

const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("Flow backend is not configured. Please set {}", .0.join(" and "))]
    NotConfigured(Vec<&'static str>),
    #[error("Invalid flow endpoint: {0}")]
    Endpoint(String),
    #[error("Flow request error: {0}")]
    Network(#[source] reqwest::Error),
    #[error("Flow request timed out after {}s", .0.as_secs_f32())]
    Timeout(Duration),
    #[error("Flow request failed ({status}): {body}")]
    Status { status: u16, body: String },
    #[error("Failed to parse flow response: {0}")]
    Decode(#[source] reqwest::Error),
    #[error("No text returned from flow response")]
    EmptyResult,
}

impl FlowError {
    /// Only a timed out attempt or a reset connection earns the single retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::Network(err) => is_connection_reset(err),
            _ => false,
        }
    }
}

impl FlowConfig {
    /// `{base}/api/v1/run/{flow_id}?stream=false`
    pub fn endpoint(&self) -> Result<Url, FlowError> {
        let flow_id = self
            .flow_id
            .as_deref()
            .ok_or_else(|| FlowError::NotConfigured(self.missing_vars()))?;
        let mut url = self
            .base_url_or_dev_proxy()
            .map_err(|err| FlowError::Endpoint(err.to_string()))?;

        let base = url.to_string();
        url.path_segments_mut()
            .map_err(|_| FlowError::Endpoint(format!("{base} cannot be a base URL")))?
            .pop_if_empty()
            .extend(["api", "v1", "run", flow_id]);
        url.set_query(None);
        url.query_pairs_mut().append_pair("stream", "false");
        Ok(url)
    }
}

#[derive(Clone)]
pub struct FlowClient {
    http: reqwest::Client,
    config: Arc<FlowConfig>,
    session_id: String,
}

impl FlowClient {
    pub fn new(config: FlowConfig, http: reqwest::Client) -> Self {
        Self {
            http,
            config: Arc::new(config),
            session_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Session identifier generated for this client's lifetime.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Runs the flow on `prompt` and returns the reply text.
    ///
    /// Falls back to the client's own session identifier when `session_id` is `None`.
    pub async fn send_prompt(
        &self,
        prompt: &str,
        session_id: Option<&str>,
    ) -> Result<String, FlowError> {
        let api_key = match (&self.config.flow_id, &self.config.api_key) {
            (Some(_), Some(key)) => key.as_str(),
            _ => return Err(FlowError::NotConfigured(self.config.missing_vars())),
        };
        let url = self.config.endpoint()?;
        let session_id = session_id.unwrap_or(self.session_id.as_str());
        let payload = RunRequest::chat(prompt, session_id);

        info!(session_id, "Sending prompt to flow backend");

        let res = match self.attempt(&url, api_key, &payload).await {
            Ok(res) => res,
            Err(err) if err.is_retryable() => {
                warn!(session_id, "Retrying flow request once: {}", err);
                self.attempt(&url, api_key, &payload).await?
            }
            Err(err) => return Err(err),
        };

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            let body = if body.is_empty() {
                status.canonical_reason().unwrap_or_default().to_string()
            } else {
                body
            };
            warn!(session_id, status = status.as_u16(), "Flow backend returned an error");
            return Err(FlowError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let data: Value = res.json().await.map_err(FlowError::Decode)?;
        let text = extract_text(&data).ok_or(FlowError::EmptyResult)?;
        debug!(session_id, chars = text.len(), "Flow backend replied");
        Ok(text)
    }

    /// One POST bounded by the configured deadline. Dropping the send future
    /// on expiry cancels the in-flight request.
    async fn attempt(
        &self,
        url: &Url,
        api_key: &str,
        payload: &RunRequest<'_>,
    ) -> Result<reqwest::Response, FlowError> {
        debug!(%url, "Posting run request");
        let send = self
            .http
            .post(url.clone())
            .header(API_KEY_HEADER, api_key)
            .json(payload)
            .send();

        match timeout(self.config.timeout, send).await {
            Ok(result) => result.map_err(FlowError::Network),
            Err(_) => Err(FlowError::Timeout(self.config.timeout)),
        }
    }
}

fn is_connection_reset(err: &reqwest::Error) -> bool {
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            if io_err.kind() == io::ErrorKind::ConnectionReset {
                return true;
            }
        }
        source = cause.source();
    }
    false
}
