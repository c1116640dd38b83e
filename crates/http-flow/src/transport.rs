//! HTTP transport boundary.

use crate::errors::HttpFlowError;
use crate::request::PreparedRequest;
use async_trait::async_trait;
use tracing::debug;

/// Raw response as the runner sees it.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends a prepared request. The runner never touches sockets directly,
/// so tests drive it with a canned transport.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: &PreparedRequest) -> Result<HttpResponse, HttpFlowError>;
}

/// Production transport backed by reqwest.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &PreparedRequest) -> Result<HttpResponse, HttpFlowError> {
        let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|err| HttpFlowError::Transport(err.to_string()))?;

        let mut builder = self.client.request(method, request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        debug!(url = %request.url, method = request.method.as_str(), "sending request");
        let response = builder
            .send()
            .await
            .map_err(|err| HttpFlowError::Transport(err.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|err| HttpFlowError::Transport(err.to_string()))?;
        Ok(HttpResponse { status, body })
    }
}
