//! Client side of the Korean spell-check web service.
//!
//! The pipeline talks to the service through [`SpellService`]: submit one
//! chunk, get back the raw status and body. [`HttpSpellService`] is the
//! reqwest-backed implementation for the known service revisions.

use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::multipart::Form;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::chunker::preview;
use crate::config::ServiceConfig;
use crate::error::SpellError;
use crate::normalizer::ResponseFormat;

/// Action state field the streaming backend expects alongside the text
const NARA_ACTION_STATE: &str = r#"[{"data":null,"error":null},"$K1"]"#;

/// Server action id of the streaming backend's speller form
pub const DEFAULT_ACTION_ID: &str = "7f2acc76ef56592dba37ceb7bfdff1248517384d32";

/// Payload for one chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpellRequest {
    /// Chunk text with newlines turned into carriage returns
    pub text: String,
}

impl SpellRequest {
    pub fn from_chunk(chunk: &str) -> Self {
        Self {
            text: chunk.replace("\r\n", "\r").replace('\n', "\r"),
        }
    }
}

/// Raw service answer, before any interpretation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Anything that can check one chunk
#[async_trait]
pub trait SpellService: Send + Sync {
    /// Shape of the bodies this service returns
    fn format(&self) -> ResponseFormat;

    /// Submit one chunk. Errors mean no response was obtained at all.
    async fn submit(&self, request: &SpellRequest) -> Result<RawResponse, SpellError>;
}

/// Service revisions the HTTP client knows how to call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Current service: multipart form, streaming-line response
    #[default]
    Nara,
    /// Legacy service: urlencoded form, HTML page response
    Pusan,
    /// Plain JSON endpoint: urlencoded form, JSON array response
    Json,
}

impl Backend {
    pub fn format(self) -> ResponseFormat {
        match self {
            Backend::Nara => ResponseFormat::StreamLines,
            Backend::Pusan => ResponseFormat::HtmlEmbedded,
            Backend::Json => ResponseFormat::FlatArray,
        }
    }

    pub fn default_endpoint(self) -> Option<&'static str> {
        match self {
            Backend::Nara => Some("https://nara-speller.co.kr/speller"),
            Backend::Pusan => Some("http://speller.cs.pusan.ac.kr/results"),
            Backend::Json => None,
        }
    }
}

/// HTTP client for the spell-check service
pub struct HttpSpellService {
    client: Client,
    backend: Backend,
    endpoint: String,
    action_id: String,
}

impl HttpSpellService {
    /// Create a client from the service configuration
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let endpoint = config
            .effective_endpoint()
            .ok_or_else(|| anyhow!("No endpoint configured for the {:?} backend", config.backend))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64)")
            .build()?;

        Ok(Self {
            client,
            backend: config.backend,
            endpoint,
            action_id: config
                .action_id
                .clone()
                .unwrap_or_else(|| DEFAULT_ACTION_ID.to_string()),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Call the streaming backend
    async fn call_nara(&self, request: &SpellRequest) -> Result<reqwest::Response, SpellError> {
        let origin = origin_of(&self.endpoint);
        let form = Form::new()
            .text("1_speller-text", request.text.clone())
            .text("0", NARA_ACTION_STATE);

        let response = self
            .client
            .post(&self.endpoint)
            .header("Accept", "text/x-component, */*")
            .header("Origin", origin)
            .header("Referer", self.endpoint.as_str())
            .header("Next-Action", self.action_id.as_str())
            .multipart(form)
            .send()
            .await?;
        Ok(response)
    }

    /// Call a backend that takes a urlencoded `text1` field
    async fn call_form(&self, request: &SpellRequest) -> Result<reqwest::Response, SpellError> {
        let response = self
            .client
            .post(&self.endpoint)
            .form(&[("text1", request.text.as_str())])
            .send()
            .await?;
        Ok(response)
    }
}

#[async_trait]
impl SpellService for HttpSpellService {
    fn format(&self) -> ResponseFormat {
        self.backend.format()
    }

    async fn submit(&self, request: &SpellRequest) -> Result<RawResponse, SpellError> {
        tracing::debug!("POST {} ({:?}): {}", self.endpoint, self.backend, preview(&request.text));

        let response = match self.backend {
            Backend::Nara => self.call_nara(request).await?,
            Backend::Pusan | Backend::Json => self.call_form(request).await?,
        };

        let status = response.status().as_u16();
        let body = response.text().await?;
        tracing::debug!("Response {}: {}", status, preview(&body));

        Ok(RawResponse { status, body })
    }
}

/// Scheme and host part of a URL
fn origin_of(url: &str) -> &str {
    let host_start = url.find("://").map_or(0, |i| i + 3);
    match url[host_start..].find('/') {
        Some(i) => &url[..host_start + i],
        None => url,
    }
}
