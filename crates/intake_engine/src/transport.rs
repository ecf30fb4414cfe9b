use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use intake_core::{AnswerReport, JobHandle, StatusReport, UploadCandidate};
use intake_logging::{intake_debug, intake_warn, short_id};
use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde::de::DeserializeOwned;
use url::Url;

use crate::types::{AskRequest, ErrorBody, UploadResponse};
use crate::{TransportError, TransportFailure};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";
pub const API_KEY_HEADER: &str = "X-API-Key";
pub const DEFAULT_CONTEXT_WINDOW: u32 = 4096;
pub const MIN_CONTEXT_WINDOW: u32 = 512;
pub const MAX_CONTEXT_WINDOW: u32 = 8192;

const PDF_MIME: &str = "application/pdf";

#[derive(Debug, Clone)]
pub struct TransportSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Token budget requested for answers; clamped to 512..=8192.
    pub context_window: u32,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            context_window: DEFAULT_CONTEXT_WINDOW,
        }
    }
}

/// API key shared by every request made through one transport.
///
/// Cloning shares the slot, so a key entered after a 401 is picked up by the
/// next request. Each request reads a single snapshot.
#[derive(Clone, Default)]
pub struct Credential {
    key: Arc<RwLock<Option<Secret<String>>>>,
}

impl Credential {
    pub fn new(key: Option<String>) -> Self {
        let credential = Self::default();
        credential.set(key);
        credential
    }

    /// Replace the key; blank input clears it.
    pub fn set(&self, key: Option<String>) {
        let key = key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .map(Secret::new);
        *self.key.write().unwrap_or_else(PoisonError::into_inner) = key;
    }

    pub fn is_set(&self) -> bool {
        self.key
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn header_value(&self) -> Option<HeaderValue> {
        let guard = self.key.read().unwrap_or_else(PoisonError::into_inner);
        let mut value = HeaderValue::from_str(guard.as_ref()?.expose_secret()).ok()?;
        value.set_sensitive(true);
        Some(value)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("key", &self.is_set().then_some("[REDACTED]"))
            .finish()
    }
}

/// Request/response boundary to the document service.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn upload(&self, candidate: &UploadCandidate) -> Result<JobHandle, TransportError>;

    async fn check_status(&self, handle: &JobHandle) -> Result<StatusReport, TransportError>;

    /// An empty success body is a valid outcome.
    async fn delete(&self, handle: &JobHandle) -> Result<(), TransportError>;

    /// `question` is expected to be trimmed and capped already.
    async fn ask(&self, handle: &JobHandle, question: &str) -> Result<AnswerReport, TransportError>;

    /// Raw capability/config snapshot for monitoring collaborators.
    async fn health(&self) -> Result<serde_json::Value, TransportError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: Url,
    context_window: u32,
    credential: Credential,
}

impl ReqwestTransport {
    pub fn new(settings: TransportSettings, credential: Credential) -> Result<Self, TransportError> {
        let base_url = Url::parse(&settings.base_url)
            .map_err(|err| TransportError::new(TransportFailure::InvalidUrl, err.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(TransportError::new(
                TransportFailure::InvalidUrl,
                format!("{base_url} cannot carry a path"),
            ));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| TransportError::new(TransportFailure::Network, err.to_string()))?;

        Ok(Self {
            client,
            base_url,
            context_window: settings
                .context_window
                .clamp(MIN_CONTEXT_WINDOW, MAX_CONTEXT_WINDOW),
            credential,
        })
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, TransportError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|()| {
                TransportError::new(TransportFailure::InvalidUrl, "base url cannot carry a path")
            })?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self
            .client
            .request(method, url)
            .header(ACCEPT, HeaderValue::from_static("application/json"));
        match self.credential.header_value() {
            Some(key) => builder.header(API_KEY_HEADER, key),
            None => builder,
        }
    }

    async fn execute(&self, builder: RequestBuilder) -> Result<Response, TransportError> {
        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED {
            intake_warn!("service rejected the request: API key missing or invalid");
        }
        // No server detail leaves the message empty; classification supplies the wording.
        let body = response.bytes().await.unwrap_or_default();
        let message = serde_json::from_slice::<ErrorBody>(&body)
            .ok()
            .and_then(ErrorBody::message)
            .unwrap_or_default();
        Err(TransportError::new(
            TransportFailure::HttpStatus(status.as_u16()),
            message,
        ))
    }
}

#[async_trait::async_trait]
impl Transport for ReqwestTransport {
    async fn upload(&self, candidate: &UploadCandidate) -> Result<JobHandle, TransportError> {
        let url = self.endpoint(&["documents", "upload"])?;
        let content = candidate.content().clone();
        let length = content.len() as u64;
        let part = Part::stream_with_length(content, length)
            .file_name(candidate.name().to_string())
            .mime_str(PDF_MIME)
            .map_err(|err| TransportError::new(TransportFailure::Request, err.to_string()))?;
        let form = Form::new().part("file", part);

        intake_debug!("POST {} ({} bytes)", url, candidate.size());
        let response = self
            .execute(self.request(Method::POST, url).multipart(form))
            .await?;
        let body: UploadResponse = read_json(response).await?;
        Ok(JobHandle::new(body.document_id))
    }

    async fn check_status(&self, handle: &JobHandle) -> Result<StatusReport, TransportError> {
        let url = self.endpoint(&["documents", "status", &handle.document_id])?;
        intake_debug!("GET status for {}", short_id(&handle.document_id));
        let response = self.execute(self.request(Method::GET, url)).await?;
        read_json(response).await
    }

    async fn delete(&self, handle: &JobHandle) -> Result<(), TransportError> {
        let url = self.endpoint(&["documents", &handle.document_id])?;
        intake_debug!("DELETE {}", short_id(&handle.document_id));
        self.execute(self.request(Method::DELETE, url)).await?;
        Ok(())
    }

    async fn ask(&self, handle: &JobHandle, question: &str) -> Result<AnswerReport, TransportError> {
        let url = self.endpoint(&["queries", "ask"])?;
        let body = AskRequest {
            question,
            document_id: &handle.document_id,
            context_window: self.context_window,
        };
        intake_debug!(
            "POST question ({} chars) for {}",
            question.chars().count(),
            short_id(&handle.document_id)
        );
        let response = self
            .execute(self.request(Method::POST, url).json(&body))
            .await?;
        read_json(response).await
    }

    async fn health(&self) -> Result<serde_json::Value, TransportError> {
        let url = self.endpoint(&["health"])?;
        let response = self.execute(self.request(Method::GET, url)).await?;
        read_json(response).await
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, TransportError> {
    let body = response.bytes().await.map_err(map_reqwest_error)?;
    serde_json::from_slice(&body)
        .map_err(|err| TransportError::new(TransportFailure::Decode, err.to_string()))
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        return TransportError::new(TransportFailure::Timeout, err.to_string());
    }
    if err.is_builder() {
        return TransportError::new(TransportFailure::Request, err.to_string());
    }
    if err.is_decode() {
        return TransportError::new(TransportFailure::Decode, err.to_string());
    }
    TransportError::new(TransportFailure::Network, err.to_string())
}
