use std::fmt;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use client_logging::{client_debug, client_trace};
use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use url::Url;

use crate::{ApiError, EngineEvent, FailureKind, PollOutcome, ProgressSink, SessionKey};

pub const DEFAULT_TOPIC: &str = "sarcastic";
const SKIP_BROWSER_WARNING: &str = "ngrok-skip-browser-warning";
/// Upper bound on the buffer reserved up front from `Content-Length`.
const MAX_PREALLOCATION: u64 = 64 * 1024 * 1024;

#[derive(Clone)]
pub struct ApiSettings {
    /// Sent as `Authorization: Bearer ...` on progress and download requests.
    pub bearer_token: Option<String>,
    pub topic: String,
    pub skip_browser_warning: bool,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Overall limit for one artifact transfer.
    pub download_timeout: Duration,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            bearer_token: None,
            topic: DEFAULT_TOPIC.to_string(),
            skip_browser_warning: true,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            download_timeout: Duration::from_secs(30 * 60),
        }
    }
}

impl fmt::Debug for ApiSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiSettings")
            .field(
                "bearer_token",
                &self.bearer_token.as_ref().map(|_| "<redacted>"),
            )
            .field("topic", &self.topic)
            .field("skip_browser_warning", &self.skip_browser_warning)
            .field("connect_timeout", &self.connect_timeout)
            .field("request_timeout", &self.request_timeout)
            .field("download_timeout", &self.download_timeout)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DownloadMode {
    /// Read the whole body in one go.
    SingleShot,
    /// Consume the body chunk by chunk, reporting progress.
    #[default]
    Streamed,
}

#[async_trait::async_trait]
pub trait JobApi: Send + Sync {
    async fn submit(&self, endpoint: &str, video_url: &str) -> Result<(), ApiError>;

    /// One status check. Never fails outright: problems become
    /// [`PollOutcome::Transient`].
    async fn check_progress(&self, endpoint: &str, job_id: &str) -> PollOutcome;

    async fn fetch_artifact(
        &self,
        session: SessionKey,
        endpoint: &str,
        job_id: &str,
        mode: DownloadMode,
        sink: &dyn ProgressSink,
    ) -> Result<Bytes, ApiError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestJobApi {
    settings: ApiSettings,
    client: reqwest::Client,
}

impl ReqwestJobApi {
    pub fn new(settings: ApiSettings) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { settings, client })
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = match &self.settings.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        if self.settings.skip_browser_warning {
            request.header(SKIP_BROWSER_WARNING, "true")
        } else {
            request
        }
    }

    async fn fetch_progress(&self, endpoint: &str, job_id: &str) -> Result<ProgressBody, ApiError> {
        let url = progress_url(endpoint, job_id)?;
        let response = self
            .authorized(self.client.get(url))
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());
        let body = response.bytes().await.map_err(map_reqwest_error)?;

        if let Some(ct) = content_type.as_deref() {
            if ct.to_ascii_lowercase().contains("text/html") {
                client_debug!(
                    "Progress check returned an HTML page: {}",
                    String::from_utf8_lossy(&body)
                );
                return Err(ApiError::new(
                    FailureKind::UnexpectedContent {
                        content_type: ct.to_string(),
                    },
                    "received HTML instead of JSON",
                ));
            }
        }

        serde_json::from_slice(&body)
            .map(ProgressBody::from_json)
            .map_err(|err| ApiError::new(FailureKind::MalformedBody, err.to_string()))
    }
}

#[async_trait::async_trait]
impl JobApi for ReqwestJobApi {
    async fn submit(&self, endpoint: &str, video_url: &str) -> Result<(), ApiError> {
        let url = process_url(endpoint, video_url, &self.settings.topic)?;
        client_debug!("POST {}", url);
        let response = self
            .client
            .post(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ApiError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ))
        }
    }

    async fn check_progress(&self, endpoint: &str, job_id: &str) -> PollOutcome {
        match self.fetch_progress(endpoint, job_id).await {
            Ok(body) => body.into_outcome(),
            Err(err) => PollOutcome::Transient(err),
        }
    }

    async fn fetch_artifact(
        &self,
        session: SessionKey,
        endpoint: &str,
        job_id: &str,
        mode: DownloadMode,
        sink: &dyn ProgressSink,
    ) -> Result<Bytes, ApiError> {
        let url = download_url(endpoint, job_id)?;
        let response = self
            .authorized(self.client.get(url))
            .timeout(self.settings.download_timeout)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        match mode {
            DownloadMode::SingleShot => response.bytes().await.map_err(map_reqwest_error),
            DownloadMode::Streamed => {
                let total = response.content_length();
                sink.emit(EngineEvent::DownloadProgress {
                    session,
                    received: 0,
                    total,
                });

                let capacity = total.unwrap_or(0).min(MAX_PREALLOCATION) as usize;
                let mut buffer = BytesMut::with_capacity(capacity);
                let mut stream = response.bytes_stream();
                while let Some(chunk) = stream.next().await {
                    let chunk = chunk.map_err(map_reqwest_error)?;
                    buffer.extend_from_slice(&chunk);
                    client_trace!("Download chunk of {} bytes", chunk.len());
                    sink.emit(EngineEvent::DownloadProgress {
                        session,
                        received: buffer.len() as u64,
                        total,
                    });
                }
                Ok(buffer.freeze())
            }
        }
    }
}

/// Progress answer. Both fields are optional: any JSON that is not a
/// completed or error status counts as still running.
#[derive(Debug, Default, Deserialize)]
struct ProgressBody {
    #[serde(default)]
    status: Option<serde_json::Value>,
    #[serde(default)]
    reason: Option<serde_json::Value>,
}

impl ProgressBody {
    /// Non-object JSON (a bare number, an array) has no status either.
    fn from_json(value: serde_json::Value) -> Self {
        serde_json::from_value(value).unwrap_or_default()
    }

    fn into_outcome(self) -> PollOutcome {
        match self.status {
            Some(serde_json::Value::String(status)) if status == "completed" => {
                PollOutcome::Completed
            }
            Some(serde_json::Value::String(status)) if status == "error" => PollOutcome::Failed {
                reason: self.reason.and_then(|reason| match reason {
                    serde_json::Value::Null => None,
                    serde_json::Value::String(text) => Some(text),
                    other => Some(other.to_string()),
                }),
            },
            Some(serde_json::Value::String(status)) => PollOutcome::Pending { status },
            Some(other) => PollOutcome::Pending {
                status: other.to_string(),
            },
            None => PollOutcome::Pending {
                status: String::new(),
            },
        }
    }
}

/// `{endpoint}/process?video_url=..&topic=..`, form-encoded.
pub fn process_url(endpoint: &str, video_url: &str, topic: &str) -> Result<Url, ApiError> {
    let mut url = endpoint_url(endpoint, &["process"])?;
    url.query_pairs_mut()
        .append_pair("video_url", video_url)
        .append_pair("topic", topic);
    Ok(url)
}

pub fn progress_url(endpoint: &str, job_id: &str) -> Result<Url, ApiError> {
    endpoint_url(endpoint, &["progress", job_id])
}

pub fn download_url(endpoint: &str, job_id: &str) -> Result<Url, ApiError> {
    endpoint_url(endpoint, &["download", job_id])
}

/// Push-channel address: the progress path with `http(s)` swapped for `ws(s)`.
pub fn channel_url(endpoint: &str, job_id: &str) -> Result<Url, ApiError> {
    let mut url = progress_url(endpoint, job_id)?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(ApiError::new(
                FailureKind::InvalidUrl,
                format!("no push channel for scheme {other}"),
            ))
        }
    };
    url.set_scheme(scheme)
        .map_err(|()| ApiError::new(FailureKind::InvalidUrl, "cannot switch to websocket scheme"))?;
    Ok(url)
}

fn endpoint_url(endpoint: &str, segments: &[&str]) -> Result<Url, ApiError> {
    let mut url = Url::parse(endpoint.trim())
        .map_err(|err| ApiError::new(FailureKind::InvalidUrl, format!("{endpoint}: {err}")))?;
    url.set_fragment(None);
    {
        let mut path = url.path_segments_mut().map_err(|()| {
            ApiError::new(
                FailureKind::InvalidUrl,
                format!("{endpoint} cannot be used as a base url"),
            )
        })?;
        path.pop_if_empty().extend(segments);
    }
    Ok(url)
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_decode() {
        return ApiError::new(FailureKind::MalformedBody, err.to_string());
    }
    ApiError::new(FailureKind::Network, err.to_string())
}
