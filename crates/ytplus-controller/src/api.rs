//! Backend contract and its HTTP implementation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CACHE_CONTROL, HeaderMap, HeaderValue};
use reqwest::{Client, Response};
use url::Url;
use ytplus_api_models::{ApiErrorBody, DownloadRequest, InfoRequest, MediaInfo, StatusSnapshot};

use crate::error::{ControllerError, ControllerResult};

/// Header carrying the client-generated request identifier.
pub const HEADER_REQUEST_ID: &str = "x-request-id";

pub(crate) const INFO_PATH: &str = "/api/info";
pub(crate) const DOWNLOAD_PATH: &str = "/api/download";
pub(crate) const CANCEL_PATH: &str = "/api/cancel";
pub(crate) const STATUS_PATH: &str = "/api/status";

/// Operations the controller needs from the backend.
#[async_trait]
pub trait DownloaderApi: Send + Sync {
    /// Fetch metadata for `url` without starting a download.
    async fn info(&self, url: &str) -> ControllerResult<MediaInfo>;
    /// Ask the backend to start a download.
    async fn start_download(&self, request: &DownloadRequest) -> ControllerResult<()>;
    /// Ask the backend to cancel the running download.
    async fn cancel(&self) -> ControllerResult<()>;
    /// Fetch the current status snapshot, bypassing caches.
    async fn status(&self) -> ControllerResult<StatusSnapshot>;
}

#[async_trait]
impl<T: DownloaderApi + ?Sized> DownloaderApi for Arc<T> {
    async fn info(&self, url: &str) -> ControllerResult<MediaInfo> {
        (**self).info(url).await
    }

    async fn start_download(&self, request: &DownloadRequest) -> ControllerResult<()> {
        (**self).start_download(request).await
    }

    async fn cancel(&self) -> ControllerResult<()> {
        (**self).cancel().await
    }

    async fn status(&self) -> ControllerResult<StatusSnapshot> {
        (**self).status().await
    }
}

/// Fetch a status snapshot, giving up with [`ControllerError::Timeout`] once
/// `budget` elapses.
///
/// # Errors
///
/// Returns the client's error or the timeout.
pub async fn status_within<A>(api: &A, budget: Duration) -> ControllerResult<StatusSnapshot>
where
    A: DownloaderApi + ?Sized,
{
    tokio::time::timeout(budget, api.status())
        .await
        .unwrap_or(Err(ControllerError::Timeout {
            endpoint: STATUS_PATH,
            after: budget,
        }))
}

/// `reqwest`-backed client for the backend HTTP API.
#[derive(Clone, Debug)]
pub struct HttpDownloaderApi {
    client: Client,
    base_url: Url,
}

impl HttpDownloaderApi {
    /// Wrap an existing client.
    #[must_use]
    pub const fn new(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    /// Build a client with a global timeout and an `x-request-id` default header.
    ///
    /// # Errors
    ///
    /// Returns an error if the request id is not a valid header value or the
    /// HTTP client cannot be constructed.
    pub fn connect(base_url: Url, timeout: Duration, request_id: &str) -> ControllerResult<Self> {
        let mut default_headers = HeaderMap::new();
        let request_id = HeaderValue::from_str(request_id).map_err(|_| {
            ControllerError::validation("request identifier contains invalid characters")
        })?;
        default_headers.insert(HEADER_REQUEST_ID, request_id);

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(default_headers)
            .build()
            .map_err(|err| ControllerError::Transport {
                endpoint: "client",
                detail: format!("failed to build HTTP client: {err}"),
            })?;
        Ok(Self::new(client, base_url))
    }

    /// Backend base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &'static str) -> ControllerResult<Url> {
        self.base_url
            .join(path)
            .map_err(|err| ControllerError::InvalidUrl(format!("{}: {err}", self.base_url)))
    }
}

#[async_trait]
impl DownloaderApi for HttpDownloaderApi {
    async fn info(&self, url: &str) -> ControllerResult<MediaInfo> {
        let response = self
            .client
            .post(self.endpoint(INFO_PATH)?)
            .json(&InfoRequest {
                url: url.to_string(),
            })
            .send()
            .await
            .map_err(|err| transport(INFO_PATH, &err))?;

        if !response.status().is_success() {
            return Err(classify_problem(INFO_PATH, response).await);
        }
        response
            .json::<MediaInfo>()
            .await
            .map_err(|err| decode(INFO_PATH, &err))
    }

    async fn start_download(&self, request: &DownloadRequest) -> ControllerResult<()> {
        let response = self
            .client
            .post(self.endpoint(DOWNLOAD_PATH)?)
            .json(request)
            .send()
            .await
            .map_err(|err| transport(DOWNLOAD_PATH, &err))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(classify_problem(DOWNLOAD_PATH, response).await)
        }
    }

    async fn cancel(&self) -> ControllerResult<()> {
        let response = self
            .client
            .post(self.endpoint(CANCEL_PATH)?)
            .send()
            .await
            .map_err(|err| transport(CANCEL_PATH, &err))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(classify_problem(CANCEL_PATH, response).await)
        }
    }

    async fn status(&self) -> ControllerResult<StatusSnapshot> {
        let response = self
            .client
            .get(self.endpoint(STATUS_PATH)?)
            .header(CACHE_CONTROL, "no-store")
            .send()
            .await
            .map_err(|err| transport(STATUS_PATH, &err))?;

        if !response.status().is_success() {
            return Err(classify_problem(STATUS_PATH, response).await);
        }
        response
            .json::<StatusSnapshot>()
            .await
            .map_err(|err| decode(STATUS_PATH, &err))
    }
}

fn transport(endpoint: &'static str, err: &reqwest::Error) -> ControllerError {
    if err.is_timeout() {
        ControllerError::Transport {
            endpoint,
            detail: "request timed out".to_string(),
        }
    } else {
        ControllerError::Transport {
            endpoint,
            detail: err.to_string(),
        }
    }
}

fn decode(endpoint: &'static str, err: &reqwest::Error) -> ControllerError {
    ControllerError::Decode {
        endpoint,
        detail: err.to_string(),
    }
}

/// Turn a non-success response into a [`ControllerError::Rejected`], preferring
/// the `error` field of the body, then `message`, then the raw body text.
pub(crate) async fn classify_problem(endpoint: &'static str, response: Response) -> ControllerError {
    let status = response.status();
    let bytes = response.bytes().await.unwrap_or_default();
    let body_text = String::from_utf8_lossy(&bytes).trim().to_string();
    let body = serde_json::from_slice::<ApiErrorBody>(&bytes).ok();

    let message = body
        .and_then(|body| body.error.or(body.message))
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| {
            if body_text.is_empty() || body_text.starts_with('{') {
                format!("request failed with status {status}")
            } else {
                body_text
            }
        });

    ControllerError::Rejected {
        endpoint,
        status: status.as_u16(),
        message,
    }
}
