use std::sync::Arc;
use std::time::Duration;

use desk_logging::{desk_debug, desk_warn};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::session::{AuthFailureHandler, SessionHandle};
use crate::{ApiError, FailureKind};

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Timeout for requests carrying upload bodies.
    pub upload_timeout: Duration,
    pub poll_interval: Duration,
    pub stop_grace: Duration,
    pub page_limit: u32,
    pub deep_page_threshold: u32,
    pub chunk_size: usize,
    pub upload_concurrency: usize,
    pub upload_retries: u32,
    pub retry_backoff: Duration,
    pub batch_delay: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/api".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            upload_timeout: Duration::from_secs(5 * 60),
            poll_interval: datadesk_core::DEFAULT_POLL_INTERVAL,
            stop_grace: datadesk_core::DEFAULT_STOP_GRACE,
            page_limit: datadesk_core::DEFAULT_PAGE_LIMIT,
            deep_page_threshold: datadesk_core::DEFAULT_DEEP_PAGE_THRESHOLD,
            chunk_size: datadesk_core::upload::DEFAULT_CHUNK_SIZE,
            upload_concurrency: 5,
            upload_retries: 2,
            retry_backoff: Duration::from_secs(1),
            batch_delay: Duration::from_millis(200),
        }
    }
}

/// JSON-over-HTTP client for the console API.
///
/// Every request carries the session's bearer token. A 401/403 answer clears
/// the session and notifies the auth-failure handler before the error is
/// returned.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: SessionHandle,
    on_auth_failure: Option<Arc<dyn AuthFailureHandler>>,
    settings: Arc<ClientSettings>,
}

impl ApiClient {
    pub fn new(settings: ClientSettings, session: SessionHandle) -> Result<Self, ApiError> {
        Url::parse(&settings.base_url)
            .map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))?;
        let http = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            session,
            on_auth_failure: None,
            settings: Arc::new(settings),
        })
    }

    pub fn with_auth_failure_handler(mut self, handler: Arc<dyn AuthFailureHandler>) -> Self {
        self.on_auth_failure = Some(handler);
        self
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    /// Absolute URL for an API path, with query parameters appended in order.
    pub fn url(&self, path: &str, query: &[(String, String)]) -> Result<Url, ApiError> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<T, ApiError> {
        self.send(Method::GET, path, query, None::<&Value>, None).await
    }

    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ApiError> {
        self.send(Method::POST, path, &[], body, None).await
    }

    /// POST with the long upload timeout instead of the default one.
    pub async fn upload_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let timeout = self.settings.upload_timeout;
        self.send(Method::POST, path, &[], Some(body), Some(timeout))
            .await
    }

    pub async fn delete_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ApiError> {
        self.send(Method::DELETE, path, &[], body, None).await
    }

    async fn send<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&B>,
        timeout: Option<Duration>,
    ) -> Result<T, ApiError> {
        let url = self.url(path, query)?;
        desk_debug!("{} {}", method, url);

        let mut request = self.http.request(method, url);
        if let Some(token) = self.session.token() {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(body) = body {
            let bytes = serde_json::to_vec(body)
                .map_err(|err| ApiError::new(FailureKind::Decode, err.to_string()))?;
            request = request.header(CONTENT_TYPE, "application/json").body(bytes);
        }
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            self.reject_session(status.as_u16());
            return Err(ApiError::new(
                FailureKind::Unauthorized(status.as_u16()),
                server_message(&bytes)
                    .unwrap_or_else(|| "Session expired, please log in again".to_string()),
            ));
        }
        if !status.is_success() {
            return Err(ApiError::new(
                FailureKind::HttpStatus(status.as_u16()),
                server_message(&bytes).unwrap_or_else(|| format!("Request failed: {status}")),
            ));
        }

        serde_json::from_slice(&bytes)
            .map_err(|err| ApiError::new(FailureKind::Decode, err.to_string()))
    }

    fn reject_session(&self, status: u16) {
        desk_warn!("Server rejected session with status {}; clearing it", status);
        self.session.clear();
        if let Some(handler) = &self.on_auth_failure {
            handler.on_auth_failure(status);
        }
    }
}

/// `message` or `error` field of a JSON error body, when present.
pub(crate) fn server_message(bytes: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(bytes).ok()?;
    ["message", "error"]
        .iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
        .filter(|message| !message.trim().is_empty())
        .map(ToOwned::to_owned)
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::new(FailureKind::Timeout, err.to_string());
    }
    ApiError::new(FailureKind::Network, err.to_string())
}
