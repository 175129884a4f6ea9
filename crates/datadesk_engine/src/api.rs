use async_trait::async_trait;
use datadesk_core::{JobSnapshot, PageMode, PageRequest, PageResult};
use serde_json::{Map, Value};

use crate::client::ApiClient;
use crate::resource::{Dataset, JobEndpoint, JobKind, ListEndpoint, ListMethod};
use crate::wire::{decode_page, decode_snapshot, reject_unsuccessful, StartResponse};
use crate::{ApiError, FailureKind};

/// A collection endpoint the browser can page through.
#[async_trait]
pub trait ListApi: Send + Sync {
    fn cursor_supported(&self) -> bool;

    async fn fetch_page(&self, request: &PageRequest) -> Result<PageResult, ApiError>;
}

/// A server-side batch job with start, progress and optional stop endpoints.
#[async_trait]
pub trait JobApi: Send + Sync {
    fn stoppable(&self) -> bool;

    /// Returns the process id when the server issues one.
    async fn start(&self) -> Result<Option<String>, ApiError>;

    async fn progress(&self, process_id: Option<&str>) -> Result<JobSnapshot, ApiError>;

    async fn stop(&self, process_id: Option<&str>) -> Result<(), ApiError>;
}

#[derive(Clone)]
pub struct HttpListApi {
    client: ApiClient,
    endpoint: ListEndpoint,
}

impl HttpListApi {
    pub fn new(client: ApiClient, endpoint: ListEndpoint) -> Self {
        Self { client, endpoint }
    }

    pub fn for_dataset(client: ApiClient, dataset: Dataset) -> Result<Self, ApiError> {
        let endpoint = dataset.list().ok_or_else(|| {
            ApiError::new(
                FailureKind::InvalidUrl,
                format!("{dataset} has no browsable list"),
            )
        })?;
        Ok(Self::new(client, endpoint))
    }

    /// Postcode search takes filters and pagination as a JSON body with
    /// numeric paging fields.
    fn json_body(&self, request: &PageRequest) -> Value {
        let mut body = Map::new();
        for (field, value) in request.filters.active() {
            body.insert(field, Value::String(value));
        }
        body.insert("page".to_string(), Value::from(request.position.page));
        body.insert("limit".to_string(), Value::from(request.position.limit));
        Value::Object(body)
    }
}

#[async_trait]
impl ListApi for HttpListApi {
    fn cursor_supported(&self) -> bool {
        self.endpoint.cursor_supported
    }

    async fn fetch_page(&self, request: &PageRequest) -> Result<PageResult, ApiError> {
        if request.position.mode == PageMode::Cursor && !self.endpoint.cursor_supported {
            return Err(ApiError::new(
                FailureKind::InvalidUrl,
                format!("{} does not support cursor pagination", self.endpoint.path),
            ));
        }
        let body: Value = match self.endpoint.method {
            ListMethod::Get => {
                self.client
                    .get_json(self.endpoint.path, &request.query_pairs())
                    .await?
            }
            ListMethod::PostJson => {
                let body = self.json_body(request);
                self.client.post_json(self.endpoint.path, Some(&body)).await?
            }
        };
        decode_page(self.endpoint.layout, body, &request.position)
    }
}

#[derive(Clone)]
pub struct HttpJobApi {
    client: ApiClient,
    endpoint: JobEndpoint,
    start_body: Option<Value>,
}

impl HttpJobApi {
    pub fn new(client: ApiClient, endpoint: JobEndpoint) -> Self {
        Self {
            client,
            endpoint,
            start_body: None,
        }
    }

    pub fn for_kind(client: ApiClient, kind: JobKind) -> Self {
        Self::new(client, kind.endpoint())
    }

    /// JSON body sent with the start call, e.g. `{"urlColumn": "website"}`.
    pub fn with_start_body(mut self, body: Value) -> Self {
        self.start_body = Some(body);
        self
    }

    fn process_query(&self, process_id: Option<&str>) -> Vec<(String, String)> {
        match process_id {
            Some(id) if self.endpoint.scoped_by_process => {
                vec![("processId".to_string(), id.to_string())]
            }
            _ => Vec::new(),
        }
    }
}

#[async_trait]
impl JobApi for HttpJobApi {
    fn stoppable(&self) -> bool {
        self.endpoint.stop_path.is_some()
    }

    async fn start(&self) -> Result<Option<String>, ApiError> {
        let response: StartResponse = self
            .client
            .post_json(self.endpoint.start_path, self.start_body.as_ref())
            .await?;
        response.into_process_id()
    }

    async fn progress(&self, process_id: Option<&str>) -> Result<JobSnapshot, ApiError> {
        let body: Value = self
            .client
            .get_json(self.endpoint.progress_path, &self.process_query(process_id))
            .await?;
        decode_snapshot(self.endpoint.envelope, body)
    }

    async fn stop(&self, process_id: Option<&str>) -> Result<(), ApiError> {
        let Some(path) = self.endpoint.stop_path else {
            return Err(ApiError::new(
                FailureKind::InvalidUrl,
                "this job has no stop endpoint",
            ));
        };
        let body = match process_id {
            Some(id) if self.endpoint.scoped_by_process => {
                Some(serde_json::json!({ "processId": id }))
            }
            _ => None,
        };
        let response: Value = self.client.post_json(path, body.as_ref()).await?;
        reject_unsuccessful(&response)
    }
}
