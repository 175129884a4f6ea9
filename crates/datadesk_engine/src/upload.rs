use std::time::Duration;

use async_trait::async_trait;
use datadesk_core::upload::{chunk_progress_percent, ChunkReport, UploadStats, UrlImageRow};
use desk_logging::{desk_info, desk_warn};
use futures_util::future::join_all;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::client::{ApiClient, ClientSettings};
use crate::wire::ChunkResponse;
use crate::{ApiError, ErrorClass, FailureKind};

const SS_URL_IMPORT_PATH: &str = "/ss-url/import";

/// Outcome of a single chunk upload after retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadEvent {
    ChunkStarted {
        index: usize,
        rows: usize,
    },
    ChunkRetrying {
        index: usize,
        attempt: u32,
        message: String,
    },
    ChunkCompleted {
        index: usize,
        report: ChunkReport,
        diagnostics: Vec<String>,
    },
    ChunkFailed {
        index: usize,
        message: String,
    },
    Progress {
        completed: usize,
        total: usize,
        percent: u32,
    },
}

pub trait UploadSink: Send + Sync {
    fn emit(&self, event: UploadEvent);
}

/// Sink that only writes events to the log.
pub struct LoggingUploadSink;

impl UploadSink for LoggingUploadSink {
    fn emit(&self, event: UploadEvent) {
        match event {
            UploadEvent::ChunkFailed { index, message } => {
                desk_warn!("Chunk #{} failed: {}", index + 1, message)
            }
            UploadEvent::ChunkRetrying {
                index,
                attempt,
                message,
            } => desk_warn!("Chunk #{} retry {}: {}", index + 1, attempt, message),
            other => desk_info!("{:?}", other),
        }
    }
}

/// Server side of one chunk upload.
#[async_trait]
pub trait ChunkApi: Send + Sync {
    async fn upload_chunk(&self, rows: &[UrlImageRow]) -> Result<ChunkOutcome, ApiError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChunkOutcome {
    pub report: ChunkReport,
    pub diagnostics: Vec<String>,
}

#[derive(Serialize)]
struct RowBody<'a> {
    url: &'a str,
    image: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChunkBody<'a> {
    chunk: Vec<RowBody<'a>>,
    bucket_name: &'a str,
}

/// Posts chunks to the SS-URL import endpoint with the upload timeout.
#[derive(Clone)]
pub struct HttpChunkApi {
    client: ApiClient,
    bucket_name: String,
}

impl HttpChunkApi {
    pub fn new(client: ApiClient, bucket_name: impl Into<String>) -> Self {
        Self {
            client,
            bucket_name: bucket_name.into(),
        }
    }
}

#[async_trait]
impl ChunkApi for HttpChunkApi {
    async fn upload_chunk(&self, rows: &[UrlImageRow]) -> Result<ChunkOutcome, ApiError> {
        let body = ChunkBody {
            chunk: rows
                .iter()
                .map(|row| RowBody {
                    url: &row.url,
                    image: &row.image,
                })
                .collect(),
            bucket_name: &self.bucket_name,
        };
        let response: ChunkResponse = self.client.upload_json(SS_URL_IMPORT_PATH, &body).await?;
        let diagnostics = response.diagnostics();
        Ok(ChunkOutcome {
            report: response.into(),
            diagnostics,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    pub concurrency: usize,
    pub retries: u32,
    pub retry_backoff: Duration,
    pub batch_delay: Duration,
}

impl From<&ClientSettings> for UploadPolicy {
    fn from(settings: &ClientSettings) -> Self {
        Self {
            concurrency: settings.upload_concurrency,
            retries: settings.upload_retries,
            retry_backoff: settings.retry_backoff,
            batch_delay: settings.batch_delay,
        }
    }
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self::from(&ClientSettings::default())
    }
}

/// Result of an upload run. `stats` covers every chunk that finished, also
/// when the run was aborted early.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReport {
    pub stats: UploadStats,
    /// Why the remaining batches were skipped, if they were.
    pub aborted: Option<ApiError>,
}

/// Uploads pre-split chunks in batches of bounded concurrency.
///
/// A chunk that still fails after its retries is counted in
/// `UploadStats::failed_chunks`; its siblings carry on.
pub struct ChunkUploader<C: ChunkApi> {
    api: C,
    policy: UploadPolicy,
    cancel: CancellationToken,
}

impl<C: ChunkApi> ChunkUploader<C> {
    pub fn new(api: C, policy: UploadPolicy) -> Self {
        Self {
            api,
            policy,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that aborts the upload before the next batch starts.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn run(
        &self,
        chunks: &[Vec<UrlImageRow>],
        sink: &dyn UploadSink,
    ) -> UploadReport {
        let total = chunks.len();
        let batch_size = self.policy.concurrency.max(1);
        let mut stats = UploadStats::default();
        let mut completed = 0;

        for (batch_index, batch) in chunks.chunks(batch_size).enumerate() {
            if self.cancel.is_cancelled() {
                desk_warn!("Upload cancelled after {} of {} chunks", completed, total);
                return UploadReport {
                    stats,
                    aborted: Some(ApiError::new(FailureKind::Cancelled, "Upload cancelled")),
                };
            }
            if batch_index > 0 && !self.policy.batch_delay.is_zero() {
                tokio::time::sleep(self.policy.batch_delay).await;
            }

            let first = batch_index * batch_size;
            let uploads = batch
                .iter()
                .enumerate()
                .map(|(offset, rows)| self.upload_with_retry(first + offset, rows, sink));
            let results = join_all(uploads).await;

            let mut auth_failure = None;
            for (offset, result) in results.into_iter().enumerate() {
                let index = first + offset;
                match result {
                    Ok(outcome) => {
                        stats.absorb(&outcome.report);
                        sink.emit(UploadEvent::ChunkCompleted {
                            index,
                            report: outcome.report,
                            diagnostics: outcome.diagnostics,
                        });
                    }
                    Err(err) => {
                        stats.record_failed_chunk();
                        sink.emit(UploadEvent::ChunkFailed {
                            index,
                            message: err.message.clone(),
                        });
                        if err.class() == ErrorClass::Auth {
                            auth_failure = Some(err);
                        }
                    }
                }
                completed += 1;
                sink.emit(UploadEvent::Progress {
                    completed,
                    total,
                    percent: chunk_progress_percent(completed, total),
                });
            }

            // Without a session every remaining chunk would fail the same way.
            if let Some(err) = auth_failure {
                return UploadReport {
                    stats,
                    aborted: Some(err),
                };
            }
        }

        UploadReport {
            stats,
            aborted: None,
        }
    }

    async fn upload_with_retry(
        &self,
        index: usize,
        rows: &[UrlImageRow],
        sink: &dyn UploadSink,
    ) -> Result<ChunkOutcome, ApiError> {
        sink.emit(UploadEvent::ChunkStarted {
            index,
            rows: rows.len(),
        });
        let mut attempt = 0;
        loop {
            match self.api.upload_chunk(rows).await {
                Ok(outcome) => return Ok(outcome),
                Err(err) if err.class() == ErrorClass::Auth || attempt >= self.policy.retries => {
                    return Err(err)
                }
                Err(err) => {
                    attempt += 1;
                    sink.emit(UploadEvent::ChunkRetrying {
                        index,
                        attempt,
                        message: err.message,
                    });
                    tokio::time::sleep(self.policy.retry_backoff).await;
                }
            }
        }
    }
}
