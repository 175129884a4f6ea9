//! Datadesk engine: HTTP transport, session, and effect execution for the core state machines.
pub mod admin;
mod api;
mod browser;
mod client;
mod persist;
mod poller;
mod resource;
mod session;
mod types;
mod upload;
mod wire;

pub use api::{HttpJobApi, HttpListApi, JobApi, ListApi};
pub use browser::Browser;
pub use client::{ApiClient, ClientSettings};
pub use persist::{ensure_state_dir, AtomicFileWriter, PersistError};
pub use poller::{ImportPoller, PollHandle};
pub use resource::{
    Dataset, JobEndpoint, JobKind, ListEndpoint, ListLayout, ListMethod, ProgressEnvelope,
    UnknownName,
};
pub use session::{AuthFailureHandler, Session, SessionHandle, User};
pub use types::{ApiError, ErrorClass, FailureKind};
pub use upload::{
    ChunkApi, ChunkOutcome, ChunkUploader, HttpChunkApi, LoggingUploadSink, UploadEvent,
    UploadPolicy, UploadReport, UploadSink,
};
