mod runtime;

pub mod api;
pub mod assets;
pub mod auth;
pub mod gateway;
pub mod settings;

pub use runtime::cancel::CancelToken;
pub use runtime::downloads::{
    DownloadBatcher, DownloadSink, DownloadSource, PendingDownload, SinkError,
};
pub use runtime::orchestrator::{Orchestrator, RunReport, RunTiming};
pub use runtime::parse::{parse_prompts, PROMPT_TEMPLATES};
pub use runtime::storage::{BlobHandle, BlobStore};
pub use runtime::types::{
    ArtifactRef, QueueSummary, RunEvent, RuntimeError, Task, TaskId, TaskStatus,
};
