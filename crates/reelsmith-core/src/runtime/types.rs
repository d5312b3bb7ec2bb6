use strum::Display;
use thiserror::Error;

use crate::gateway::GeneratedImage;
use crate::runtime::storage::BlobHandle;

/// Zero-padded ordinal (`"001"`, `"002"`, ...), assigned at parse time.
pub type TaskId = String;

/// Lifecycle state of a [`Task`].
///
/// `Pending` is initial; `Completed`, `Failed` and `Stopped` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    GeneratingImage,
    /// Image is held; cooling down before the video stage.
    WaitingVideo,
    GeneratingVideo,
    Completed,
    Failed,
    Stopped,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Stopped
        )
    }

    /// States in which a stage is running or about to run.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            TaskStatus::GeneratingImage | TaskStatus::WaitingVideo | TaskStatus::GeneratingVideo
        )
    }

    /// Tasks in these states are skipped when a run is re-invoked.
    pub fn is_settled(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

/// One prompt pair's end-to-end generation job.
///
/// Only the orchestrator mutates a task; observers receive clones through
/// [`RunEvent::TaskUpdated`].
#[derive(Debug, Clone)]
pub struct Task {
    pub id: TaskId,
    /// File-name stem, e.g. `duan_001`.
    pub project_name: String,
    pub image_prompt: String,
    pub video_prompt: String,
    pub status: TaskStatus,
    /// Written once by a successful image stage.
    pub image: Option<GeneratedImage>,
    /// Written once by a successful video stage.
    pub video_url: Option<String>,
    /// Human-readable status line, overwritten on every transition.
    pub log: String,
}

impl Task {
    pub fn new(
        ordinal: usize,
        base_name: &str,
        image_prompt: impl Into<String>,
        video_prompt: impl Into<String>,
    ) -> Self {
        let id = format!("{ordinal:03}");
        Self {
            project_name: format!("{base_name}_{id}"),
            id,
            image_prompt: image_prompt.into(),
            video_prompt: video_prompt.into(),
            status: TaskStatus::Pending,
            image: None,
            video_url: None,
            log: String::new(),
        }
    }

    /// `true` once the task holds a non-empty image payload.
    pub fn has_image(&self) -> bool {
        self.image.as_ref().is_some_and(|img| !img.data.is_empty())
    }

    pub fn image_filename(&self) -> String {
        format!("{}.png", self.project_name)
    }

    pub fn video_filename(&self) -> String {
        format!("{}.mp4", self.project_name)
    }
}

/// Where a produced artifact's bytes can be found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactRef {
    /// Locally-owned transient memory, released after download.
    Blob(BlobHandle),
    /// Upstream link; may expire.
    Remote(String),
}

/// Aggregate progress over a task list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueSummary {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub stopped: usize,
    /// Index of the first in-flight task, if any.
    pub active_index: Option<usize>,
}

impl QueueSummary {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let count = |status: TaskStatus| tasks.iter().filter(|t| t.status == status).count();
        Self {
            total: tasks.len(),
            completed: count(TaskStatus::Completed),
            failed: count(TaskStatus::Failed),
            stopped: count(TaskStatus::Stopped),
            active_index: tasks.iter().position(|t| t.status.is_in_flight()),
        }
    }

    /// Completed share of the queue, rounded to the nearest percent.
    pub fn progress_percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        ((self.completed as f64 / self.total as f64) * 100.0).round() as u8
    }
}

/// Notifications published by the orchestrator.
#[derive(Debug, Clone)]
pub enum RunEvent {
    /// A task changed state or log line; carries the new snapshot.
    TaskUpdated { task: Task },
    /// The run ended (exhausted, stopped or halted on an auth failure).
    RunFinished {
        summary: QueueSummary,
        downloads: usize,
        halted_on_auth: bool,
    },
}

/// Errors produced by the runtime layer before a run starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// The submitted prompt text had no non-blank lines.
    #[error("prompt text is empty")]
    EmptyPrompt,

    /// No credential is selected; the user has been asked to pick one.
    #[error("no credential selected; select one and start again")]
    CredentialRequired,
}
