use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::assets;
use crate::auth::CredentialProvider;
use crate::gateway::{GatewayError, GeneratedVideo, ImageRequest, MediaGateway, VideoRequest};
use crate::runtime::cancel::CancelToken;
use crate::runtime::downloads::{
    multiple_downloads_notice, DownloadBatcher, DownloadSink, BLOB_GRACE, DOWNLOAD_SPACING,
};
use crate::runtime::storage::BlobStore;
use crate::runtime::types::{ArtifactRef, QueueSummary, RunEvent, Task, TaskStatus};
use crate::settings::AppSettings;

const EVENT_CAPACITY: usize = 256;

const STOPPED_LOG: &str = "Stopped. Downloading finished files...";
const IMAGE_AUTH_LOG: &str = "Stopped by a connection error. Please try again.";
const VIDEO_AUTH_LOG: &str = "Permission error while generating video.";
const MISSING_IMAGE_LOG: &str = "Image data is missing.";

/// Fixed intervals of the download phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunTiming {
    pub download_spacing: Duration,
    pub blob_grace: Duration,
}

impl Default for RunTiming {
    fn default() -> Self {
        Self {
            download_spacing: DOWNLOAD_SPACING,
            blob_grace: BLOB_GRACE,
        }
    }
}

/// Outcome of one [`Orchestrator::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub summary: QueueSummary,
    /// Downloads that reached the sink.
    pub downloads: usize,
    /// The run ended because an upstream call was rejected for credentials.
    pub halted_on_auth: bool,
}

enum Flow {
    Next,
    /// Move on without the inter-task delay.
    Skip,
    Stopped,
    AuthHalt,
}

/// Sequential driver of the image → cooldown → video pipeline.
///
/// One task at a time, one stage at a time. The task list is mutated in
/// place and every change is published as [`RunEvent::TaskUpdated`].
#[derive(Clone)]
pub struct Orchestrator {
    gateway: Arc<dyn MediaGateway>,
    credentials: Arc<dyn CredentialProvider>,
    sink: Arc<dyn DownloadSink>,
    store: BlobStore,
    events: broadcast::Sender<RunEvent>,
    timing: RunTiming,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("store", &self.store)
            .field("timing", &self.timing)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    pub fn new(
        gateway: Arc<dyn MediaGateway>,
        credentials: Arc<dyn CredentialProvider>,
        sink: Arc<dyn DownloadSink>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            gateway,
            credentials,
            sink,
            store: BlobStore::new(),
            events,
            timing: RunTiming::default(),
        }
    }

    pub fn with_timing(mut self, timing: RunTiming) -> Self {
        self.timing = timing;
        self
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialProvider> {
        &self.credentials
    }

    pub fn store(&self) -> &BlobStore {
        &self.store
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.events.subscribe()
    }

    fn publish(&self, task: &Task) {
        // No subscribers is fine.
        let _ = self.events.send(RunEvent::TaskUpdated { task: task.clone() });
    }

    fn transition(&self, task: &mut Task, status: TaskStatus, log: impl Into<String>) {
        task.status = status;
        task.log = log.into();
        info!(task_id = %task.id, status = %status, log = %task.log, "task updated");
        self.publish(task);
    }

    /// Process `tasks` in order until the list is exhausted, `cancel` is
    /// observed, or an auth failure halts the queue; then flush downloads.
    ///
    /// Tasks already `COMPLETED` or `FAILED` are skipped, so re-running over
    /// the same list only processes what is left. `settings` is a snapshot
    /// and is never modified.
    pub async fn run(
        &self,
        tasks: &mut [Task],
        settings: &AppSettings,
        cancel: &CancelToken,
    ) -> RunReport {
        let total = tasks.len();
        let mut batcher = DownloadBatcher::new(self.store.clone())
            .with_spacing(self.timing.download_spacing)
            .with_grace(self.timing.blob_grace);
        let mut halted_on_auth = false;

        info!(
            tasks = total,
            engine = settings.engine.model_id(),
            delay_secs = settings.delay_secs,
            "run started"
        );

        for idx in 0..total {
            if cancel.is_cancelled() {
                info!(next_task = idx, "cancellation observed; not starting further tasks");
                break;
            }

            let task = &mut tasks[idx];
            if task.status.is_settled() {
                debug!(task_id = %task.id, status = %task.status, "skipping settled task");
                continue;
            }

            match self.process(task, settings, cancel, &mut batcher).await {
                Flow::Next => {}
                Flow::Skip => continue,
                Flow::Stopped => break,
                Flow::AuthHalt => {
                    halted_on_auth = true;
                    break;
                }
            }

            if idx + 1 < total {
                tokio::time::sleep(settings.delay()).await;
            }
        }

        if batcher.len() > 1 {
            if let Some(last) = tasks.last_mut() {
                last.log = multiple_downloads_notice(batcher.len());
                self.publish(last);
            }
        }
        let downloads = batcher.flush(self.sink.as_ref()).await;

        let summary = QueueSummary::from_tasks(tasks);
        info!(
            completed = summary.completed,
            failed = summary.failed,
            stopped = summary.stopped,
            downloads,
            halted_on_auth,
            "run finished"
        );
        let _ = self.events.send(RunEvent::RunFinished {
            summary,
            downloads,
            halted_on_auth,
        });

        RunReport {
            summary,
            downloads,
            halted_on_auth,
        }
    }

    async fn process(
        &self,
        task: &mut Task,
        settings: &AppSettings,
        cancel: &CancelToken,
        batcher: &mut DownloadBatcher,
    ) -> Flow {
        if !task.has_image() {
            let references = assets::resolve(task, settings);
            let log = match &references.character_name {
                Some(name) => format!("Generating image with {name}..."),
                None => format!("Generating image ({})...", settings.engine.label()),
            };
            self.transition(task, TaskStatus::GeneratingImage, log);

            let request = ImageRequest {
                prompt: task.image_prompt.clone(),
                aspect_ratio: settings.aspect_ratio,
                engine: settings.engine,
                references: references.images,
            };
            match self.gateway.generate_image(request).await {
                Ok(image) if image.data.is_empty() => {
                    warn!(task_id = %task.id, stage = "image", "empty image payload");
                    self.transition(task, TaskStatus::Failed, MISSING_IMAGE_LOG);
                    return Flow::Skip;
                }
                Ok(image) => {
                    let handle = self
                        .store
                        .create(image.data.clone(), image.mime_type.clone())
                        .await;
                    batcher.push(ArtifactRef::Blob(handle), task.image_filename());
                    task.image = Some(image);
                    self.transition(
                        task,
                        TaskStatus::WaitingVideo,
                        format!("Image done. Waiting {}s...", settings.delay_secs),
                    );
                    tokio::time::sleep(settings.delay()).await;
                }
                Err(err) if err.is_auth() => {
                    error!(task_id = %task.id, stage = "image", error = %err, "auth failure; halting queue");
                    cancel.cancel();
                    self.credentials.prompt_for_credential_selection().await;
                    self.transition(task, TaskStatus::Pending, IMAGE_AUTH_LOG);
                    return Flow::AuthHalt;
                }
                Err(err) => {
                    warn!(task_id = %task.id, stage = "image", error = %err, "image generation failed");
                    self.transition(task, TaskStatus::Failed, format!("Image error: {err}"));
                    return Flow::Skip;
                }
            }
        }

        if cancel.is_cancelled() {
            self.transition(task, TaskStatus::Stopped, STOPPED_LOG);
            return Flow::Stopped;
        }

        let Some(image) = task.image.clone().filter(|img| !img.data.is_empty()) else {
            warn!(task_id = %task.id, "no image payload; skipping video stage");
            self.transition(task, TaskStatus::Failed, MISSING_IMAGE_LOG);
            return Flow::Next;
        };

        self.transition(task, TaskStatus::GeneratingVideo, "Generating video motion...");
        let request = VideoRequest {
            prompt: task.video_prompt.clone(),
            image,
            resolution: settings.resolution,
            aspect_ratio: settings.aspect_ratio,
        };
        match self.gateway.generate_video(request).await {
            Ok(video) => {
                let uri = video.uri().to_owned();
                let artifact = match video {
                    GeneratedVideo::Fetched {
                        data, mime_type, ..
                    } => ArtifactRef::Blob(self.store.create(data, mime_type).await),
                    GeneratedVideo::Remote { uri } => ArtifactRef::Remote(uri),
                };
                batcher.push(artifact, task.video_filename());
                task.video_url = Some(uri);
                self.transition(task, TaskStatus::Completed, "Done");
                Flow::Next
            }
            Err(GatewayError::Auth(msg)) => {
                error!(task_id = %task.id, stage = "video", error = %msg, "auth failure; halting queue");
                cancel.cancel();
                self.credentials.prompt_for_credential_selection().await;
                self.transition(task, TaskStatus::Failed, VIDEO_AUTH_LOG);
                Flow::AuthHalt
            }
            Err(err) => {
                warn!(task_id = %task.id, stage = "video", error = %err, "video generation failed");
                self.transition(task, TaskStatus::Failed, format!("Video error: {err}"));
                Flow::Next
            }
        }
    }
}
