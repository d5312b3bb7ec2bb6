//! Session facade: settings, the current task list and one orchestrator.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use reelsmith_core::api::Studio;
//! use reelsmith_core::auth::StaticCredential;
//! use reelsmith_core::gateway::GeminiGateway;
//! use reelsmith_core::settings::AppSettings;
//! # use reelsmith_core::{DownloadSink, Orchestrator};
//! # async fn demo(sink: Arc<dyn DownloadSink>) {
//! let orchestrator = Orchestrator::new(
//!     Arc::new(GeminiGateway::new("api-key")),
//!     Arc::new(StaticCredential::new(Some("api-key"), "set REELSMITH_API_KEY")),
//!     sink,
//! );
//! let mut studio = Studio::new(orchestrator, AppSettings::default());
//! let report = studio
//!     .start("a lighthouse at dusk | waves crash against the rocks")
//!     .await
//!     .unwrap();
//! println!("{}% done", report.summary.progress_percent());
//! # }
//! ```

use tokio::sync::broadcast;
use tracing::info;

use crate::runtime::cancel::CancelToken;
use crate::runtime::orchestrator::{Orchestrator, RunReport};
use crate::runtime::parse::parse_prompts;
use crate::runtime::types::{QueueSummary, RunEvent, RuntimeError, Task};
use crate::settings::AppSettings;

#[derive(Debug)]
pub struct Studio {
    settings: AppSettings,
    tasks: Vec<Task>,
    orchestrator: Orchestrator,
    cancel: CancelToken,
}

impl Studio {
    pub fn new(orchestrator: Orchestrator, settings: AppSettings) -> Self {
        Self {
            settings,
            tasks: Vec::new(),
            orchestrator,
            cancel: CancelToken::new(),
        }
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    /// Settings edits apply to the next run, never to one in progress.
    pub fn settings_mut(&mut self) -> &mut AppSettings {
        &mut self.settings
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn summary(&self) -> QueueSummary {
        QueueSummary::from_tasks(&self.tasks)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.orchestrator.subscribe()
    }

    /// Handle that can stop the run from another task (e.g. a signal handler).
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Request a stop; honoured at the orchestrator's next check-point.
    pub fn stop(&self) {
        info!("stop requested");
        self.cancel.cancel();
    }

    /// Parse `prompt_text` into a fresh task list and run it.
    ///
    /// Without a selected credential the user is prompted and
    /// [`RuntimeError::CredentialRequired`] is returned; nothing is parsed or
    /// run, so the caller starts again once a credential is chosen.
    pub async fn start(&mut self, prompt_text: &str) -> Result<RunReport, RuntimeError> {
        self.ensure_credential().await?;
        self.tasks = parse_prompts(prompt_text, &self.settings)?;
        info!(tasks = self.tasks.len(), "queue created");
        Ok(self.run().await)
    }

    /// Run the current task list again; settled tasks are skipped.
    pub async fn resume(&mut self) -> Result<RunReport, RuntimeError> {
        self.ensure_credential().await?;
        Ok(self.run().await)
    }

    async fn ensure_credential(&self) -> Result<(), RuntimeError> {
        let credentials = self.orchestrator.credentials();
        if credentials.has_selected_credential().await {
            return Ok(());
        }
        credentials.prompt_for_credential_selection().await;
        Err(RuntimeError::CredentialRequired)
    }

    async fn run(&mut self) -> RunReport {
        self.cancel.reset();
        self.orchestrator
            .run(&mut self.tasks, &self.settings, &self.cancel)
            .await
    }
}
