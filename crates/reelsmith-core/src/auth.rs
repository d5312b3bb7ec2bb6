//! Credential collaborator consulted before a run and after auth failures.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tracing::warn;

#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn has_selected_credential(&self) -> bool;

    /// Ask the user to pick (or re-pick) a credential. Returns once the
    /// request has been surfaced, not once a credential is chosen.
    async fn prompt_for_credential_selection(&self);
}

/// Credential fixed at start-up, e.g. an API key read from the environment.
///
/// Prompting cannot change the key, so it only logs instructions and counts
/// how often it was asked.
#[derive(Debug, Clone, Default)]
pub struct StaticCredential {
    present: Arc<AtomicBool>,
    prompts: Arc<AtomicUsize>,
    hint: String,
}

impl StaticCredential {
    pub fn new(api_key: Option<&str>, hint: impl Into<String>) -> Self {
        let present = api_key.is_some_and(|k| !k.trim().is_empty());
        Self {
            present: Arc::new(AtomicBool::new(present)),
            prompts: Arc::new(AtomicUsize::new(0)),
            hint: hint.into(),
        }
    }

    /// Mark the credential as rejected upstream.
    pub fn revoke(&self) {
        self.present.store(false, Ordering::SeqCst);
    }

    pub fn prompt_count(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialProvider for StaticCredential {
    async fn has_selected_credential(&self) -> bool {
        self.present.load(Ordering::SeqCst)
    }

    async fn prompt_for_credential_selection(&self) {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        warn!(hint = %self.hint, "a valid credential is required");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn blank_key_is_not_a_credential() {
        assert!(!StaticCredential::new(None, "").has_selected_credential().await);
        assert!(!StaticCredential::new(Some("  "), "").has_selected_credential().await);

        let cred = StaticCredential::new(Some("key"), "set REELSMITH_API_KEY");
        assert!(cred.has_selected_credential().await);
        cred.prompt_for_credential_selection().await;
        assert_eq!(cred.prompt_count(), 1);

        cred.revoke();
        assert!(!cred.has_selected_credential().await);
    }
}
