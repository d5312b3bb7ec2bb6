//! Media generation gateway: the two upstream calls a task depends on.
//!
//! The orchestrator only sees [`MediaGateway`]; [`gemini::GeminiGateway`] is
//! the HTTP implementation. Any failure message is classified with
//! [`GatewayError::classify`], which is the single place that decides whether
//! a failure is an auth failure (halts the run) or a per-task failure.

pub mod gemini;

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::assets::ReferenceImage;
use crate::settings::{AspectRatio, ImageEngine, Resolution};

pub use gemini::GeminiGateway;

/// Substrings that mark a failure message as an auth/permission failure.
pub const AUTH_FAILURE_MARKERS: &[&str] = &["403", "PERMISSION_DENIED", "permission"];

/// Motion prompt used when a task has no video prompt.
pub const DEFAULT_VIDEO_PROMPT: &str = "Animate this image naturally";

/// Appended to image prompts that carry reference images.
pub const REFERENCE_INSTRUCTION: &str = "(Use the attached images as strict visual references for character consistency and environment style)";

/// Pause between video operation status queries.
pub const VIDEO_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// Missing, expired or insufficient credential.
    #[error("permission denied: {0}")]
    Auth(String),

    /// The call completed without a usable payload, or the operation failed.
    #[error("{0}")]
    Generation(String),

    /// A best-effort network step failed; callers fall back instead of failing.
    #[error("transport error: {0}")]
    Transport(String),
}

impl GatewayError {
    /// Auth if `message` contains any of [`AUTH_FAILURE_MARKERS`], otherwise a
    /// generation failure.
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        if is_auth_failure(&message) {
            GatewayError::Auth(message)
        } else {
            GatewayError::Generation(message)
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, GatewayError::Auth(_))
    }
}

pub fn is_auth_failure(message: &str) -> bool {
    AUTH_FAILURE_MARKERS
        .iter()
        .any(|marker| message.contains(marker))
}

/// Image payload returned by the image stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub data: Bytes,
    pub mime_type: String,
}

#[derive(Debug, Clone)]
pub struct ImageRequest {
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
    pub engine: ImageEngine,
    pub references: Vec<ReferenceImage>,
}

impl ImageRequest {
    /// Prompt text as sent upstream, with the reference instruction appended
    /// when references are attached.
    pub fn effective_prompt(&self) -> String {
        if self.references.is_empty() {
            self.prompt.clone()
        } else {
            format!("{} . {}", self.prompt, REFERENCE_INSTRUCTION)
        }
    }
}

#[derive(Debug, Clone)]
pub struct VideoRequest {
    pub prompt: String,
    pub image: GeneratedImage,
    pub resolution: Resolution,
    pub aspect_ratio: AspectRatio,
}

impl VideoRequest {
    pub fn effective_prompt(&self) -> &str {
        let prompt = self.prompt.trim();
        if prompt.is_empty() {
            DEFAULT_VIDEO_PROMPT
        } else {
            prompt
        }
    }
}

/// Result of the video stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratedVideo {
    /// Bytes were fetched eagerly; `uri` is kept for display.
    Fetched {
        uri: String,
        data: Bytes,
        mime_type: String,
    },
    /// The eager fetch failed; only the upstream reference is available and
    /// it may stop working once the upstream link expires.
    Remote { uri: String },
}

impl GeneratedVideo {
    pub fn uri(&self) -> &str {
        match self {
            GeneratedVideo::Fetched { uri, .. } | GeneratedVideo::Remote { uri } => uri,
        }
    }
}

#[async_trait]
pub trait MediaGateway: Send + Sync {
    async fn generate_image(&self, request: ImageRequest) -> Result<GeneratedImage, GatewayError>;

    /// Submit an image-conditioned video job and poll until it finishes.
    ///
    /// There is no upper bound on polling; a stuck upstream operation stalls
    /// the caller.
    async fn generate_video(&self, request: VideoRequest) -> Result<GeneratedVideo, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_uses_markers() {
        assert!(GatewayError::classify("HTTP 403 Forbidden").is_auth());
        assert!(GatewayError::classify("status: PERMISSION_DENIED").is_auth());
        assert!(GatewayError::classify("caller lacks permission").is_auth());
        assert!(!GatewayError::classify("No image data found in response").is_auth());
        assert!(!GatewayError::classify("HTTP 500 Internal").is_auth());
    }

    #[test]
    fn reference_instruction_only_with_references() {
        let mut request = ImageRequest {
            prompt: "a cat".to_owned(),
            aspect_ratio: AspectRatio::Square,
            engine: ImageEngine::Flash,
            references: Vec::new(),
        };
        assert_eq!(request.effective_prompt(), "a cat");

        request.references.push(ReferenceImage {
            mime_type: "image/png".to_owned(),
            data: Bytes::from_static(b"ref"),
        });
        let prompt = request.effective_prompt();
        assert!(prompt.starts_with("a cat . "));
        assert!(prompt.ends_with(REFERENCE_INSTRUCTION));
    }

    #[test]
    fn empty_video_prompt_uses_default() {
        let request = VideoRequest {
            prompt: "  ".to_owned(),
            image: GeneratedImage {
                data: Bytes::from_static(b"img"),
                mime_type: "image/png".to_owned(),
            },
            resolution: Resolution::Hd,
            aspect_ratio: AspectRatio::Landscape,
        };
        assert_eq!(request.effective_prompt(), DEFAULT_VIDEO_PROMPT);
    }
}
