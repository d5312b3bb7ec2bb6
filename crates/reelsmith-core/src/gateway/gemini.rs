//! Gemini image generation and Veo image-to-video over the REST API.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::{
    GatewayError, GeneratedImage, GeneratedVideo, ImageRequest, MediaGateway, VideoRequest,
    VIDEO_POLL_INTERVAL,
};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Fast Veo model used for bulk image-to-video work.
pub const DEFAULT_VIDEO_MODEL: &str = "veo-3.1-fast-generate-preview";

const API_KEY_HEADER: &str = "x-goog-api-key";

/// HTTP-backed [`MediaGateway`].
///
/// ```rust,no_run
/// # use std::time::Duration;
/// use reelsmith_core::gateway::GeminiGateway;
///
/// let gateway = GeminiGateway::new("api-key")
///     .with_poll_interval(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct GeminiGateway {
    client: Client,
    base_url: String,
    api_key: String,
    video_model: String,
    poll_interval: Duration,
}

impl GeminiGateway {
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = Client::builder()
            .user_agent(concat!("reelsmith/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_owned(),
            api_key: api_key.into(),
            video_model: DEFAULT_VIDEO_MODEL.to_owned(),
            poll_interval: VIDEO_POLL_INTERVAL,
        }
    }

    /// Override the API root (default: [`DEFAULT_BASE_URL`]).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    pub fn with_video_model(mut self, model: impl Into<String>) -> Self {
        self.video_model = model.into();
        self
    }

    /// Override the video status poll interval (default: 5 s).
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, GatewayError> {
        let resp = self
            .client
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| GatewayError::classify(e.to_string()))?;
        read_json(resp).await
    }

    async fn get_json(&self, url: &str) -> Result<Value, GatewayError> {
        let resp = self
            .client
            .get(url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| GatewayError::classify(e.to_string()))?;
        read_json(resp).await
    }

    /// Download the bytes behind a finished video so the result no longer
    /// depends on the upstream link.
    async fn fetch_video(&self, uri: &str) -> Result<(Bytes, String), GatewayError> {
        let resp = self
            .client
            .get(uri)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let mime_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("video/mp4")
            .to_owned();
        let data = resp
            .bytes()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Ok((data, mime_type))
    }
}

async fn read_json(resp: reqwest::Response) -> Result<Value, GatewayError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(GatewayError::classify(format!("HTTP {status}: {body}")));
    }
    resp.json::<Value>()
        .await
        .map_err(|e| GatewayError::Generation(format!("invalid response body: {e}")))
}

// ── Wire types ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: Option<String>,
    #[serde(default)]
    data: String,
}

#[derive(Debug, Deserialize)]
struct Operation {
    name: String,
    #[serde(default)]
    done: bool,
    error: Option<OperationError>,
    response: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct OperationError {
    #[serde(default)]
    message: String,
}

impl Operation {
    fn from_value(value: Value) -> Result<Self, GatewayError> {
        serde_json::from_value(value)
            .map_err(|e| GatewayError::Generation(format!("malformed operation: {e}")))
    }

    fn video_uri(&self) -> Option<&str> {
        let response = self.response.as_ref()?;
        response
            .pointer("/generateVideoResponse/generatedSamples/0/video/uri")
            .or_else(|| response.pointer("/generatedVideos/0/video/uri"))
            .and_then(Value::as_str)
            .filter(|uri| !uri.is_empty())
    }
}

fn image_from_response(value: Value) -> Result<GeneratedImage, GatewayError> {
    let parsed: GenerateContentResponse = serde_json::from_value(value)
        .map_err(|e| GatewayError::Generation(format!("invalid response body: {e}")))?;

    let parts = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts)
        .filter(|parts| !parts.is_empty())
        .ok_or_else(|| GatewayError::Generation("No content generated".to_owned()))?;

    for inline in parts.into_iter().filter_map(|p| p.inline_data) {
        if inline.data.is_empty() {
            continue;
        }
        let data = STANDARD
            .decode(inline.data.as_bytes())
            .map_err(|e| GatewayError::Generation(format!("invalid image payload: {e}")))?;
        return Ok(GeneratedImage {
            data: Bytes::from(data),
            mime_type: inline.mime_type.unwrap_or_else(|| "image/png".to_owned()),
        });
    }

    Err(GatewayError::Generation(
        "No image data found in response".to_owned(),
    ))
}

#[async_trait]
impl MediaGateway for GeminiGateway {
    async fn generate_image(&self, request: ImageRequest) -> Result<GeneratedImage, GatewayError> {
        let mut parts: Vec<Value> = request
            .references
            .iter()
            .map(|r| {
                json!({
                    "inlineData": {
                        "mimeType": r.mime_type,
                        "data": STANDARD.encode(&r.data),
                    }
                })
            })
            .collect();
        parts.push(json!({ "text": request.effective_prompt() }));

        let mut image_config = json!({ "aspectRatio": request.aspect_ratio.to_string() });
        if let Some(size) = request.engine.image_size() {
            image_config["imageSize"] = json!(size);
        }

        let body = json!({
            "contents": [{ "parts": parts }],
            "generationConfig": { "imageConfig": image_config },
        });

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url,
            request.engine.model_id()
        );
        debug!(model = request.engine.model_id(), references = request.references.len(), "image request");

        let image = image_from_response(self.post_json(&url, &body).await?)?;
        info!(bytes = image.data.len(), mime = %image.mime_type, "image generated");
        Ok(image)
    }

    async fn generate_video(&self, request: VideoRequest) -> Result<GeneratedVideo, GatewayError> {
        let body = json!({
            "instances": [{
                "prompt": request.effective_prompt(),
                "image": {
                    "bytesBase64Encoded": STANDARD.encode(&request.image.data),
                    "mimeType": request.image.mime_type,
                },
            }],
            "parameters": {
                "sampleCount": 1,
                "resolution": request.resolution.to_string(),
                "aspectRatio": request.aspect_ratio.to_string(),
            },
        });

        let url = format!(
            "{}/v1beta/models/{}:predictLongRunning",
            self.base_url, self.video_model
        );
        let mut operation = Operation::from_value(self.post_json(&url, &body).await?)?;
        info!(operation = %operation.name, "video operation started");

        let mut polls = 0u32;
        while !operation.done {
            tokio::time::sleep(self.poll_interval).await;
            polls += 1;
            let status_url = format!("{}/v1beta/{}", self.base_url, operation.name);
            operation = Operation::from_value(self.get_json(&status_url).await?)?;
            debug!(operation = %operation.name, polls, done = operation.done, "video operation polled");
        }

        if let Some(error) = &operation.error {
            return Err(GatewayError::classify(format!(
                "Video generation failed: {}",
                error.message
            )));
        }

        let uri = operation
            .video_uri()
            .ok_or_else(|| GatewayError::Generation("No video URI returned".to_owned()))?
            .to_owned();

        match self.fetch_video(&uri).await {
            Ok((data, mime_type)) => {
                info!(bytes = data.len(), polls, "video generated and fetched");
                Ok(GeneratedVideo::Fetched {
                    uri,
                    data,
                    mime_type,
                })
            }
            Err(e) => {
                warn!(error = %e, "direct video fetch failed; keeping upstream link");
                Ok(GeneratedVideo::Remote { uri })
            }
        }
    }
}
