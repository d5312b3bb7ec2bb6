use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reelsmith_core::{DownloadSink, DownloadSource, SinkError};
use reqwest::Client;
use tracing::debug;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Writes every download into one output directory.
///
/// Upstream links are fetched with the API key attached, since generated
/// video links are only served to authenticated callers.
#[derive(Debug, Clone)]
pub struct FileSystemSink {
    dir: PathBuf,
    client: Client,
    api_key: Option<String>,
}

impl FileSystemSink {
    pub fn new(dir: impl Into<PathBuf>, api_key: Option<String>) -> Self {
        let client = Client::builder()
            .user_agent(concat!("reelsmith/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self {
            dir: dir.into(),
            client,
            api_key,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn fetch(&self, url: &str) -> Result<bytes::Bytes, SinkError> {
        let fetch_err = |e: reqwest::Error| SinkError::Fetch {
            url: url.to_owned(),
            message: e.to_string(),
        };
        let mut request = self.client.get(url);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }
        let resp = request
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(fetch_err)?;
        resp.bytes().await.map_err(fetch_err)
    }
}

#[async_trait]
impl DownloadSink for FileSystemSink {
    async fn emit(&self, filename: &str, source: DownloadSource) -> Result<(), SinkError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let data = match source {
            DownloadSource::Bytes { data, .. } => data,
            DownloadSource::Url(url) => self.fetch(&url).await?,
        };
        let path = self.dir.join(filename);
        tokio::fs::write(&path, &data).await?;
        debug!(path = %path.display(), bytes = data.len(), "file written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn writes_bytes_into_a_fresh_directory() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSystemSink::new(dir.path().join("out"), None);

        sink.emit(
            "duan_001.png",
            DownloadSource::Bytes {
                data: Bytes::from_static(b"png"),
                mime_type: "image/png".to_owned(),
            },
        )
        .await
        .unwrap();

        assert_eq!(std::fs::read(sink.dir().join("duan_001.png")).unwrap(), b"png");
    }

    #[tokio::test]
    async fn fetches_links_with_the_api_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files/clip"))
            .and(header("x-goog-api-key", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"mp4".to_vec()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/files/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let sink = FileSystemSink::new(dir.path(), Some("secret".to_owned()));
        sink.emit("a.mp4", DownloadSource::Url(format!("{}/files/clip", server.uri())))
            .await
            .unwrap();
        assert_eq!(std::fs::read(dir.path().join("a.mp4")).unwrap(), b"mp4");

        let err = sink
            .emit("b.mp4", DownloadSource::Url(format!("{}/files/missing", server.uri())))
            .await
            .unwrap_err();
        assert!(matches!(err, SinkError::Fetch { .. }));
        assert!(!dir.path().join("b.mp4").exists());
    }
}
