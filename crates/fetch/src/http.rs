use std::path::Path;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use super::{FetchError, Probe, RemoteSource};

#[derive(Clone, Default)]
pub struct HttpSource {
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

fn is_archive(content_type: &str, url: &str) -> bool {
    matches!(
        content_type,
        "application/zip" | "application/gzip" | "application/x-gzip"
    ) || (content_type == "application/octet-stream"
        && (has_extension(url, ".zip") || has_extension(url, ".gz")))
}

fn has_extension(url: &str, ext: &str) -> bool {
    // ignore any query string or fragment
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.ends_with(ext)
}

#[async_trait]
impl RemoteSource for HttpSource {
    async fn probe(&self, url: &str) -> Result<Probe, FetchError> {
        let resp = self
            .client
            .head(url)
            .send()
            .await
            .map_err(|e| FetchError::Probe {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        if !resp.status().is_success() {
            return Err(FetchError::ProbeStatus {
                status: resp.status().as_u16(),
                url: url.to_string(),
            });
        }
        Ok(Probe {
            content_length: resp.content_length(),
        })
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<(), FetchError> {
        tracing::info!(%url, "beginning download");
        let mut resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Download {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        if !resp.status().is_success() {
            return Err(FetchError::Download {
                url: url.to_string(),
                reason: format!("status {}", resp.status()),
            });
        }
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        if is_archive(&content_type, url) {
            return Err(FetchError::UnsupportedArchive {
                url: url.to_string(),
            });
        }
        let mut file = tokio::fs::File::create(dest).await?;
        let mut downloaded: u64 = 0;
        while let Some(chunk) = resp.chunk().await.map_err(|e| FetchError::Download {
            url: url.to_string(),
            reason: e.to_string(),
        })? {
            downloaded += chunk.len() as u64;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        tracing::info!(%url, dest = %dest.display(), bytes = downloaded, "download complete");
        Ok(())
    }
}
