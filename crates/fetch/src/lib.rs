use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

pub mod http;
pub mod mock;

pub use http::HttpSource;
pub use mock::MockSource;

pub const ONE_MEGABYTE: u64 = 1024 * 1024;
/// Downloads past this size, or of unknown size, need explicit confirmation.
pub const DATA_SIZE_WARNING_THRESHOLD: u64 = ONE_MEGABYTE * 1024;

/// What a HEAD request learned about a data URL.
#[derive(Debug, Clone)]
pub struct Probe {
    pub content_length: Option<u64>,
}

impl Probe {
    pub fn needs_confirmation(&self) -> bool {
        match self.content_length {
            None => true,
            Some(len) => len > DATA_SIZE_WARNING_THRESHOLD,
        }
    }

    pub fn size_mb(&self) -> Option<f64> {
        self.content_length.map(|len| len as f64 / ONE_MEGABYTE as f64)
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request failed when checking data file URL: {url}: {reason}")]
    Probe { url: String, reason: String },
    #[error("Received unsuccessful status code {status} when checking data file URL: {url}")]
    ProbeStatus { status: u16, url: String },
    #[error("Error downloading data file: {url}: {reason}")]
    Download { url: String, reason: String },
    #[error("refusing to unpack archive payload from {url}; supply the JSON file directly")]
    UnsupportedArchive { url: String },
    #[error("Error writing downloaded file: {0}")]
    Io(#[from] std::io::Error),
}

/// Where remote data files come from. The HTTP implementation talks to the
/// network; the mock serves canned bytes for tests.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    async fn probe(&self, url: &str) -> Result<Probe, FetchError>;
    async fn download(&self, url: &str, dest: &Path) -> Result<(), FetchError>;
}
