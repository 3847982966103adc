use std::path::Path;

use async_trait::async_trait;

use super::{FetchError, Probe, RemoteSource};

/// Serves canned bytes for tests, with a configurable advertised length.
#[derive(Clone, Default)]
pub struct MockSource {
    body: Vec<u8>,
    advertise_length: bool,
}

impl MockSource {
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: body.into(),
            advertise_length: true,
        }
    }

    pub fn with_unknown_length(mut self) -> Self {
        self.advertise_length = false;
        self
    }
}

#[async_trait]
impl RemoteSource for MockSource {
    async fn probe(&self, _url: &str) -> Result<Probe, FetchError> {
        Ok(Probe {
            content_length: self.advertise_length.then(|| self.body.len() as u64),
        })
    }

    async fn download(&self, _url: &str, dest: &Path) -> Result<(), FetchError> {
        tokio::fs::write(dest, &self.body).await?;
        Ok(())
    }
}
