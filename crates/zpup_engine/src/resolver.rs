use std::time::Duration;

use zpup_core::{ErrorKind, UploadError};
use zpup_logging::zpup_debug;

use crate::{extract_server_id, with_timeout, UploadSettings};

#[async_trait::async_trait]
pub trait ServerResolver: Send + Sync {
    /// Identifier of the server that should receive the next upload.
    async fn resolve(&self) -> Result<String, UploadError>;
}

/// Scrapes the upload server out of the host's landing page.
#[derive(Debug, Clone)]
pub struct LandingPageResolver {
    client: reqwest::Client,
    landing_url: String,
    timeout: Option<Duration>,
}

impl LandingPageResolver {
    pub fn new(client: reqwest::Client, settings: &UploadSettings) -> Self {
        Self {
            client,
            landing_url: settings.landing_url.clone(),
            timeout: settings.resolve_timeout,
        }
    }

    async fn fetch_landing_page(&self) -> Result<String, UploadError> {
        let response = self
            .client
            .get(&self.landing_url)
            .send()
            .await
            .map_err(|err| resolution_failed(format!("landing page request: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(resolution_failed(format!("landing page returned {status}")));
        }

        response
            .text()
            .await
            .map_err(|err| resolution_failed(format!("landing page body: {err}")))
    }
}

#[async_trait::async_trait]
impl ServerResolver for LandingPageResolver {
    async fn resolve(&self) -> Result<String, UploadError> {
        let body = with_timeout(self.timeout, self.fetch_landing_page())
            .await
            .map_err(|_| resolution_failed("landing page request timed out"))??;

        let server = extract_server_id(&body)
            .ok_or_else(|| resolution_failed("no server token on landing page"))?;
        zpup_debug!("Resolved upload server {}", server);
        Ok(server)
    }
}

fn resolution_failed(message: impl Into<String>) -> UploadError {
    UploadError::new(ErrorKind::ResolutionFailed, message)
}
