use std::future::Future;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, REFERER};
use tokio::time::error::Elapsed;

use crate::{EngineError, UploadSettings};

/// Builds the one client shared by every task of an orchestrator.
///
/// Headers are fixed here; per-request headers (multipart content type) are
/// set on the request, never on the client.
pub fn build_client(settings: &UploadSettings) -> Result<reqwest::Client, EngineError> {
    let referer = HeaderValue::from_str(&settings.referer)
        .map_err(|err| EngineError::InvalidSettings(format!("referer: {err}")))?;
    let mut headers = HeaderMap::new();
    headers.insert(REFERER, referer);

    let mut builder = reqwest::Client::builder()
        .user_agent(settings.user_agent.clone())
        .default_headers(headers)
        .connect_timeout(settings.connect_timeout);

    if let Some(address) = settings.proxy.as_deref() {
        let proxy = reqwest::Proxy::https(proxy_url(address)).map_err(|source| {
            EngineError::InvalidProxy {
                address: address.to_string(),
                source,
            }
        })?;
        builder = builder.proxy(proxy);
    }

    Ok(builder.build()?)
}

/// Bare `host:port` means a plain HTTP proxy tunnelling HTTPS via CONNECT.
fn proxy_url(address: &str) -> String {
    if address.contains("://") {
        address.to_string()
    } else {
        format!("http://{address}")
    }
}

/// Awaits `fut`, bounded by `limit` when one is set.
pub async fn with_timeout<F: Future>(
    limit: Option<Duration>,
    fut: F,
) -> Result<F::Output, Elapsed> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut).await,
        None => Ok(fut.await),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_proxy_address_gets_http_scheme() {
        assert_eq!(proxy_url("10.0.0.1:3128"), "http://10.0.0.1:3128");
        assert_eq!(proxy_url("https://proxy:443"), "https://proxy:443");
    }

    #[test]
    fn client_builds_with_proxy() {
        let settings = UploadSettings {
            proxy: Some("127.0.0.1:8080".into()),
            ..UploadSettings::default()
        };
        assert!(build_client(&settings).is_ok());
    }

    #[tokio::test]
    async fn timeout_is_optional() {
        let value = with_timeout(None, async { 7 }).await.unwrap();
        assert_eq!(value, 7);

        let slow = with_timeout(
            Some(Duration::from_millis(10)),
            tokio::time::sleep(Duration::from_secs(5)),
        )
        .await;
        assert!(slow.is_err());
    }
}
