use std::io;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use futures_util::Stream;
use reqwest::multipart::{Form, Part};
use tokio_util::io::ReaderStream;
use zpup_core::{display_name, ErrorKind, UploadError};
use zpup_logging::{zpup_debug, zpup_trace};

use crate::{with_timeout, ShareLinkScraper, UploadSettings};

/// Bytes read from disk per body chunk, and so per progress report.
pub const BODY_CHUNK_SIZE: usize = 64 * 1024;

/// Receives the running count of body bytes handed to the connection.
pub type ByteProgress = Arc<dyn Fn(u64) + Send + Sync>;

#[async_trait::async_trait]
pub trait UploadTransport: Send + Sync {
    /// Uploads `path` to `server` and returns the share URL.
    async fn upload(
        &self,
        path: &Path,
        server: &str,
        progress: ByteProgress,
    ) -> Result<String, UploadError>;
}

/// Streams a file as `multipart/form-data` and scrapes the share link from the reply.
#[derive(Debug, Clone)]
pub struct MultipartTransport {
    client: reqwest::Client,
    settings: UploadSettings,
    timeout: Option<Duration>,
    scraper: ShareLinkScraper,
}

impl MultipartTransport {
    pub fn new(client: reqwest::Client, settings: &UploadSettings) -> Self {
        Self {
            client,
            settings: settings.clone(),
            timeout: settings.request_timeout,
            scraper: ShareLinkScraper::new(&settings.share_host),
        }
    }

    async fn build_form(&self, path: &Path, progress: ByteProgress) -> Result<Form, UploadError> {
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|err| unreadable(path, err))?;
        let size = file
            .metadata()
            .await
            .map_err(|err| unreadable(path, err))?
            .len();

        let name = display_name(path);
        let mime = mime_guess::from_path(path).first_or_octet_stream();
        let chunks = ReaderStream::with_capacity(file, BODY_CHUNK_SIZE);
        let stream = ProgressStream::new(chunks, progress);
        let body = reqwest::Body::wrap_stream(stream);
        let part = Part::stream_with_length(body, size)
            .file_name(name.clone())
            .mime_str(mime.as_ref())
            .map_err(|err| transport_error(format!("content type {mime}: {err}")))?;

        Ok(Form::new().text("name", name).part("file", part))
    }

    async fn post(&self, url: reqwest::Url, form: Form) -> Result<String, UploadError> {
        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|err| transport_error(format!("upload request: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(transport_error(format!("upload returned {status}")));
        }

        response
            .text()
            .await
            .map_err(|err| transport_error(format!("upload response body: {err}")))
    }
}

#[async_trait::async_trait]
impl UploadTransport for MultipartTransport {
    async fn upload(
        &self,
        path: &Path,
        server: &str,
        progress: ByteProgress,
    ) -> Result<String, UploadError> {
        let target = self.settings.upload_url(server);
        let url = reqwest::Url::parse(&target)
            .map_err(|err| transport_error(format!("upload url {target:?}: {err}")))?;

        let form = self.build_form(path, progress).await?;
        zpup_debug!("Posting {} to {}", path.display(), url);

        let html = with_timeout(self.timeout, self.post(url, form))
            .await
            .map_err(|_| transport_error("upload timed out"))??;

        self.scraper.extract(&html).ok_or_else(|| {
            UploadError::new(
                ErrorKind::ParseError,
                format!("no share link in {} byte response", html.len()),
            )
        })
    }
}

/// Reports a chunk as sent once the body asks for the next one, i.e. after the
/// connection has taken it, and the final chunk at end of stream.
struct ProgressStream<S> {
    inner: S,
    progress: ByteProgress,
    sent: u64,
    handed_out: u64,
}

impl<S> ProgressStream<S> {
    fn new(inner: S, progress: ByteProgress) -> Self {
        Self {
            inner,
            progress,
            sent: 0,
            handed_out: 0,
        }
    }

    fn settle(&mut self) {
        if self.handed_out > 0 {
            self.sent += self.handed_out;
            self.handed_out = 0;
            (self.progress)(self.sent);
        }
    }
}

impl<S> Stream for ProgressStream<S>
where
    S: Stream<Item = io::Result<Bytes>> + Unpin,
{
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.settle();
        let polled = Pin::new(&mut self.inner).poll_next(cx);
        match &polled {
            Poll::Ready(Some(Ok(chunk))) => {
                zpup_trace!("body chunk of {} bytes", chunk.len());
                self.handed_out = chunk.len() as u64;
            }
            Poll::Ready(None) => self.settle(),
            _ => {}
        }
        polled
    }
}

fn transport_error(message: impl Into<String>) -> UploadError {
    UploadError::new(ErrorKind::TransportError, message)
}

fn unreadable(path: &Path, err: io::Error) -> UploadError {
    UploadError::new(
        ErrorKind::FileUnreadable,
        format!("{}: {err}", path.display()),
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use futures_util::{stream, StreamExt};

    use super::*;

    #[tokio::test]
    async fn progress_trails_the_chunk_being_written() {
        let seen = Arc::new(Mutex::new(Vec::<u64>::new()));
        let sink = seen.clone();
        let chunks = stream::iter(vec![
            Ok::<_, io::Error>(Bytes::from_static(b"abc")),
            Ok(Bytes::from_static(b"de")),
            Ok(Bytes::from_static(b"f")),
        ]);
        let mut body = ProgressStream::new(
            chunks,
            Arc::new(move |sent: u64| sink.lock().unwrap().push(sent)),
        );

        assert_eq!(body.next().await.unwrap().unwrap(), Bytes::from_static(b"abc"));
        assert!(seen.lock().unwrap().is_empty());
        body.next().await.unwrap().unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![3]);
        body.next().await.unwrap().unwrap();
        assert!(body.next().await.is_none());
        assert_eq!(*seen.lock().unwrap(), vec![3, 5, 6]);
    }
}
