use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::core::is_success;
use crate::data::{FileMetadata, Headers, ResponseMetadata};
use crate::effects::body::{BodyError, StreamingBody};
use crate::effects::http::{HttpClient, TransportError, UploadBody};
use crate::effects::progress::ProgressReporter;
use crate::error::{Error, Result};

/// Runs exactly one HTTP exchange per call and streams it to or from disk.
///
/// No retries. A cancelled or failed download removes whatever it wrote to
/// the destination; a destination that was never opened is left untouched.
pub struct Executor<C: HttpClient> {
    client: Arc<C>,
}

impl<C: HttpClient> Clone for Executor<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
        }
    }
}

impl<C: HttpClient> Executor<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Download `url` into `destination`, creating or truncating it.
    pub(crate) async fn fetch(
        &self,
        url: &Url,
        headers: &Headers,
        destination: &Path,
        progress: ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<FileMetadata> {
        let mut opened = false;
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            result = self.stream_to_file(url, headers, destination, progress, &mut opened) => result,
        };

        if outcome.is_err() && opened {
            remove_partial(destination).await;
        }
        outcome
    }

    async fn stream_to_file(
        &self,
        url: &Url,
        headers: &Headers,
        destination: &Path,
        mut progress: ProgressReporter,
        opened: &mut bool,
    ) -> Result<FileMetadata> {
        progress.connecting();

        let response = self
            .client
            .get(url, headers)
            .await
            .map_err(|e| transport_error(url, &e))?;
        if !is_success(response.status) {
            return Err(Error::HttpStatus {
                status: response.status,
                url: url.to_string(),
            });
        }

        let total = response.content_length();
        let mime_type = response.header("content-type").map(str::to_string);
        let metadata = response.metadata(None);
        progress.set_total(total);
        debug!(url = %url, total = ?total, path = %destination.display(), "streaming response to file");

        let fs_error = |e: io::Error| Error::fs(destination, e);
        let mut file = tokio::fs::File::create(destination).await.map_err(fs_error)?;
        *opened = true;

        let mut body = response.body;
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| transport_error(url, &e))?;
            file.write_all(&chunk).await.map_err(fs_error)?;
            progress.advance(chunk.len() as u64);
        }
        file.flush().await.map_err(fs_error)?;
        file.sync_all().await.map_err(fs_error)?;

        progress.complete();

        Ok(FileMetadata {
            absolute_file_path: destination.to_path_buf(),
            mime_type,
            bytes_written: progress.transferred(),
            response: metadata,
        })
    }

    /// Stream `body` to `url` as a POST.
    pub(crate) async fn upload(
        &self,
        url: &Url,
        headers: &Headers,
        body: StreamingBody,
        return_response: bool,
        progress: ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<ResponseMetadata> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            result = self.stream_body(url, headers, body, return_response, progress) => result,
        }
    }

    async fn stream_body(
        &self,
        url: &Url,
        headers: &Headers,
        body: StreamingBody,
        return_response: bool,
        mut progress: ProgressReporter,
    ) -> Result<ResponseMetadata> {
        progress.connecting();

        let total = body.content_length().await;
        progress.set_total(total);
        let content_type = body.content_type();
        debug!(url = %url, total = ?total, "streaming multipart body");

        // The transport only sees an opaque I/O error; the original file
        // failure is parked here so it surfaces as a filesystem error.
        let failure: Arc<Mutex<Option<BodyError>>> = Arc::default();
        let reporter = Arc::new(Mutex::new(progress));

        let stream = {
            let failure = Arc::clone(&failure);
            let reporter = Arc::clone(&reporter);
            body.into_stream().map(move |item| match item {
                Ok(chunk) => {
                    lock(&reporter).advance(chunk.len() as u64);
                    Ok(chunk)
                }
                Err(err) => {
                    let transport_err = io::Error::new(err.source.kind(), err.to_string());
                    *lock(&failure) = Some(err);
                    Err(transport_err)
                }
            })
        };

        let result = self
            .client
            .post(
                url,
                headers,
                UploadBody {
                    content_type,
                    content_length: total,
                    stream: Box::pin(stream),
                },
            )
            .await;

        let body_failure = lock(&failure).take();
        if let Some(err) = body_failure {
            return Err(Error::fs(err.path, err.source));
        }
        let response = result.map_err(|e| transport_error(url, &e))?;
        if !is_success(response.status) {
            return Err(Error::HttpStatus {
                status: response.status,
                url: url.to_string(),
            });
        }

        let text = return_response.then(|| String::from_utf8_lossy(&response.body).into_owned());
        lock(&reporter).complete();
        Ok(response.metadata(text))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Classify a transport failure, keeping the whole cause chain in the
/// message.
fn transport_error<E: TransportError>(url: &Url, err: &E) -> Error {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }

    if err.is_unreachable() {
        Error::UnreachableHost {
            url: url.to_string(),
            message,
        }
    } else {
        Error::Unexpected(message)
    }
}

async fn remove_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "removed partial download"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove partial download"),
    }
}
