use std::io;
use std::path::PathBuf;

use bytes::Bytes;
use futures_util::{Stream, StreamExt, TryStreamExt, future, stream};
use thiserror::Error;
use tokio_util::io::ReaderStream;

use crate::core::Boundary;
use crate::data::Part;
use crate::effects::http::BoxStream;

/// Failure reading a file part while the body is being streamed.
#[derive(Debug, Error)]
#[error("failed to read '{}': {source}", path.display())]
pub struct BodyError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

#[derive(Debug, Clone)]
enum Segment {
    Bytes(Bytes),
    File(PathBuf),
}

/// A multipart/form-data body whose file parts are read on demand.
///
/// Building only stages the byte layout and file paths. Files are opened
/// when the stream reaches them, read once, in order, and never held in
/// memory as a whole. The stream is single-pass.
#[derive(Debug)]
pub struct StreamingBody {
    boundary: Boundary,
    segments: Vec<Segment>,
}

impl StreamingBody {
    /// Lay out `parts` in order under a fresh random boundary.
    pub fn build(parts: &[Part]) -> Self {
        Self::with_boundary(parts, Boundary::random())
    }

    pub fn with_boundary(parts: &[Part], boundary: Boundary) -> Self {
        let mut segments = Vec::new();
        let mut pending = String::new();

        for part in parts {
            pending.push_str(&boundary.part_head(part));
            match part {
                Part::String { value, .. } => pending.push_str(value),
                Part::File { absolute_path, .. } => {
                    flush(&mut segments, &mut pending);
                    segments.push(Segment::File(absolute_path.clone()));
                }
            }
            pending.push_str(Boundary::part_tail());
        }
        pending.push_str(&boundary.closing());
        flush(&mut segments, &mut pending);

        Self { boundary, segments }
    }

    pub fn boundary(&self) -> &Boundary {
        &self.boundary
    }

    /// `multipart/form-data; boundary=<token>`
    pub fn content_type(&self) -> String {
        self.boundary.content_type()
    }

    /// Exact encoded length, or `None` if some file part cannot be stat-ed
    /// as a regular file. The failure itself is left for the first read.
    pub async fn content_length(&self) -> Option<u64> {
        let mut total = 0u64;
        for segment in &self.segments {
            match segment {
                Segment::Bytes(bytes) => total += bytes.len() as u64,
                Segment::File(path) => {
                    let meta = tokio::fs::metadata(path).await.ok()?;
                    if !meta.is_file() {
                        return None;
                    }
                    total += meta.len();
                }
            }
        }
        Some(total)
    }

    /// Consume the body into its byte stream.
    pub fn into_stream(self) -> BoxStream<'static, Result<Bytes, BodyError>> {
        let streams = self.segments.into_iter().map(
            |segment| -> BoxStream<'static, Result<Bytes, BodyError>> {
                match segment {
                    Segment::Bytes(bytes) => Box::pin(stream::once(future::ready(Ok(bytes)))),
                    Segment::File(path) => Box::pin(file_stream(path)),
                }
            },
        );
        Box::pin(stream::iter(streams).flatten())
    }
}

fn flush(segments: &mut Vec<Segment>, pending: &mut String) {
    if !pending.is_empty() {
        segments.push(Segment::Bytes(Bytes::from(std::mem::take(pending))));
    }
}

fn file_stream(path: PathBuf) -> impl Stream<Item = Result<Bytes, BodyError>> + Send + 'static {
    let open_path = path.clone();
    stream::once(async move { tokio::fs::File::open(open_path).await })
        .map(move |opened| -> BoxStream<'static, Result<Bytes, BodyError>> {
            let path = path.clone();
            match opened {
                Ok(file) => Box::pin(
                    ReaderStream::new(file)
                        .map_err(move |source| BodyError { path: path.clone(), source }),
                ),
                Err(source) => Box::pin(stream::once(future::ready(Err(BodyError { path, source })))),
            }
        })
        .flatten()
}
