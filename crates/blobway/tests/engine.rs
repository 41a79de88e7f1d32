//! End-to-end engine behavior against an in-process mock client.
//!
//! Covers the full request lifecycle: validation, destination resolution,
//! streaming, progress, cancellation and result mapping.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use blobway::{
    ErrorKind, FixedRoots, Headers, HttpClient, HttpResponse, ProgressEvent, RawRequest,
    ResponseStream, ResultDocument, TransferEngine, TransferOptions, TransferPhase,
    TransferResult, TransferSuccess, TransportError, UploadBody,
};
use bytes::Bytes;
use futures_util::{StreamExt, stream};
use serde_json::{Value, json};
use tempfile::TempDir;
use url::Url;

#[derive(Debug)]
struct MockError {
    message: String,
    unreachable: bool,
}

impl std::fmt::Display for MockError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for MockError {}

impl TransportError for MockError {
    fn is_unreachable(&self) -> bool {
        self.unreachable
    }
}

/// What the mock saw of one upload.
#[derive(Debug, Clone)]
struct Captured {
    content_type: String,
    content_length: Option<u64>,
    body: Vec<u8>,
}

/// Call log shared between a mock client and the test holding it.
#[derive(Debug, Default)]
struct Recorder {
    calls: AtomicUsize,
    captured: Mutex<Option<Captured>>,
}

/// Mock HTTP client serving a fixed response.
#[derive(Debug)]
struct MockClient {
    status: u16,
    headers: Vec<(String, String)>,
    chunks: Vec<Bytes>,
    chunk_delay: Duration,
    fail_after: Option<usize>,
    read_delay: Duration,
    reply: Bytes,
    unreachable: bool,
    recorder: Arc<Recorder>,
}

impl MockClient {
    fn serving(data: &[u8], chunk_size: usize) -> Self {
        Self {
            status: 200,
            headers: vec![("content-length".into(), data.len().to_string())],
            chunks: data.chunks(chunk_size).map(Bytes::copy_from_slice).collect(),
            chunk_delay: Duration::ZERO,
            fail_after: None,
            read_delay: Duration::ZERO,
            reply: Bytes::new(),
            unreachable: false,
            recorder: Arc::default(),
        }
    }

    fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    fn chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    /// Break the response body with a reset after `n` chunks.
    fn fail_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    /// Pause between upload body chunks.
    fn read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = delay;
        self
    }

    fn reply(mut self, body: &str) -> Self {
        self.reply = Bytes::copy_from_slice(body.as_bytes());
        self
    }

    fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    fn connect(&self) -> Result<(), MockError> {
        self.recorder.calls.fetch_add(1, Ordering::SeqCst);
        if self.unreachable {
            return Err(MockError {
                message: "dns error: no such host".into(),
                unreachable: true,
            });
        }
        Ok(())
    }
}

impl HttpClient for MockClient {
    type Error = MockError;

    async fn get(
        &self,
        _url: &Url,
        _headers: &Headers,
    ) -> Result<HttpResponse<ResponseStream<MockError>>, MockError> {
        self.connect()?;
        let delay = self.chunk_delay;
        let fail_after = self.fail_after;
        let body: ResponseStream<MockError> = Box::pin(
            stream::iter(self.chunks.clone().into_iter().enumerate()).then(
                move |(i, chunk)| async move {
                    tokio::time::sleep(delay).await;
                    match fail_after {
                        Some(n) if i >= n => Err(MockError {
                            message: "connection reset by peer".into(),
                            unreachable: false,
                        }),
                        _ => Ok(chunk),
                    }
                },
            ),
        );
        Ok(HttpResponse {
            status: self.status,
            headers: self.headers.clone(),
            body,
        })
    }

    async fn post(
        &self,
        _url: &Url,
        _headers: &Headers,
        mut body: UploadBody,
    ) -> Result<HttpResponse<Bytes>, MockError> {
        self.connect()?;
        let mut received = Vec::new();
        while let Some(chunk) = body.stream.next().await {
            let chunk = chunk.map_err(|e| MockError {
                message: format!("body stream: {e}"),
                unreachable: false,
            })?;
            received.extend_from_slice(&chunk);
            tokio::time::sleep(self.read_delay).await;
        }
        *self.recorder.captured.lock().unwrap() = Some(Captured {
            content_type: body.content_type,
            content_length: body.content_length,
            body: received,
        });
        Ok(HttpResponse {
            status: self.status,
            headers: vec![("content-type".into(), "text/plain".into())],
            body: self.reply.clone(),
        })
    }
}

struct Harness {
    engine: TransferEngine<MockClient>,
    recorder: Arc<Recorder>,
    events: Arc<Mutex<Vec<ProgressEvent>>>,
    cache: TempDir,
    _data: TempDir,
}

impl Harness {
    fn new(client: MockClient) -> Self {
        let cache = tempfile::tempdir().unwrap();
        let data = tempfile::tempdir().unwrap();
        let recorder = Arc::clone(&client.recorder);
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let options = TransferOptions::default()
            .progress_interval(Duration::ZERO)
            .on_progress(Arc::new(move |event: &ProgressEvent| {
                sink.lock().unwrap().push(event.clone());
            }));
        let engine = TransferEngine::new(
            client,
            Arc::new(FixedRoots::new(cache.path(), data.path())),
        )
        .with_options(options);
        Self {
            engine,
            recorder,
            events,
            cache,
            _data: data,
        }
    }

    fn calls(&self) -> usize {
        self.recorder.calls.load(Ordering::SeqCst)
    }

    fn events_for(&self, task_id: &str) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.task_id == task_id)
            .cloned()
            .collect()
    }

    fn cached(&self, name: &str) -> std::path::PathBuf {
        self.cache.path().canonicalize().unwrap().join(name)
    }
}

fn request(value: Value) -> RawRequest {
    RawRequest::from_value(value).unwrap()
}

fn fetch(task_id: &str, filename: &str) -> RawRequest {
    request(json!({
        "direction": "fetch",
        "taskId": task_id,
        "url": "https://example.test/blob",
        "filename": filename,
    }))
}

fn assert_monotonic(events: &[ProgressEvent]) {
    for pair in events.windows(2) {
        assert!(
            pair[0].bytes_transferred <= pair[1].bytes_transferred,
            "progress went backwards: {pair:?}"
        );
    }
}

#[tokio::test]
async fn fetch_streams_to_cache_and_reports_full_progress() {
    let data = vec![7_u8; 1024];
    let h = Harness::new(MockClient::serving(&data, 100).header("content-type", "image/png"));

    let result = h.engine.execute(fetch("t1", "a.png")).await;

    let TransferResult::Success {
        task_id,
        payload: TransferSuccess::Download(file),
    } = &result
    else {
        panic!("expected download success, got {result:?}");
    };
    assert_eq!(task_id, "t1");
    assert!(file.absolute_file_path.is_absolute());
    assert!(file.absolute_file_path.ends_with("a.png"));
    assert_eq!(file.absolute_file_path, h.cached("a.png"));
    assert_eq!(file.mime_type.as_deref(), Some("image/png"));
    assert_eq!(file.bytes_written, 1024);
    assert_eq!(std::fs::read(&file.absolute_file_path).unwrap(), data);

    let events = h.events_for("t1");
    assert_eq!(events.first().unwrap().phase, TransferPhase::Connecting);
    let last = events.last().unwrap();
    assert_eq!(last.phase, TransferPhase::Completed);
    assert_eq!(last.bytes_transferred, 1024);
    assert_eq!(last.bytes_total, Some(1024));
    assert_monotonic(&events);

    let doc = serde_json::to_value(ResultDocument::from(&result)).unwrap();
    assert_eq!(doc["taskId"], "t1");
    assert_eq!(doc["mimeType"], "image/png");
    assert_eq!(doc["response"]["code"], 200);
    assert!(doc["absoluteFilePath"].as_str().unwrap().ends_with("a.png"));
}

#[tokio::test]
async fn fetch_without_content_length_reports_unknown_total() {
    let mut client = MockClient::serving(b"hello", 2);
    client.headers.clear();
    let h = Harness::new(client);

    let result = h.engine.execute(fetch("t2", "hello.txt")).await;
    assert!(result.is_success(), "{result:?}");

    let events = h.events_for("t2");
    assert!(events.iter().all(|e| e.bytes_total.is_none()));
    assert_eq!(events.last().unwrap().bytes_transferred, 5);
}

#[tokio::test]
async fn persistent_target_lands_in_persistent_root() {
    let h = Harness::new(MockClient::serving(b"x", 1));
    let result = h
        .engine
        .execute(request(json!({
            "direction": "fetch",
            "taskId": "p1",
            "url": "https://example.test/x",
            "filename": "x.bin",
            "destinationTargetKind": "persistent",
        })))
        .await;
    let TransferResult::Success {
        payload: TransferSuccess::Download(file),
        ..
    } = result
    else {
        panic!("expected success");
    };
    assert!(!file.absolute_file_path.starts_with(h.cache.path().canonicalize().unwrap()));
    assert!(file.absolute_file_path.exists());
}

#[tokio::test]
async fn missing_field_fails_before_any_request() {
    let h = Harness::new(MockClient::serving(b"x", 1));
    let result = h
        .engine
        .execute(request(json!({
            "direction": "upload",
            "taskId": "u1",
            "parts": [{"name": "a", "type": "string", "payload": "1"}],
        })))
        .await;

    assert_eq!(result.task_id(), "u1");
    assert_eq!(result.error_kind(), Some(ErrorKind::MissingParameter));
    assert_eq!(h.calls(), 0);
    assert!(h.events_for("u1").is_empty());
}

#[tokio::test]
async fn traversal_filename_fails_before_any_request() {
    let h = Harness::new(MockClient::serving(b"x", 1));
    let result = h.engine.execute(fetch("t3", "../escape.png")).await;
    assert_eq!(result.error_kind(), Some(ErrorKind::InvalidValue));
    assert_eq!(h.calls(), 0);
}

#[tokio::test]
async fn http_error_status_creates_no_file() {
    let h = Harness::new(MockClient::serving(b"not found", 4).status(404));
    let result = h.engine.execute(fetch("t4", "missing.png")).await;

    assert_eq!(result.error_kind(), Some(ErrorKind::HttpStatus));
    assert!(!h.cached("missing.png").exists());
    assert!(
        h.events_for("t4")
            .iter()
            .all(|e| e.phase != TransferPhase::Completed)
    );
}

#[tokio::test]
async fn unreachable_host_is_reported() {
    let h = Harness::new(MockClient::serving(b"x", 1).unreachable());
    let result = h.engine.execute(fetch("t5", "x.bin")).await;
    assert_eq!(result.error_kind(), Some(ErrorKind::UnreachableHost));
    match result {
        TransferResult::Failure { message, .. } => assert!(message.contains("no such host")),
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test]
async fn cancel_mid_stream_removes_partial_file() {
    let data = vec![1_u8; 64 * 40];
    let h = Harness::new(MockClient::serving(&data, 64).chunk_delay(Duration::from_millis(20)));

    let handle = h.engine.spawn(fetch("c1", "big.bin"));
    assert!(h.engine.registry().is_active("c1"));

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(h.engine.cancel("c1"));

    let result = handle.join().await;
    assert_eq!(result.task_id(), "c1");
    assert_eq!(result.error_kind(), Some(ErrorKind::Cancelled));
    assert!(!h.cached("big.bin").exists());
    assert!(!h.engine.registry().is_active("c1"));
    assert!(!h.engine.cancel("c1"));

    let events = h.events_for("c1");
    assert!(events.iter().all(|e| e.phase != TransferPhase::Completed));
    assert_monotonic(&events);
}

#[tokio::test]
async fn abort_removes_partial_file() {
    let data = vec![1_u8; 64 * 40];
    let h = Harness::new(MockClient::serving(&data, 64).chunk_delay(Duration::from_millis(20)));

    let handle = h.engine.spawn(fetch("c3", "aborted.bin"));
    tokio::time::sleep(Duration::from_millis(150)).await;
    handle.abort();

    let result = handle.join().await;
    assert_eq!(result.error_kind(), Some(ErrorKind::Cancelled));
    assert!(!h.cached("aborted.bin").exists());
    assert!(!h.engine.registry().is_active("c3"));
}

#[tokio::test]
async fn failed_download_removes_partial_file() {
    let data = vec![5_u8; 64 * 10];
    let h = Harness::new(MockClient::serving(&data, 64).fail_after(3));

    let result = h.engine.execute(fetch("t6", "broken.bin")).await;

    assert_eq!(result.error_kind(), Some(ErrorKind::UnexpectedError));
    match &result {
        TransferResult::Failure { message, .. } => assert!(message.contains("connection reset")),
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(!h.cached("broken.bin").exists());
    assert_eq!(std::fs::read_dir(h.cache.path()).unwrap().count(), 0);
    assert!(
        h.events_for("t6")
            .iter()
            .all(|e| e.phase != TransferPhase::Completed)
    );
}

#[tokio::test]
async fn malformed_header_fails_before_any_request() {
    let h = Harness::new(MockClient::serving(b"x", 1));
    let result = h
        .engine
        .execute(request(json!({
            "direction": "fetch",
            "taskId": "t7",
            "url": "https://example.test/blob",
            "filename": "x.bin",
            "headers": {"bad header": "a\r\nInjected: 1"},
        })))
        .await;
    assert_eq!(result.error_kind(), Some(ErrorKind::InvalidValue));
    assert_eq!(h.calls(), 0);
}

#[tokio::test]
async fn cancel_before_first_poll_wins() {
    let h = Harness::new(MockClient::serving(b"abc", 1));
    let handle = h.engine.spawn(fetch("c2", "early.bin"));
    assert!(h.engine.cancel("c2"));

    let result = handle.join().await;
    assert_eq!(result.error_kind(), Some(ErrorKind::Cancelled));
    assert!(!h.cached("early.bin").exists());
}

#[tokio::test]
async fn cancel_leaves_other_transfers_alone() {
    let data = vec![2_u8; 64 * 20];
    let h = Harness::new(MockClient::serving(&data, 64).chunk_delay(Duration::from_millis(5)));

    let doomed = h.engine.spawn(fetch("x1", "doomed.bin"));
    let survivor = h.engine.spawn(fetch("x2", "survivor.bin"));
    h.engine.cancel("x1");

    assert_eq!(doomed.join().await.error_kind(), Some(ErrorKind::Cancelled));
    let result = survivor.join().await;
    assert!(result.is_success(), "{result:?}");
    assert_eq!(std::fs::read(h.cached("survivor.bin")).unwrap(), data);
}

#[tokio::test]
async fn concurrent_transfers_complete_independently() {
    let data = vec![3_u8; 4096];
    let h = Harness::new(MockClient::serving(&data, 512).chunk_delay(Duration::from_millis(1)));

    let handles: Vec<_> = (0..8)
        .map(|i| h.engine.spawn(fetch(&format!("m{i}"), &format!("file{i}.bin"))))
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let result = handle.join().await;
        assert_eq!(result.task_id(), format!("m{i}"));
        assert!(result.is_success(), "{result:?}");
        assert_eq!(std::fs::read(h.cached(&format!("file{i}.bin"))).unwrap(), data);

        let events = h.events_for(&format!("m{i}"));
        assert_monotonic(&events);
        assert_eq!(events.last().unwrap().bytes_transferred, 4096);
    }
    assert!(h.engine.registry().is_empty());
}

#[tokio::test]
async fn duplicate_task_ids_are_cancelled_together() {
    let data = vec![4_u8; 64 * 40];
    let h = Harness::new(MockClient::serving(&data, 64).chunk_delay(Duration::from_millis(10)));

    let a = h.engine.spawn(fetch("dup", "one.bin"));
    let b = h.engine.spawn(fetch("dup", "two.bin"));
    tokio::time::sleep(Duration::from_millis(30)).await;
    h.engine.cancel("dup");

    assert_eq!(a.join().await.error_kind(), Some(ErrorKind::Cancelled));
    assert_eq!(b.join().await.error_kind(), Some(ErrorKind::Cancelled));
}

fn write_file(dir: &Path, name: &str, contents: &[u8]) -> String {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path.to_string_lossy().into_owned()
}

fn position(haystack: &[u8], needle: &str) -> usize {
    haystack
        .windows(needle.len())
        .position(|w| w == needle.as_bytes())
        .unwrap_or_else(|| panic!("`{needle}` not in body"))
}

#[tokio::test]
async fn upload_streams_parts_in_order() {
    let h = Harness::new(MockClient::serving(b"", 1).reply("stored"));
    let files = tempfile::tempdir().unwrap();
    let photo = write_file(files.path(), "photo.jpg", b"JPEGDATA");

    let result = h
        .engine
        .execute(request(json!({
            "direction": "upload",
            "taskId": "u2",
            "url": "https://example.test/upload",
            "returnResponse": true,
            "parts": [
                {"name": "first", "type": "string", "payload": "1"},
                {"name": "photo", "type": "file",
                 "payload": {"absoluteFilePath": photo, "mimeType": "image/jpeg"}},
                {"name": "last", "type": "string", "payload": ""},
            ],
        })))
        .await;

    let TransferResult::Success {
        payload: TransferSuccess::Upload(response),
        ..
    } = &result
    else {
        panic!("expected upload success, got {result:?}");
    };
    assert_eq!(response.status, 200);
    assert_eq!(response.body.as_deref(), Some("stored"));

    let captured = h.recorder.captured.lock().unwrap().clone().unwrap();
    assert!(captured.content_type.starts_with("multipart/form-data; boundary="));
    assert_eq!(captured.content_length, Some(captured.body.len() as u64));

    let body = &captured.body;
    let first = position(body, "name=\"first\"");
    let photo = position(body, "name=\"photo\"; filename=\"photo.jpg\"");
    let last = position(body, "name=\"last\"");
    assert!(first < photo && photo < last);
    assert!(position(body, "Content-Type: image/jpeg") > photo);
    assert!(position(body, "JPEGDATA") > photo);

    let boundary = captured.content_type.split("boundary=").nth(1).unwrap();
    assert!(body.ends_with(format!("--{boundary}--\r\n").as_bytes()));

    let events = h.events_for("u2");
    let done = events.last().unwrap();
    assert_eq!(done.phase, TransferPhase::Completed);
    assert_eq!(done.bytes_total, Some(body.len() as u64));
    assert_eq!(done.bytes_transferred, body.len() as u64);
}

#[tokio::test]
async fn upload_without_return_response_omits_body() {
    let h = Harness::new(MockClient::serving(b"", 1).reply("ignored"));
    let result = h
        .engine
        .execute(request(json!({
            "direction": "upload",
            "taskId": "u3",
            "url": "https://example.test/upload",
            "parts": {"note": {"type": "string", "payload": "hi"}},
        })))
        .await;
    let TransferResult::Success {
        payload: TransferSuccess::Upload(response),
        ..
    } = result
    else {
        panic!("expected success");
    };
    assert_eq!(response.body, None);
}

#[tokio::test]
async fn cancel_mid_upload_is_cancelled() {
    let h = Harness::new(
        MockClient::serving(b"", 1)
            .reply("stored")
            .read_delay(Duration::from_millis(5)),
    );
    let files = tempfile::tempdir().unwrap();
    let big = write_file(files.path(), "big.bin", &vec![6_u8; 512 * 1024]);

    let handle = h.engine.spawn(request(json!({
        "direction": "upload",
        "taskId": "u6",
        "url": "https://example.test/upload",
        "parts": [{"name": "f", "type": "file",
                   "payload": {"absoluteFilePath": big, "mimeType": "application/octet-stream"}}],
    })));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(h.engine.cancel("u6"));

    let result = handle.join().await;
    assert_eq!(result.error_kind(), Some(ErrorKind::Cancelled));
    assert!(h.recorder.captured.lock().unwrap().is_none());
    assert!(
        h.events_for("u6")
            .iter()
            .all(|e| e.phase != TransferPhase::Completed)
    );
    assert!(Path::new(&big).exists());
}

#[tokio::test]
async fn upload_of_missing_file_is_filesystem_error() {
    let h = Harness::new(MockClient::serving(b"", 1));
    let files = tempfile::tempdir().unwrap();
    let gone = files.path().join("gone.bin");

    let result = h
        .engine
        .execute(request(json!({
            "direction": "upload",
            "taskId": "u4",
            "url": "https://example.test/upload",
            "parts": [
                {"name": "a", "type": "string", "payload": "1"},
                {"name": "f", "type": "file",
                 "absoluteFilePath": gone.to_string_lossy(), "mimeType": "application/octet-stream"},
            ],
        })))
        .await;

    assert_eq!(result.error_kind(), Some(ErrorKind::FilesystemError));
    match result {
        TransferResult::Failure { message, .. } => assert!(message.contains("gone.bin")),
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test]
async fn upload_rejected_by_server_is_http_status() {
    let h = Harness::new(MockClient::serving(b"", 1).status(500));
    let result = h
        .engine
        .execute(request(json!({
            "direction": "upload",
            "taskId": "u5",
            "url": "https://example.test/upload",
            "parts": [{"name": "a", "type": "string", "payload": "1"}],
        })))
        .await;
    assert_eq!(result.error_kind(), Some(ErrorKind::HttpStatus));

    let doc = serde_json::to_value(ResultDocument::from(&result)).unwrap();
    assert_eq!(doc["taskId"], "u5");
    assert_eq!(doc["errorKind"], "ERROR_HTTP_STATUS");
}
