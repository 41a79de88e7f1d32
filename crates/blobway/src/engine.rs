//! The host-facing entry point.
//!
//! [`TransferEngine`] ties validation, destination resolution, execution and
//! result mapping together. Every call yields exactly one
//! [`TransferResult`]; nothing escapes as an `Err` or a panic.

use std::any::Any;
use std::sync::Arc;

use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::bridge::RawRequest;
use crate::core::validate;
use crate::data::{Direction, TransferOptions, TransferRequest, TransferResult, TransferSuccess};
use crate::effects::{
    CancelGuard, CancelRegistry, Executor, HttpClient, ProgressReporter, StorageProvider,
    StreamingBody, TargetResolver,
};
use crate::error::{Error, Result};
use crate::mapper::map_outcome;

/// Runs transfers against one HTTP client and one set of storage roots.
///
/// Cheap to clone; clones share the client and the cancellation registry.
///
/// # Examples
///
/// ```no_run
/// use blobway::{EngineConfig, RawRequest, ReqwestClient, TransferEngine};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let config = EngineConfig::default();
/// let engine = TransferEngine::new(
///     ReqwestClient::from_config(&config)?,
///     config.storage_provider(),
/// );
///
/// let request = RawRequest::from_json(
///     r#"{"direction":"fetch","taskId":"t1","url":"https://example.com/a.png","filename":"a.png"}"#,
/// )?;
/// let result = engine.execute(request).await;
/// println!("{result:?}");
/// # Ok(())
/// # }
/// ```
pub struct TransferEngine<C: HttpClient> {
    executor: Executor<C>,
    resolver: TargetResolver,
    options: TransferOptions,
    registry: CancelRegistry,
}

impl<C: HttpClient> Clone for TransferEngine<C> {
    fn clone(&self) -> Self {
        Self {
            executor: self.executor.clone(),
            resolver: self.resolver.clone(),
            options: self.options.clone(),
            registry: self.registry.clone(),
        }
    }
}

impl<C: HttpClient> TransferEngine<C> {
    pub fn new(client: C, storage: Arc<dyn StorageProvider>) -> Self {
        Self {
            executor: Executor::new(Arc::new(client)),
            resolver: TargetResolver::from_arc(storage),
            options: TransferOptions::default(),
            registry: CancelRegistry::new(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: TransferOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &TransferOptions {
        &self.options
    }

    pub fn registry(&self) -> &CancelRegistry {
        &self.registry
    }

    /// Cancel the in-flight transfer(s) registered under `task_id`.
    ///
    /// Returns `false` when nothing with that id is running.
    pub fn cancel(&self, task_id: &str) -> bool {
        let found = self.registry.cancel(task_id);
        debug!(task_id, found, "cancel requested");
        found
    }

    /// Validate and run one raw request.
    pub async fn execute(&self, raw: RawRequest) -> TransferResult {
        match validate(&raw) {
            Ok(request) => self.run(request).await,
            Err(err) => rejected(&raw, err),
        }
    }

    /// Run one already-validated request.
    pub async fn run(&self, request: TransferRequest) -> TransferResult {
        let guard = self.registry.register(&request.task_id);
        self.run_registered(request, guard).await
    }

    async fn run_registered(&self, request: TransferRequest, guard: CancelGuard) -> TransferResult {
        info!(
            task_id = %request.task_id,
            method = request.method(),
            url = %request.url,
            "transfer started"
        );

        let outcome = self.perform(&request, &guard).await;
        drop(guard);

        let result = map_outcome(&request.task_id, outcome);
        log_result(&result);
        result
    }

    async fn perform(&self, request: &TransferRequest, guard: &CancelGuard) -> Result<TransferSuccess> {
        let progress = ProgressReporter::new(&request.task_id, &self.options);
        match &request.direction {
            Direction::Download(destination) => {
                let path = self.resolver.resolve(destination).await?;
                let file = self
                    .executor
                    .fetch(&request.url, &request.headers, &path, progress, guard.token())
                    .await?;
                Ok(TransferSuccess::Download(file))
            }
            Direction::Upload {
                parts,
                return_response,
            } => {
                let body = StreamingBody::build(parts);
                let response = self
                    .executor
                    .upload(
                        &request.url,
                        &request.headers,
                        body,
                        *return_response,
                        progress,
                        guard.token(),
                    )
                    .await?;
                Ok(TransferSuccess::Upload(response))
            }
        }
    }
}

impl<C: HttpClient + 'static> TransferEngine<C> {
    /// Start a transfer on the runtime and return immediately.
    ///
    /// Validation happens before this returns, and the task id is already
    /// registered, so [`cancel`](Self::cancel) reaches the transfer even if
    /// it has not been polled yet.
    pub fn spawn(&self, raw: RawRequest) -> TransferHandle {
        let task_id = raw.task_id_hint();
        let (handle, token) = match validate(&raw) {
            Ok(request) => {
                let guard = self.registry.register(&request.task_id);
                let token = guard.token().clone();
                let engine = self.clone();
                let handle =
                    tokio::spawn(async move { engine.run_registered(request, guard).await });
                (handle, token)
            }
            Err(err) => {
                let result = rejected(&raw, err);
                (tokio::spawn(async move { result }), CancellationToken::new())
            }
        };
        TransferHandle {
            task_id,
            handle,
            token,
        }
    }
}

/// A transfer running on its own task.
#[derive(Debug)]
pub struct TransferHandle {
    task_id: String,
    handle: JoinHandle<TransferResult>,
    token: CancellationToken,
}

impl TransferHandle {
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Wait for the terminal result. A panicked task still yields one.
    pub async fn join(self) -> TransferResult {
        match self.handle.await {
            Ok(result) => result,
            Err(err) => {
                let result = map_outcome(&self.task_id, Err(join_error(err)));
                log_result(&result);
                result
            }
        }
    }

    /// Cancel the transfer and let it clean up; [`join`](Self::join) then
    /// yields `Cancelled`. Shares the token of every transfer registered
    /// under the same task id, like [`TransferEngine::cancel`].
    pub fn abort(&self) {
        self.token.cancel();
    }
}

fn rejected(raw: &RawRequest, err: Error) -> TransferResult {
    let result = map_outcome(&raw.task_id_hint(), Err(err));
    log_result(&result);
    result
}

fn join_error(err: JoinError) -> Error {
    match err.try_into_panic() {
        Ok(payload) => Error::UnexpectedException(panic_message(payload.as_ref())),
        Err(err) => Error::Unexpected(err.to_string()),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "transfer task panicked".to_string()
    }
}

fn log_result(result: &TransferResult) {
    match result {
        TransferResult::Success { task_id, .. } => info!(task_id = %task_id, "transfer finished"),
        TransferResult::Failure {
            task_id,
            error_kind,
            message,
        } => warn!(task_id = %task_id, kind = %error_kind, error = %message, "transfer failed"),
    }
}
