use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::progress::{ProgressCallback, ProgressEvent};

/// Per-transfer knobs.
///
/// # Examples
///
/// ```
/// use blobway::TransferOptions;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let options = TransferOptions::default()
///     .progress_interval(Duration::from_millis(250))
///     .on_progress(Arc::new(|event| {
///         if let Some(pct) = event.percentage() {
///             println!("{}: {:.1}%", event.task_id, pct);
///         }
///     }));
/// ```
#[derive(Clone)]
pub struct TransferOptions {
    /// Minimum spacing between two progress events of one transfer.
    ///
    /// The first event and the terminal `Completed` event are always
    /// delivered. `Duration::ZERO` reports every chunk.
    ///
    /// Default: 200ms
    pub progress_interval: Duration,

    /// Progress sink. Events of one transfer arrive in order.
    ///
    /// Default: None
    pub on_progress: Option<ProgressCallback>,
}

impl fmt::Debug for TransferOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferOptions")
            .field("progress_interval", &self.progress_interval)
            .field("on_progress", &self.on_progress.as_ref().map(|_| "{ ... }"))
            .finish()
    }
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            progress_interval: Duration::from_millis(200),
            on_progress: None,
        }
    }
}

impl TransferOptions {
    #[must_use]
    pub fn progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    #[must_use]
    pub fn on_progress(mut self, on_progress: Arc<dyn Fn(&ProgressEvent) + Send + Sync>) -> Self {
        self.on_progress = Some(on_progress);
        self
    }
}
