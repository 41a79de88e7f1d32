use std::time::{Duration, Instant};

use crate::data::{ProgressCallback, ProgressEvent, TransferOptions, TransferPhase};

/// Emits progress for one transfer.
///
/// Byte counts are cumulative, so events are monotonic by construction.
/// Intermediate events are rate limited to the configured interval; phase
/// changes are always delivered.
pub(crate) struct ProgressReporter {
    task_id: String,
    sink: Option<ProgressCallback>,
    interval: Duration,
    total: Option<u64>,
    transferred: u64,
    last_emit: Option<Instant>,
}

impl ProgressReporter {
    pub(crate) fn new(task_id: &str, options: &TransferOptions) -> Self {
        Self {
            task_id: task_id.to_string(),
            sink: options.on_progress.clone(),
            interval: options.progress_interval,
            total: None,
            transferred: 0,
            last_emit: None,
        }
    }

    pub(crate) fn set_total(&mut self, total: Option<u64>) {
        self.total = total;
    }

    pub(crate) fn transferred(&self) -> u64 {
        self.transferred
    }

    pub(crate) fn connecting(&mut self) {
        self.emit(TransferPhase::Connecting);
    }

    /// Record `chunk` more bytes moved.
    pub(crate) fn advance(&mut self, chunk: u64) {
        self.transferred += chunk;
        let due = match self.last_emit {
            None => true,
            Some(at) => at.elapsed() >= self.interval,
        };
        if due {
            self.emit(TransferPhase::Transferring);
        }
    }

    pub(crate) fn complete(&mut self) {
        self.emit(TransferPhase::Completed);
    }

    fn emit(&mut self, phase: TransferPhase) {
        self.last_emit = Some(Instant::now());
        if let Some(ref callback) = self.sink {
            callback(&ProgressEvent {
                task_id: self.task_id.clone(),
                bytes_transferred: self.transferred,
                bytes_total: self.total,
                phase,
            });
        }
    }
}
