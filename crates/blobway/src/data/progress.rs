use std::fmt;
use std::sync::Arc;

use serde::Serialize;

/// Phases a single transfer moves through.
///
/// Connecting → Transferring → Completed. A failed or cancelled transfer
/// never reaches `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferPhase {
    /// Request sent, waiting for the exchange to start moving bytes.
    #[default]
    Connecting,

    /// Bytes are flowing between the socket and local storage.
    Transferring,

    /// All bytes moved and the response was accepted.
    Completed,
}

impl fmt::Display for TransferPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferPhase::Connecting => write!(f, "Connecting"),
            TransferPhase::Transferring => write!(f, "Transferring"),
            TransferPhase::Completed => write!(f, "Completed"),
        }
    }
}

/// A progress notification for one transfer.
///
/// `bytes_transferred` never decreases between two events of the same
/// transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub task_id: String,

    pub bytes_transferred: u64,

    /// Expected total, or `None` when the size is not known up front
    /// (no `Content-Length`, or an upload part that could not be stat-ed).
    pub bytes_total: Option<u64>,

    pub phase: TransferPhase,
}

impl ProgressEvent {
    /// Completion percentage, when the total is known.
    #[must_use]
    pub fn percentage(&self) -> Option<f64> {
        self.bytes_total.map(|total| {
            if total == 0 {
                if self.is_completed() { 100.0 } else { 0.0 }
            } else {
                (self.bytes_transferred as f64 / total as f64) * 100.0
            }
        })
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.phase == TransferPhase::Completed
    }
}

/// Sink receiving progress events, invoked from whichever task drives the
/// transfer's bytes.
pub type ProgressCallback = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;
