//! Folding executor outcomes into terminal results.

use crate::data::{TransferResult, TransferSuccess};
use crate::error::Error;

/// Map one outcome to exactly one [`TransferResult`].
///
/// Total and deterministic: every error becomes a `Failure` carrying its
/// stable kind and display message.
pub fn map_outcome(task_id: &str, outcome: Result<TransferSuccess, Error>) -> TransferResult {
    match outcome {
        Ok(payload) => TransferResult::Success {
            task_id: task_id.to_string(),
            payload,
        },
        Err(err) => TransferResult::Failure {
            task_id: task_id.to_string(),
            error_kind: err.kind(),
            message: err.to_string(),
        },
    }
}
