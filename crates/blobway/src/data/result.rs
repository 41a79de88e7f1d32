use std::path::PathBuf;

use crate::error::ErrorKind;

/// Status line and headers of the server's response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseMetadata {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    /// Response body as text. Only filled for uploads asking for it.
    pub body: Option<String>,
}

impl ResponseMetadata {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Outcome of a completed download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    pub absolute_file_path: PathBuf,
    pub mime_type: Option<String>,
    pub bytes_written: u64,
    pub response: ResponseMetadata,
}

/// Direction-specific success payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferSuccess {
    Download(FileMetadata),
    Upload(ResponseMetadata),
}

/// Terminal outcome of one transfer. Exactly one is produced per task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferResult {
    Success {
        task_id: String,
        payload: TransferSuccess,
    },
    Failure {
        task_id: String,
        error_kind: ErrorKind,
        message: String,
    },
}

impl TransferResult {
    pub fn task_id(&self) -> &str {
        match self {
            TransferResult::Success { task_id, .. } | TransferResult::Failure { task_id, .. } => {
                task_id
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TransferResult::Success { .. })
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            TransferResult::Success { .. } => None,
            TransferResult::Failure { error_kind, .. } => Some(*error_kind),
        }
    }
}
