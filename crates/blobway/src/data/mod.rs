//! Immutable data types shared by every stage of a transfer.
//!
//! Requests, parts, progress events and results live here. Nothing in this
//! module performs I/O.

pub mod options;
pub mod progress;
pub mod request;
pub mod result;

pub use options::TransferOptions;
pub use progress::{ProgressCallback, ProgressEvent, TransferPhase};
pub use request::{DestinationSpec, Direction, Headers, Part, TargetKind, TransferRequest};
pub use result::{FileMetadata, ResponseMetadata, TransferResult, TransferSuccess};
