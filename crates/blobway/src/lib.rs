//! HTTP blob transfer engine.
//!
//! Streams single-request downloads to files under host-provided storage
//! roots, and uploads ordered multipart bodies assembled from strings and
//! local files. Bodies are never buffered in memory. Each transfer reports
//! monotonic progress, can be cancelled by task id, and ends in exactly one
//! [`TransferResult`].
//!
//! # Architecture
//!
//! - [`data`]: immutable requests, progress events and results
//! - [`core`]: pure validation, multipart framing and path checks
//! - [`effects`]: the HTTP seam, streamed bodies, storage roots and cancellation
//! - [`bridge`]: loosely typed JSON in, camelCase result documents out
//! - [`engine`]: the [`TransferEngine`] facade tying the above together
//!
//! # Example
//!
//! ```no_run
//! use blobway::{EngineConfig, RawRequest, ReqwestClient, TransferEngine};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EngineConfig::default();
//! let engine = TransferEngine::new(ReqwestClient::from_config(&config)?, config.storage_provider())
//!     .with_options(config.transfer_options());
//!
//! let upload = RawRequest::from_json(
//!     r#"{
//!         "direction": "upload",
//!         "taskId": "u1",
//!         "url": "https://example.com/upload",
//!         "parts": [{"name": "note", "type": "string", "payload": "hello"}]
//!     }"#,
//! )?;
//! let handle = engine.spawn(upload);
//! let result = handle.join().await;
//! println!("{}", serde_json::to_string(&blobway::ResultDocument::from(&result))?);
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod config;
pub mod core;
pub mod data;
pub mod effects;
pub mod engine;
pub mod error;
pub mod mapper;

pub use bridge::{RawFetchRequest, RawPart, RawRequest, RawUploadRequest, ResultDocument};
pub use config::EngineConfig;
pub use self::core::{Boundary, is_success, join_under_root, validate};
pub use data::{
    DestinationSpec, Direction, FileMetadata, Headers, Part, ProgressCallback, ProgressEvent,
    ResponseMetadata, TargetKind, TransferOptions, TransferPhase, TransferRequest, TransferResult,
    TransferSuccess,
};
pub use effects::{
    BodyError, BoxStream, CancelGuard, CancelRegistry, FixedRoots, HttpClient, HttpResponse,
    PlatformRoots, ResponseStream, StorageProvider, StreamingBody, TargetResolver, TransportError,
    UploadBody,
};
pub use engine::{TransferEngine, TransferHandle};
pub use error::{ConfigError, Error, ErrorKind, Result};
pub use mapper::map_outcome;

#[cfg(feature = "reqwest")]
pub use effects::ReqwestClient;
