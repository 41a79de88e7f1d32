//! I/O: the HTTP client seam, streamed bodies, destination resolution,
//! progress delivery and cancellation.

mod body;
mod executor;
mod http;
mod progress;
mod registry;
mod resolver;

pub use body::{BodyError, StreamingBody};
pub use executor::Executor;
pub use http::{BoxStream, HttpClient, HttpResponse, ResponseStream, TransportError, UploadBody};
pub use registry::{CancelGuard, CancelRegistry};
pub use resolver::{FixedRoots, PlatformRoots, StorageProvider, TargetResolver};

pub(crate) use progress::ProgressReporter;

#[cfg(feature = "reqwest")]
pub use http::ReqwestClient;
