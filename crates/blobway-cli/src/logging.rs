pub use tracing::{debug, error, info, warn};

/// Install the stderr subscriber. `RUST_LOG` overrides the `info` default:
///
/// ```bash
/// RUST_LOG=blobway=debug blobway fetch https://example.com/a.png a.png
/// ```
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
