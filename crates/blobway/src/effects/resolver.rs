use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::join_under_root;
use crate::data::{DestinationSpec, TargetKind};
use crate::error::{Error, Result};

/// Host capability supplying the storage roots downloads land under.
pub trait StorageProvider: Send + Sync {
    /// Root directory for `kind`, or `None` if the host has none.
    fn root(&self, kind: TargetKind) -> Option<PathBuf>;
}

/// Roots handed over explicitly, usually from configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixedRoots {
    pub cache: Option<PathBuf>,
    pub persistent: Option<PathBuf>,
}

impl FixedRoots {
    pub fn new(cache: impl Into<PathBuf>, persistent: impl Into<PathBuf>) -> Self {
        Self {
            cache: Some(cache.into()),
            persistent: Some(persistent.into()),
        }
    }
}

impl StorageProvider for FixedRoots {
    fn root(&self, kind: TargetKind) -> Option<PathBuf> {
        match kind {
            TargetKind::Cache => self.cache.clone(),
            TargetKind::Persistent => self.persistent.clone(),
        }
    }
}

/// Per-application roots following OS conventions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformRoots {
    app: String,
}

impl PlatformRoots {
    pub fn new(app: impl Into<String>) -> Self {
        Self { app: app.into() }
    }

    /// Create both roots if they do not exist yet.
    pub fn ensure(&self) -> blobway_platform::Result<()> {
        blobway_platform::ensure_dir(&blobway_platform::app_cache_dir(&self.app)?)?;
        blobway_platform::ensure_dir(&blobway_platform::app_data_dir(&self.app)?)?;
        Ok(())
    }
}

impl StorageProvider for PlatformRoots {
    fn root(&self, kind: TargetKind) -> Option<PathBuf> {
        let dir = match kind {
            TargetKind::Cache => blobway_platform::app_cache_dir(&self.app),
            TargetKind::Persistent => blobway_platform::app_data_dir(&self.app),
        };
        dir.ok()
    }
}

/// Turns a [`DestinationSpec`] into an absolute file path.
#[derive(Clone)]
pub struct TargetResolver {
    provider: Arc<dyn StorageProvider>,
}

impl std::fmt::Debug for TargetResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TargetResolver").finish_non_exhaustive()
    }
}

impl TargetResolver {
    pub fn new(provider: impl StorageProvider + 'static) -> Self {
        Self {
            provider: Arc::new(provider),
        }
    }

    pub fn from_arc(provider: Arc<dyn StorageProvider>) -> Self {
        Self { provider }
    }

    /// Resolve `destination` under the root for its kind.
    ///
    /// The root must already exist as a directory; it is never created here.
    pub async fn resolve(&self, destination: &DestinationSpec) -> Result<PathBuf> {
        let kind = destination.target_kind;
        let root = self.provider.root(kind).ok_or_else(|| Error::RootUnavailable {
            kind: kind.to_string(),
        })?;

        // Traversal is checked before touching the disk.
        join_under_root(&root, &destination.filename)?;

        let root = tokio::fs::canonicalize(&root)
            .await
            .map_err(|e| Error::fs(&root, e))?;
        let meta = tokio::fs::metadata(&root).await.map_err(|e| Error::fs(&root, e))?;
        if !meta.is_dir() {
            return Err(Error::fs(
                &root,
                io::Error::new(io::ErrorKind::NotADirectory, "storage root is not a directory"),
            ));
        }

        let path = join_under_root(&root, &destination.filename)?;
        if links_outside(&root, &path).await {
            return Err(Error::invalid("filename", destination.filename.clone()));
        }
        Ok(path)
    }
}

/// A destination that is itself a symlink, or whose parent resolves
/// outside the root, would let `File::create` write elsewhere.
async fn links_outside(root: &Path, path: &Path) -> bool {
    if tokio::fs::symlink_metadata(path)
        .await
        .is_ok_and(|meta| meta.file_type().is_symlink())
    {
        return true;
    }
    match path.parent() {
        Some(parent) => match tokio::fs::canonicalize(parent).await {
            Ok(parent) => !parent.starts_with(root),
            Err(_) => false,
        },
        None => true,
    }
}
