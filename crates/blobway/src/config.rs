use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::data::{TargetKind, TransferOptions};
use crate::effects::{FixedRoots, PlatformRoots, StorageProvider};
use crate::error::ConfigError;

/// Engine configuration, usually read from a TOML file.
///
/// ```toml
/// app_name = "blobway"
/// cache_root = "/var/cache/myapp"
/// progress_interval_ms = 250
/// connect_timeout_secs = 10
/// ```
///
/// Roots left unset fall back to the per-user platform directories for
/// `app_name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub app_name: String,
    pub cache_root: Option<PathBuf>,
    pub persistent_root: Option<PathBuf>,
    pub progress_interval_ms: u64,
    pub connect_timeout_secs: Option<u64>,
    pub user_agent: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            app_name: "blobway".to_string(),
            cache_root: None,
            persistent_root: None,
            progress_interval_ms: 200,
            connect_timeout_secs: Some(30),
            user_agent: concat!("blobway/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_secs.map(Duration::from_secs)
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    pub fn transfer_options(&self) -> TransferOptions {
        TransferOptions::default().progress_interval(self.progress_interval())
    }

    pub fn platform_roots(&self) -> PlatformRoots {
        PlatformRoots::new(self.app_name.clone())
    }

    /// Configured roots, with platform directories filling the gaps.
    pub fn storage_provider(&self) -> Arc<dyn StorageProvider> {
        Arc::new(ConfiguredRoots {
            fixed: FixedRoots {
                cache: self.cache_root.clone(),
                persistent: self.persistent_root.clone(),
            },
            fallback: self.platform_roots(),
        })
    }
}

struct ConfiguredRoots {
    fixed: FixedRoots,
    fallback: PlatformRoots,
}

impl StorageProvider for ConfiguredRoots {
    fn root(&self, kind: TargetKind) -> Option<PathBuf> {
        self.fixed.root(kind).or_else(|| self.fallback.root(kind))
    }
}
