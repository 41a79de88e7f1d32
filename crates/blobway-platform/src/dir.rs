use std::env;
use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

pub fn user_home() -> Option<PathBuf> {
    home::home_dir()
}

/// Durable per-user data directory.
pub fn user_data() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        env::var_os("LOCALAPPDATA").map(PathBuf::from)
    }
    #[cfg(target_os = "macos")]
    {
        user_home().map(|p| p.join("Library/Application Support"))
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .filter(|p| p.is_absolute())
            .or_else(|| user_home().map(|p| p.join(".local/share")))
    }
}

/// Purgeable per-user cache directory.
pub fn user_cache() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        env::var_os("LOCALAPPDATA").map(|p| PathBuf::from(p).join("Cache"))
    }
    #[cfg(target_os = "macos")]
    {
        user_home().map(|p| p.join("Library/Caches"))
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        env::var_os("XDG_CACHE_HOME")
            .map(PathBuf::from)
            .filter(|p| p.is_absolute())
            .or_else(|| user_home().map(|p| p.join(".cache")))
    }
}

/// `<user cache>/<app>`. Not created.
pub fn app_cache_dir(app: &str) -> Result<PathBuf> {
    let base = user_cache().ok_or(Error::NoBaseDir { kind: "cache" })?;
    Ok(base.join(check_app_name(app)?))
}

/// `<user data>/<app>`. Not created.
pub fn app_data_dir(app: &str) -> Result<PathBuf> {
    let base = user_data().ok_or(Error::NoBaseDir { kind: "data" })?;
    Ok(base.join(check_app_name(app)?))
}

/// Create `path` and its parents if missing.
pub fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|source| Error::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

/// The app name must be one plain path component.
fn check_app_name(app: &str) -> Result<&str> {
    let mut components = Path::new(app).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(app),
        _ => Err(Error::InvalidAppName(app.to_string())),
    }
}
