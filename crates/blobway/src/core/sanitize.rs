use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

/// Join `filename` under `root`, refusing anything that could leave it.
///
/// Only plain components are accepted: no `..`, no `.`, no root or drive
/// prefix. Nested relative names (`sub/a.png`) stay inside the root and are
/// allowed, but their directories are not created here.
pub fn join_under_root(root: &Path, filename: &str) -> Result<PathBuf> {
    let relative = Path::new(filename);
    let mut joined = root.to_path_buf();
    let mut pushed = 0usize;

    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                joined.push(part);
                pushed += 1;
            }
            Component::ParentDir
            | Component::CurDir
            | Component::RootDir
            | Component::Prefix(_) => {
                return Err(Error::invalid("filename", filename));
            }
        }
    }

    if pushed == 0 || filename.contains('\0') {
        return Err(Error::invalid("filename", filename));
    }
    Ok(joined)
}
