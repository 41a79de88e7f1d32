use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no {kind} directory could be determined for this user")]
    NoBaseDir { kind: &'static str },

    #[error("invalid application directory name: {0:?}")]
    InvalidAppName(String),

    #[error("failed to create directory '{}': {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
