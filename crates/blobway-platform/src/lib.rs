//! Storage directory conventions for hosts embedding blobway.
//!
//! The engine never computes platform paths itself; hosts use these helpers
//! to build the roots they inject.

pub use error::{Error, Result};

pub mod dir;
mod error;

pub use dir::{app_cache_dir, app_data_dir, ensure_dir, user_cache, user_data, user_home};
