//! Pure transformations: request validation, multipart framing and
//! destination path checks. Nothing here touches the network or disk.

mod multipart;
mod sanitize;
mod validation;

pub use multipart::Boundary;
pub use sanitize::join_under_root;
pub use validation::validate;

/// Returns `true` for 2xx status codes.
///
/// ```
/// use blobway::is_success;
///
/// assert!(is_success(200));
/// assert!(is_success(204));
/// assert!(!is_success(304));
/// assert!(!is_success(404));
/// ```
pub fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}
