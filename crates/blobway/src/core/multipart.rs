//! multipart/form-data framing.
//!
//! Only the byte layout lives here: boundary tokens, per-part headers and
//! the closing delimiter. Streaming the payloads is done by
//! [`StreamingBody`](crate::effects::StreamingBody).

use uuid::Uuid;

use crate::data::Part;

const CRLF: &str = "\r\n";
const BOUNDARY_PREFIX: &str = "blobway";

/// A multipart boundary token: ASCII alphanumeric, 39 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Boundary(String);

impl Boundary {
    /// A fresh random boundary.
    pub fn random() -> Self {
        Self(format!("{BOUNDARY_PREFIX}{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value for the request's `Content-Type` header.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.0)
    }

    /// Delimiter line and headers preceding a part's payload, including the
    /// blank line that ends the header block.
    pub fn part_head(&self, part: &Part) -> String {
        let mut head = format!("--{}{CRLF}", self.0);
        head.push_str(&format!(
            "Content-Disposition: form-data; name=\"{}\"",
            escape_quoted(part.name())
        ));
        if let Part::File { mime_type, .. } = part {
            let file_name = part.file_name().unwrap_or_default();
            head.push_str(&format!("; filename=\"{}\"", escape_quoted(&file_name)));
            head.push_str(CRLF);
            head.push_str(&format!("Content-Type: {mime_type}"));
        }
        head.push_str(CRLF);
        head.push_str(CRLF);
        head
    }

    /// Bytes following each part's payload.
    pub fn part_tail() -> &'static str {
        CRLF
    }

    /// Closing delimiter ending the body.
    pub fn closing(&self) -> String {
        format!("--{}--{CRLF}", self.0)
    }
}

/// Escape a value placed inside a quoted disposition parameter, the way
/// browsers encode form field names.
fn escape_quoted(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}
