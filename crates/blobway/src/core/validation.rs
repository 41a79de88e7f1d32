use std::path::PathBuf;

use serde_json::Value;
use url::Url;

use crate::bridge::{RawFetchRequest, RawPart, RawRequest, RawUploadRequest};
use crate::data::{DestinationSpec, Direction, Headers, Part, TargetKind, TransferRequest};
use crate::error::{Error, Result};

/// Validate a raw request into a typed [`TransferRequest`].
///
/// Pure: no network or filesystem access. Missing or blank required fields
/// yield [`Error::MissingParameter`]; present but unusable values yield
/// [`Error::InvalidValue`].
///
/// # Examples
///
/// ```
/// use blobway::{validate, RawRequest, ErrorKind};
///
/// let raw = RawRequest::from_json(r#"{"direction":"fetch","taskId":"t1","url":"https://example.test/a"}"#).unwrap();
/// let err = validate(&raw).unwrap_err();
/// assert_eq!(err.kind(), ErrorKind::MissingParameter);
/// ```
pub fn validate(raw: &RawRequest) -> Result<TransferRequest> {
    match raw {
        RawRequest::Fetch(fetch) => validate_fetch(fetch),
        RawRequest::Upload(upload) => validate_upload(upload),
    }
}

fn validate_fetch(raw: &RawFetchRequest) -> Result<TransferRequest> {
    let task_id = required_str(raw.task_id.as_ref(), "taskId")?;
    let url = parse_url(raw.url.as_ref())?;
    let filename = required_str(raw.filename.as_ref(), "filename")?;
    let headers = parse_headers(raw.headers.as_ref())?;

    let target_kind = match raw.destination_target_kind.as_ref() {
        None | Some(Value::Null) => TargetKind::default(),
        Some(Value::String(token)) => TargetKind::from_token(token)
            .ok_or_else(|| Error::invalid("destinationTargetKind", token.clone()))?,
        Some(other) => return Err(Error::invalid("destinationTargetKind", other.to_string())),
    };

    Ok(TransferRequest {
        task_id,
        url,
        headers,
        direction: Direction::Download(DestinationSpec {
            filename,
            target_kind,
        }),
    })
}

fn validate_upload(raw: &RawUploadRequest) -> Result<TransferRequest> {
    let task_id = required_str(raw.task_id.as_ref(), "taskId")?;
    let url = parse_url(raw.url.as_ref())?;

    let raw_parts = raw.normalized_parts()?.ok_or_else(|| Error::missing("parts"))?;
    if raw_parts.is_empty() {
        return Err(Error::invalid("parts", "[]"));
    }
    let parts = raw_parts
        .iter()
        .enumerate()
        .map(|(i, part)| validate_part(i, part))
        .collect::<Result<Vec<_>>>()?;

    let headers = parse_headers(raw.headers.as_ref())?;
    let return_response = match raw.return_response.as_ref() {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(other) => return Err(Error::invalid("returnResponse", other.to_string())),
    };

    Ok(TransferRequest {
        task_id,
        url,
        headers,
        direction: Direction::Upload {
            parts,
            return_response,
        },
    })
}

fn validate_part(index: usize, raw: &RawPart) -> Result<Part> {
    let field = |name: &str| format!("parts[{index}].{name}");

    let name = required_str(raw.name.as_ref(), &field("name"))?;
    let kind = required_str(raw.kind.as_ref(), &field("type"))?;

    match kind.as_str() {
        "string" => match raw.payload.as_ref() {
            None | Some(Value::Null) => Err(Error::missing(field("payload"))),
            Some(Value::String(value)) => Ok(Part::String {
                name,
                value: value.clone(),
            }),
            Some(other) => Err(Error::invalid(field("payload"), other.to_string())),
        },
        "file" => {
            // Either nested in `payload` or flat on the part itself.
            let (path, mime) = match raw.payload.as_ref() {
                Some(Value::Object(payload)) => (
                    payload.get("absoluteFilePath").or(raw.absolute_file_path.as_ref()),
                    payload.get("mimeType").or(raw.mime_type.as_ref()),
                ),
                None | Some(Value::Null) => {
                    (raw.absolute_file_path.as_ref(), raw.mime_type.as_ref())
                }
                Some(other) => return Err(Error::invalid(field("payload"), other.to_string())),
            };
            let path = required_str(path, &field("payload.absoluteFilePath"))?;
            let mime_type = required_str(mime, &field("payload.mimeType"))?;

            let absolute_path = PathBuf::from(&path);
            if !absolute_path.is_absolute() {
                return Err(Error::invalid(field("payload.absoluteFilePath"), path));
            }
            Ok(Part::File {
                name,
                absolute_path,
                mime_type,
            })
        }
        _ => Err(Error::invalid(field("type"), kind)),
    }
}

/// A required string: absent, `null` or blank is missing; any non-string is
/// invalid.
fn required_str(value: Option<&Value>, field: &str) -> Result<String> {
    match value {
        None | Some(Value::Null) => Err(Error::missing(field)),
        Some(Value::String(s)) if s.trim().is_empty() => Err(Error::missing(field)),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(Error::invalid(field, other.to_string())),
    }
}

fn parse_url(value: Option<&Value>) -> Result<Url> {
    let raw = required_str(value, "url")?;
    let url = Url::parse(&raw).map_err(|_| Error::invalid("url", raw.clone()))?;
    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(url),
        _ => Err(Error::invalid("url", raw)),
    }
}

fn parse_headers(value: Option<&Value>) -> Result<Headers> {
    match value {
        None | Some(Value::Null) => Ok(Headers::new()),
        Some(Value::Object(map)) => map
            .iter()
            .map(|(name, value)| match value {
                Value::String(v) if is_header(name, v) => Ok((name.clone(), v.clone())),
                Value::String(v) => Err(Error::invalid(format!("headers.{name}"), v.clone())),
                other => Err(Error::invalid(format!("headers.{name}"), other.to_string())),
            })
            .collect(),
        Some(other) => Err(Error::invalid("headers", other.to_string())),
    }
}

/// Header pairs must be sendable as-is: token names, no CR/LF/NUL in values.
fn is_header(name: &str, value: &str) -> bool {
    http::HeaderName::from_bytes(name.as_bytes()).is_ok()
        && http::HeaderValue::from_str(value).is_ok()
}
