//! Wire shapes exchanged with the host.
//!
//! Inbound requests arrive as loosely typed JSON. Every field is kept as a
//! raw [`Value`] so that the validator, not the deserializer, decides what
//! is missing and what is invalid. Outbound documents mirror the result
//! and progress types in camelCase.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::data::{ResponseMetadata, TransferResult, TransferSuccess};
use crate::error::{Error, Result};

/// Direction-tagged inbound request.
#[derive(Debug, Clone, PartialEq)]
pub enum RawRequest {
    Fetch(RawFetchRequest),
    Upload(RawUploadRequest),
}

impl RawRequest {
    /// Split a JSON document on its `direction` tag.
    pub fn from_value(value: Value) -> Result<Self> {
        let mut map = match value {
            Value::Object(map) => map,
            other => return Err(Error::invalid("request", other.to_string())),
        };
        let direction = match map.remove("direction") {
            None | Some(Value::Null) => return Err(Error::missing("direction")),
            Some(Value::String(s)) => s,
            Some(other) => return Err(Error::invalid("direction", other.to_string())),
        };
        let body = Value::Object(map);
        let parsed = match direction.as_str() {
            "fetch" | "download" => serde_json::from_value(body).map(RawRequest::Fetch),
            "upload" => serde_json::from_value(body).map(RawRequest::Upload),
            _ => return Err(Error::invalid("direction", direction)),
        };
        parsed.map_err(|e| Error::invalid("request", e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| Error::invalid("request", e.to_string()))?;
        Self::from_value(value)
    }

    /// The task id as sent, if it is a string. Used to label failures that
    /// happen before validation completes.
    pub fn task_id_hint(&self) -> String {
        let raw = match self {
            RawRequest::Fetch(r) => r.task_id.as_ref(),
            RawRequest::Upload(r) => r.task_id.as_ref(),
        };
        raw.and_then(Value::as_str).unwrap_or_default().to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFetchRequest {
    #[serde(default)]
    pub task_id: Option<Value>,
    #[serde(default)]
    pub url: Option<Value>,
    #[serde(default)]
    pub filename: Option<Value>,
    #[serde(default)]
    pub headers: Option<Value>,
    #[serde(default)]
    pub destination_target_kind: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawUploadRequest {
    #[serde(default)]
    pub task_id: Option<Value>,
    #[serde(default)]
    pub url: Option<Value>,
    #[serde(default)]
    pub parts: Option<Value>,
    #[serde(default)]
    pub headers: Option<Value>,
    #[serde(default)]
    pub return_response: Option<Value>,
}

/// One upload part after shape normalization, fields still unchecked.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPart {
    pub name: Option<Value>,
    pub kind: Option<Value>,
    pub payload: Option<Value>,
    pub absolute_file_path: Option<Value>,
    pub mime_type: Option<Value>,
}

impl RawPart {
    fn from_fields(name: Option<Value>, mut fields: Map<String, Value>) -> Self {
        let name = name.or_else(|| fields.remove("name"));
        Self {
            name,
            kind: fields.remove("type"),
            payload: fields.remove("payload"),
            absolute_file_path: fields.remove("absoluteFilePath"),
            mime_type: fields.remove("mimeType"),
        }
    }
}

impl RawUploadRequest {
    /// Normalize `parts` into one ordered list.
    ///
    /// Accepts either `[{name, type, payload}, ...]` or
    /// `{ "<name>": {type, payload}, ... }`; in the keyed form the map order
    /// is the part order. Returns `Ok(None)` when `parts` is absent.
    pub fn normalized_parts(&self) -> Result<Option<Vec<RawPart>>> {
        let parts = match &self.parts {
            None | Some(Value::Null) => return Ok(None),
            Some(value) => value,
        };
        let normalized = match parts {
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| match item {
                    Value::Object(fields) => Ok(RawPart::from_fields(None, fields.clone())),
                    other => Err(Error::invalid(format!("parts[{i}]"), other.to_string())),
                })
                .collect::<Result<Vec<_>>>()?,
            Value::Object(keyed) => keyed
                .iter()
                .map(|(name, item)| match item {
                    Value::Object(fields) => Ok(RawPart::from_fields(
                        Some(Value::String(name.clone())),
                        fields.clone(),
                    )),
                    other => Err(Error::invalid(format!("parts.{name}"), other.to_string())),
                })
                .collect::<Result<Vec<_>>>()?,
            other => return Err(Error::invalid("parts", other.to_string())),
        };
        Ok(Some(normalized))
    }
}

/// Response section of a success document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseDocument {
    pub code: u16,
    pub headers: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl From<&ResponseMetadata> for ResponseDocument {
    fn from(meta: &ResponseMetadata) -> Self {
        let headers = meta
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        Self {
            code: meta.status,
            headers,
            data: meta.body.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchedDocument {
    pub task_id: String,
    pub absolute_file_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub response: ResponseDocument,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedDocument {
    pub task_id: String,
    pub response: ResponseDocument,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedDocument {
    pub task_id: String,
    pub error_kind: &'static str,
    pub message: String,
}

/// Outbound terminal document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResultDocument {
    Fetched(FetchedDocument),
    Uploaded(UploadedDocument),
    Failed(FailedDocument),
}

impl From<&TransferResult> for ResultDocument {
    fn from(result: &TransferResult) -> Self {
        match result {
            TransferResult::Success {
                task_id,
                payload: TransferSuccess::Download(file),
            } => ResultDocument::Fetched(FetchedDocument {
                task_id: task_id.clone(),
                absolute_file_path: file.absolute_file_path.to_string_lossy().into_owned(),
                mime_type: file.mime_type.clone(),
                response: ResponseDocument::from(&file.response),
            }),
            TransferResult::Success {
                task_id,
                payload: TransferSuccess::Upload(response),
            } => ResultDocument::Uploaded(UploadedDocument {
                task_id: task_id.clone(),
                response: ResponseDocument::from(response),
            }),
            TransferResult::Failure {
                task_id,
                error_kind,
                message,
            } => ResultDocument::Failed(FailedDocument {
                task_id: task_id.clone(),
                error_kind: error_kind.code(),
                message: message.clone(),
            }),
        }
    }
}
