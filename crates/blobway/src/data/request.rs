use std::fmt;
use std::path::{Path, PathBuf};

use url::Url;

/// Ordered request headers. Insertion order is kept as received.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl FromIterator<(String, String)> for Headers {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Abstract storage category a download lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TargetKind {
    /// Ephemeral storage the platform may purge.
    #[default]
    Cache,
    /// Durable application storage.
    Persistent,
}

impl TargetKind {
    /// Parse a boundary token. Matching is case-insensitive.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "cache" => Some(TargetKind::Cache),
            "data" | "persistent" => Some(TargetKind::Persistent),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TargetKind::Cache => "cache",
            TargetKind::Persistent => "persistent",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a download should be written, before resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationSpec {
    pub filename: String,
    pub target_kind: TargetKind,
}

/// One named field of a multipart/form-data body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    String {
        name: String,
        value: String,
    },
    File {
        name: String,
        absolute_path: PathBuf,
        mime_type: String,
    },
}

impl Part {
    pub fn string(name: impl Into<String>, value: impl Into<String>) -> Self {
        Part::String {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn file(
        name: impl Into<String>,
        absolute_path: impl Into<PathBuf>,
        mime_type: impl Into<String>,
    ) -> Self {
        Part::File {
            name: name.into(),
            absolute_path: absolute_path.into(),
            mime_type: mime_type.into(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Part::String { name, .. } | Part::File { name, .. } => name,
        }
    }

    /// Basename advertised in the `filename` disposition parameter.
    pub fn file_name(&self) -> Option<String> {
        match self {
            Part::String { .. } => None,
            Part::File { absolute_path, .. } => Some(basename(absolute_path)),
        }
    }
}

fn basename(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string())
}

/// Direction-specific half of a request. Exactly one is ever present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Direction {
    Download(DestinationSpec),
    Upload { parts: Vec<Part>, return_response: bool },
}

/// A validated transfer request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub task_id: String,
    pub url: Url,
    pub headers: Headers,
    pub direction: Direction,
}

impl TransferRequest {
    /// HTTP method implied by the direction.
    pub fn method(&self) -> &'static str {
        match self.direction {
            Direction::Download(_) => "GET",
            Direction::Upload { .. } => "POST",
        }
    }
}
