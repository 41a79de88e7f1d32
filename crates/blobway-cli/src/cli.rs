use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use serde_json::{Map, Value, json};

#[derive(Clone, Debug, Parser)]
#[command(name = "blobway", version = env!("CARGO_PKG_VERSION"), about, long_about = None, propagate_version = true)]
pub struct App {
    /// Engine configuration file (TOML)
    #[arg(long, short, global = true, env = "BLOBWAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Do not print progress events
    #[arg(long, short, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    #[command(alias = "f", name = "fetch", about = "Download a URL into a storage root")]
    Fetch(FetchArg),
    #[command(alias = "u", name = "upload", about = "POST a multipart/form-data body")]
    Upload(UploadArg),
    #[command(name = "run", about = "Run JSON request documents")]
    Run(RunArg),
    #[command(name = "roots", about = "Print the resolved storage roots")]
    Roots,
}

#[derive(Clone, Debug, Args)]
pub struct FetchArg {
    pub url: String,
    /// File name under the storage root
    pub filename: String,
    #[arg(long, default_value = "cli-fetch")]
    pub task_id: String,
    /// `cache` (default), `data` or `persistent`
    #[arg(long, short)]
    pub target: Option<String>,
    /// Request header, `NAME: VALUE`
    #[arg(long = "header", short = 'H', value_name = "NAME: VALUE")]
    pub headers: Vec<String>,
}

#[derive(Clone, Debug, Args)]
pub struct UploadArg {
    pub url: String,
    #[arg(long, default_value = "cli-upload")]
    pub task_id: String,
    /// Form part in order: `name=value`, or `name=@/abs/path[;type=mime]`
    #[arg(long = "form", short = 'F', value_name = "NAME=VALUE", required = true)]
    pub parts: Vec<String>,
    #[arg(long = "header", short = 'H', value_name = "NAME: VALUE")]
    pub headers: Vec<String>,
    /// Include the response body in the result
    #[arg(long)]
    pub return_response: bool,
}

#[derive(Clone, Debug, Args)]
pub struct RunArg {
    /// Request documents; `-` reads newline-delimited JSON from stdin
    #[arg(required = true)]
    pub requests: Vec<String>,
}

impl FetchArg {
    pub fn to_document(&self) -> Result<Value> {
        let mut doc = json!({
            "direction": "fetch",
            "taskId": self.task_id,
            "url": self.url,
            "filename": self.filename,
            "headers": header_map(&self.headers)?,
        });
        if let Some(target) = &self.target {
            doc["destinationTargetKind"] = Value::String(target.clone());
        }
        Ok(doc)
    }
}

impl UploadArg {
    pub fn to_document(&self) -> Result<Value> {
        let parts = self
            .parts
            .iter()
            .map(|spec| form_part(spec))
            .collect::<Result<Vec<_>>>()?;
        Ok(json!({
            "direction": "upload",
            "taskId": self.task_id,
            "url": self.url,
            "parts": parts,
            "headers": header_map(&self.headers)?,
            "returnResponse": self.return_response,
        }))
    }
}

fn header_map(headers: &[String]) -> Result<Map<String, Value>> {
    headers
        .iter()
        .map(|h| {
            let (name, value) = h
                .split_once(':')
                .with_context(|| format!("header `{h}` is not `NAME: VALUE`"))?;
            Ok((name.trim().to_string(), Value::String(value.trim().to_string())))
        })
        .collect()
}

/// curl-style `-F` value to a request part.
fn form_part(spec: &str) -> Result<Value> {
    let Some((name, value)) = spec.split_once('=') else {
        bail!("form part `{spec}` is not `NAME=VALUE`");
    };
    let Some(file) = value.strip_prefix('@') else {
        return Ok(json!({"name": name, "type": "string", "payload": value}));
    };
    let (path, mime) = match file.split_once(";type=") {
        Some((path, mime)) => (path, mime),
        None => (file, "application/octet-stream"),
    };
    Ok(json!({
        "name": name,
        "type": "file",
        "payload": {"absoluteFilePath": path, "mimeType": mime},
    }))
}
