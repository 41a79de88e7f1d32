use std::io::{BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use blobway::{
    EngineConfig, Error, ProgressEvent, RawRequest, ReqwestClient, ResultDocument, TargetKind,
    TransferEngine, map_outcome,
};
use serde::Serialize;
use serde_json::json;

use crate::cli::{App, Commands, RunArg};
use crate::logging::*;

/// Run one command line. Returns `true` when every transfer succeeded.
pub async fn run(app: App) -> Result<bool> {
    let config = load_config(app.config.as_deref())?;
    debug!(?config, "configuration loaded");

    let requests = match &app.cmd {
        Commands::Roots => {
            print_roots(&config);
            return Ok(true);
        }
        Commands::Fetch(arg) => vec![RawRequest::from_value(arg.to_document()?)],
        Commands::Upload(arg) => vec![RawRequest::from_value(arg.to_document()?)],
        Commands::Run(arg) => read_requests(arg)?,
    };

    if config.cache_root.is_none() || config.persistent_root.is_none() {
        config
            .platform_roots()
            .ensure()
            .context("failed to create platform storage roots")?;
    }

    let mut options = config.transfer_options();
    if !app.quiet {
        options = options.on_progress(Arc::new(|event: &ProgressEvent| print_json(event)));
    }
    let client = ReqwestClient::from_config(&config).context("failed to build HTTP client")?;
    let engine = TransferEngine::new(client, config.storage_provider()).with_options(options);

    let mut rejected = Vec::new();
    let mut handles = Vec::new();
    for request in requests {
        match request {
            Ok(raw) => handles.push(engine.spawn(raw)),
            Err(err) => rejected.push(err),
        }
    }

    let interrupt = {
        let engine = engine.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let n = engine.registry().cancel_all();
                warn!(transfers = n, "interrupted, cancelling");
            }
        })
    };

    let mut all_ok = true;
    for err in rejected {
        all_ok = false;
        print_json(&ResultDocument::from(&map_outcome("", Err(err))));
    }
    for handle in handles {
        let result = handle.join().await;
        all_ok &= result.is_success();
        print_json(&ResultDocument::from(&result));
    }
    interrupt.abort();

    Ok(all_ok)
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

fn read_requests(arg: &RunArg) -> Result<Vec<Result<RawRequest, Error>>> {
    let mut requests = Vec::new();
    for source in &arg.requests {
        if source == "-" {
            for line in std::io::stdin().lock().lines() {
                let line = line.context("failed to read stdin")?;
                if !line.trim().is_empty() {
                    requests.push(RawRequest::from_json(&line));
                }
            }
        } else {
            requests.push(RawRequest::from_json(source));
        }
    }
    Ok(requests)
}

fn print_roots(config: &EngineConfig) {
    let provider = config.storage_provider();
    print_json(&json!({
        "cache": provider.root(TargetKind::Cache),
        "persistent": provider.root(TargetKind::Persistent),
    }));
}

/// One JSON document per stdout line.
fn print_json<T: Serialize + ?Sized>(value: &T) {
    let line = match serde_json::to_string(value) {
        Ok(line) => line,
        Err(e) => {
            error!(error = %e, "failed to encode output");
            return;
        }
    };
    let mut out = std::io::stdout().lock();
    if let Err(e) = writeln!(out, "{line}").and_then(|()| out.flush()) {
        error!(error = %e, "failed to write output");
    }
}
