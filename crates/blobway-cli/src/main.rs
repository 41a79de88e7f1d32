use std::process::ExitCode;

use clap::Parser;

mod cli;
mod host;
mod logging;

use logging::error;

#[tokio::main]
async fn main() -> ExitCode {
    logging::init_tracing();
    let app = cli::App::parse();

    match host::run(app).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            error!("{e:#}");
            ExitCode::from(2)
        }
    }
}
