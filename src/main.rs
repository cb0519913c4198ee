#![allow(non_snake_case)]

use std::process::ExitCode;

use tailorTalk::cli;
use tailorTalk::config::{AppConfig, ServerSettings, ShellSettings};
use tailorTalk::error::BookingError;
use tailorTalk::logging;
use tailorTalk::runtime;
use tracing::error;

const DEFAULT_RUN_MODE: &str = "cli";

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, kind = err.label(), "startup failed");
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), BookingError> {
    let config = AppConfig::discover()?;
    let get_prop = |key: &str| -> Option<String> { config.lookup(key) };

    let run_mode = get_prop("RUN_MODE").unwrap_or(DEFAULT_RUN_MODE.to_string());
    match run_mode.as_str() {
        "api" => runtime::run_api(ServerSettings::from_lookup(get_prop)?).await,
        "cli" => cli::cli(ShellSettings::from_lookup(get_prop)?).await,
        other => Err(BookingError::Configuration(format!(
            "Invalid run mode {other}"
        ))),
    }
}
