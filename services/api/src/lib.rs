mod cli;
mod demo;
mod infra;
mod routes;
mod server;
mod validate;

use ccne_report::error::AppError;
use std::process::ExitCode;

pub async fn run() -> Result<ExitCode, AppError> {
    cli::run().await
}
