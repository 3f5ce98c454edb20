use crate::demo::{run_demo, DemoArgs};
use crate::server;
use crate::validate::{run_validate, ValidateArgs};
use ccne_report::error::AppError;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(
    name = "CCNE Standard IV Report Wizard",
    about = "Serve, validate, and demonstrate the CCNE Standard IV report wizard",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Validate a saved form snapshot and list the issues per step
    Validate(ValidateArgs),
    /// Fill, review, and submit a sample report from the command line
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Persist form snapshots under this directory instead of in memory
    #[arg(long)]
    pub(crate) snapshot_dir: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<ExitCode, AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await.map(|()| ExitCode::SUCCESS),
        Command::Validate(args) => run_validate(args),
        Command::Demo(args) => run_demo(args).await,
    }
}
