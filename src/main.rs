use anyhow::Result;
use clap::Parser;
use dockclean::cli::{self, Cli};
use dockclean::infra::logging::init_logging;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let status = cli::run(cli).await?;
    Ok(ExitCode::from(status))
}
