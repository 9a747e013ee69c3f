use clap::Parser;
use nexsync_lib::cli::Cli;
use nexsync_lib::config::AppConfig;
use nexsync_lib::logging::init_logging;
use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = AppConfig::load(cli.config.as_deref())?;
    init_logging(&config.log, cli.quiet, cli.verbose)?;

    nexsync_lib::commands::run(cli, config).await
}
