use clap::{CommandFactory, Parser, error::ErrorKind};
use log::{debug, error};
use notify_discord::{Error, cli::Cli};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    // .env values feed the env fallbacks of the flags
    dotenvy::dotenv().ok();
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => return usage_exit(&e),
    };

    let level = if cli.debug { "debug" } else { "info" };
    env_logger::init_from_env(env_logger::Env::default().default_filter_or(level));
    debug!("args: {cli:?}");

    match notify_discord::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            if matches!(e, Error::NoInput) {
                Cli::command()
                    .print_help()
                    .unwrap_or_else(|e| debug!("failed to print help: {e}"));
            }
            ExitCode::FAILURE
        }
    }
}

/// Help and version exit with success, every usage error with 1.
fn usage_exit(e: &clap::Error) -> ExitCode {
    // Nothing is logged yet, so a broken stdout/stderr has nowhere to go.
    e.print().ok();
    match e.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    }
}
