//! Post messages to a Discord channel through an incoming webhook.
//!
//! Options come from flags or from a JSON config file, with flags taking
//! precedence. Rate-limited deliveries are retried with a linear backoff.

use log::debug;
use std::io::IsTerminal;
use std::time::Duration;
use tokio::io::BufReader;

pub mod cli;
pub mod config;
pub mod content;
pub mod error;
pub mod webhook;
pub mod worker;

pub use error::Error;

use cli::Cli;
use config::{Config, Merged};
use content::Assembler;
use webhook::{Overrides, ReqwestTransport, Webhook};

/// Runs one invocation of the tool.
pub async fn run(cli: Cli) -> Result<(), Error> {
    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::default_path()?,
    };
    debug!("config file: {}", config_path.display());

    let file_config = Config::load_or_default(&config_path)?;
    let Merged { config, .. } = Config::merge(cli.config_args(), file_config)?;
    debug!("merged config: {config:?}");

    if cli.save_config {
        return config.save_as_file(&config_path);
    }

    let target = config.webhook_target()?;
    let assembler = Assembler::new(cli.content_options())?;

    let stdin = (!std::io::stdin().is_terminal()).then(|| BufReader::new(tokio::io::stdin()));
    let input = worker::read_input(&cli.message, stdin).await?;
    let messages = worker::plan_messages(input, cli.each_line, cli.file.is_some())?;

    let webhook = Webhook::new(ReqwestTransport::new(Duration::from_secs(cli.timeout))?);
    let overrides = Overrides {
        username: config.username.clone(),
        avatar_url: config.avatar_url.clone(),
    };

    worker::notify(
        &webhook,
        &assembler,
        &target,
        &overrides,
        &messages,
        config.output_format(),
    )
    .await?;
    Ok(())
}
