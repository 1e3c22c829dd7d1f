use clap::Parser;
use std::path::PathBuf;

use crate::config::{Config, OutputFormat};
use crate::content::ContentOptions;

const EXAMPLES: &str = r#"Configuration file:
  Options can be saved in a config file to change the default behavior:
    notify-discord --save-config --webhook-url https://discord.com/api/webhooks/YOUR/WEBHOOK_URL

  {
    "webhook-url": "Discord's webhook URL",
    "username":    "Override Discord's webhook username",
    "avatar-url":  "Override Discord's webhook avatar icon URL",
    "output":      "text or json"
  }

  When an option is found in both args and file, the args value is used.

Examples:
  1. post plain text message
      echo "Finished something" | notify-discord

  2. post text message and upload some file
      date > /tmp/date.log && echo "finished" | notify-discord --file /tmp/date.log

  3. post a command output as file named "long-run.log"
      (for i in $(seq 1 5); do echo $i; sleep 1; done) | notify-discord --as-file --file long-run.log

  4. post json data as a json code block
      cat package.json | notify-discord --code-block json

  5. post log as a plain code block
      tail /var/log/messages 2>&1 | notify-discord --code-block """#;

/// notify-discord - post messages to Discord channel by webhook
#[derive(Parser, Debug)]
#[command(name = "notify-discord", version, about, after_help = EXAMPLES)]
pub struct Cli {
    /// Message to post. Read from stdin when omitted.
    pub message: Vec<String>,

    /// Upload file. With --as-file, the name of the attachment instead.
    #[arg(long, value_name = "UPLOAD_FILE_PATH")]
    pub file: Option<PathBuf>,

    /// Send the input as a file (default name "notify-discord.txt").
    #[arg(long)]
    pub as_file: bool,

    /// Enclose the message in a markdown code block with this language.
    #[arg(long, value_name = "LANGUAGE")]
    pub code_block: Option<String>,

    /// Post every stdin line as its own message.
    #[arg(long)]
    pub each_line: bool,

    /// Save the config options in the config file and exit.
    #[arg(long)]
    pub save_config: bool,

    /// Discord's webhook URL.
    #[arg(long, env = "NOTIFY_DISCORD_WEBHOOK_URL", value_name = "WEBHOOK_URL")]
    pub webhook_url: Option<String>,

    /// Override the webhook's username.
    #[arg(long, env = "NOTIFY_DISCORD_USERNAME", value_name = "USERNAME")]
    pub username: Option<String>,

    /// Override the webhook's avatar icon URL.
    #[arg(long, env = "NOTIFY_DISCORD_AVATAR_URL", value_name = "AVATAR_URL")]
    pub avatar_url: Option<String>,

    /// Output format [default: text]
    #[arg(long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Config file path [default: $HOME/.notify-discord.json]
    #[arg(long, value_name = "CONFIG_FILE_PATH")]
    pub config: Option<PathBuf>,

    /// Request timeout in seconds.
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    pub timeout: u64,

    /// Debug logging.
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// The config options given on the command line.
    pub fn config_args(&self) -> Config {
        Config {
            webhook_url: self.webhook_url.clone(),
            username: self.username.clone(),
            avatar_url: self.avatar_url.clone(),
            output: self.output,
        }
    }

    pub fn content_options(&self) -> ContentOptions {
        ContentOptions {
            code_block: self.code_block.clone(),
            file: self.file.clone(),
            as_file: self.as_file,
        }
    }
}
