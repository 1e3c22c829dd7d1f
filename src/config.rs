use clap::ValueEnum;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::{
    fmt, fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};
use url::Url;

use crate::error::Error;

const DEFAULT_FILE_NAME: &str = ".notify-discord.json";

/// How a successful delivery is reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Log a one-line confirmation.
    #[default]
    Text,
    /// Print the created message returned by Discord.
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => f.write_str("text"),
            OutputFormat::Json => f.write_str("json"),
        }
    }
}

/// Options that can be given as flags or stored in the config file.
///
/// Every field is optional so the same type describes the flag values, the
/// file contents and the merged result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputFormat>,
}

/// Result of [`Config::merge`].
#[derive(Debug)]
pub struct Merged {
    pub config: Config,
    /// Fields given in both sources, where the argument value was kept.
    pub overridden: Vec<&'static str>,
}

impl Config {
    /// `$HOME/.notify-discord.json`
    pub fn default_path() -> Result<PathBuf, Error> {
        dirs::home_dir()
            .map(|home| home.join(DEFAULT_FILE_NAME))
            .ok_or(Error::NoHomeDir)
    }

    /// Merges flag values over file values, field by field.
    ///
    /// An argument value always wins; a warning is logged when it shadows a
    /// value from the file. Empty strings count as absent. An unset `output`
    /// stays unset so saving never persists the default; see
    /// [`Config::output_format`]. The merged result is validated before it is
    /// returned.
    pub fn merge(args: Config, file: Config) -> Result<Merged, Error> {
        let mut overridden = Vec::new();

        let config = Config {
            webhook_url: pick(
                "webhook-url",
                non_empty(args.webhook_url),
                non_empty(file.webhook_url),
                &mut overridden,
            ),
            username: pick(
                "username",
                non_empty(args.username),
                non_empty(file.username),
                &mut overridden,
            ),
            avatar_url: pick(
                "avatar-url",
                non_empty(args.avatar_url),
                non_empty(file.avatar_url),
                &mut overridden,
            ),
            output: pick("output", args.output, file.output, &mut overridden),
        };

        config.validate()?;
        Ok(Merged { config, overridden })
    }

    /// Checks that every URL field holds an absolute URL.
    pub fn validate(&self) -> Result<(), Error> {
        for (name, value) in [
            ("webhook-url", &self.webhook_url),
            ("avatar-url", &self.avatar_url),
        ] {
            if let Some(value) = value {
                Url::parse(value).map_err(|e| {
                    Error::Validation(format!("{name} is not a valid URL ({value}): {e}"))
                })?;
            }
        }
        Ok(())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Config, Error> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("config file content: {content}");

        let value: serde_json::Value =
            serde_json::from_str(&content).map_err(|source| Error::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;
        let config: Config = serde_json::from_value(value)
            .map_err(|e| Error::Validation(format!("{}: {e}", path.display())))?;

        config.validate()?;
        Ok(config)
    }

    /// Same as [`Config::load_from_file`], but a missing file is an empty config.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Config, Error> {
        match Self::load_from_file(&path) {
            Err(Error::ConfigRead { path, source }) if source.kind() == ErrorKind::NotFound => {
                debug!("config file {} not found, using defaults", path.display());
                Ok(Config::default())
            }
            other => other,
        }
    }

    /// Writes the config as JSON indented with four spaces, replacing the file.
    pub fn save_as_file<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let path = path.as_ref();
        let write_error = |source: std::io::Error| Error::ConfigWrite {
            path: path.to_path_buf(),
            source,
        };

        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut serializer)
            .map_err(|e| write_error(e.into()))?;

        fs::write(path, buf).map_err(write_error)?;
        info!("Successfully saved in {}", path.display());
        Ok(())
    }

    /// The webhook URL with `wait=true` appended, so Discord answers with
    /// the created message.
    pub fn webhook_target(&self) -> Result<Url, Error> {
        let raw = self
            .webhook_url
            .as_deref()
            .ok_or(Error::MissingWebhookUrl)?;
        let mut url = Url::parse(raw)
            .map_err(|e| Error::Validation(format!("webhook-url is not a valid URL: {e}")))?;
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| key != "wait")
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        url.query_pairs_mut()
            .clear()
            .extend_pairs(pairs)
            .append_pair("wait", "true");
        Ok(url)
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output.unwrap_or_default()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn pick<T: fmt::Display>(
    name: &'static str,
    arg: Option<T>,
    file: Option<T>,
    overridden: &mut Vec<&'static str>,
) -> Option<T> {
    match (arg, file) {
        (Some(arg), Some(_)) => {
            warn!("{name} is specified in both args and config file. args value is used: {arg}");
            overridden.push(name);
            Some(arg)
        }
        (arg, file) => arg.or(file),
    }
}
