use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Validation(String),
    #[error("Failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Failed to write config file {path}: {source}")]
    ConfigWrite {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to read upload file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("HTTP request error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Rate limited: gave up after {attempts} attempts")]
    RateLimitExhausted { attempts: u32 },
    #[error("notify failed: status={status} message={body}")]
    ServerRejected { status: u16, body: String },
    #[error("Response body is not valid JSON: {0}")]
    ResponseParse(#[source] serde_json::Error),
    #[error("webhook URL is not configured")]
    MissingWebhookUrl,
    #[error("No input from stdin or argument")]
    NoInput,
    #[error("Could not determine the home directory for the default config file")]
    NoHomeDir,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
