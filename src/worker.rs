use log::{debug, info};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use url::Url;

use crate::config::OutputFormat;
use crate::content::Assembler;
use crate::error::Error;
use crate::webhook::{Delivered, DeliveryRequest, Overrides, Transport, Webhook};

/// Where the message text came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Positional arguments, joined with a space.
    Args(String),
    /// Lines read from standard input.
    Lines(Vec<String>),
    /// Neither arguments nor any stdin line.
    Empty,
}

/// Positional arguments win. Otherwise `stdin`, when given, is read to the end.
pub async fn read_input<R>(message: &[String], stdin: Option<R>) -> Result<Input, Error>
where
    R: AsyncBufRead + Unpin,
{
    if !message.is_empty() {
        return Ok(Input::Args(message.join(" ")));
    }

    let Some(reader) = stdin else {
        return Ok(Input::Empty);
    };

    // Invalid UTF-8 is replaced, not rejected, so any log can be piped in.
    let mut segments = reader.split(b'\n');
    let mut buffer = Vec::new();
    while let Some(mut line) = segments.next_segment().await? {
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        buffer.push(String::from_utf8_lossy(&line).into_owned());
    }
    debug!("read {} lines from stdin", buffer.len());

    if buffer.is_empty() {
        Ok(Input::Empty)
    } else {
        Ok(Input::Lines(buffer))
    }
}

/// Splits the input into the messages to post, one delivery each.
///
/// Stdin lines form a single message unless `each_line` is set, in which
/// case every non-blank line is posted on its own. With nothing to say, an
/// upload is still sent with empty content.
pub fn plan_messages(input: Input, each_line: bool, has_upload: bool) -> Result<Vec<String>, Error> {
    let messages = match input {
        Input::Args(message) => vec![message],
        Input::Lines(lines) if each_line => lines
            .into_iter()
            .filter(|line| !line.trim().is_empty())
            .collect(),
        Input::Lines(lines) => vec![lines.join("\n")],
        Input::Empty if has_upload => vec![String::new()],
        Input::Empty => Vec::new(),
    };

    if messages.is_empty() {
        return Err(Error::NoInput);
    }
    Ok(messages)
}

/// Posts every message in order, stopping at the first failure.
pub async fn notify<T: Transport>(
    webhook: &Webhook<T>,
    assembler: &Assembler,
    target: &Url,
    overrides: &Overrides,
    messages: &[String],
    output: OutputFormat,
) -> Result<Vec<Delivered>, Error> {
    let mut delivered = Vec::with_capacity(messages.len());

    for message in messages {
        let request = DeliveryRequest {
            url: target.clone(),
            payload: assembler.assemble(message),
            overrides: overrides.clone(),
        };
        let outcome = webhook.send(&request).await?;
        report(&outcome, output);
        delivered.push(outcome);
    }

    info!("Notify done!");
    Ok(delivered)
}

fn report(delivered: &Delivered, output: OutputFormat) {
    match render(delivered, output) {
        Some(json) => println!("{json}"),
        None => info!("notify done: {}", delivered.status),
    }
}

/// The text printed to stdout for `output`, if any.
pub fn render(delivered: &Delivered, output: OutputFormat) -> Option<String> {
    match output {
        OutputFormat::Json => Some(format!("{:#}", delivered.body)),
        OutputFormat::Text => None,
    }
}
