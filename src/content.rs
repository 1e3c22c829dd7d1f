use log::debug;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::error::Error;

/// Attachment name used by `--as-file` when no `--file` name is given.
pub const DEFAULT_AS_FILE_NAME: &str = "notify-discord.txt";

const AS_FILE_FIELD: &str = "file0";
const UPLOAD_FIELD: &str = "file1";

/// A file part of the multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub field: &'static str,
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub mime: Option<&'static str>,
}

/// What goes into one message: the `content` field and its files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payload {
    pub content: Option<String>,
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Default)]
pub struct ContentOptions {
    /// Language tag of the code block; `Some("")` makes an untagged block.
    pub code_block: Option<String>,
    /// Extra file to upload, or the attachment name in as-file mode.
    pub file: Option<PathBuf>,
    /// Send the text itself as an attachment instead of as `content`.
    pub as_file: bool,
}

/// Encloses `content` in a markdown code block when a language is given.
pub fn wrap_code_block(content: &str, language: Option<&str>) -> String {
    match language {
        Some(language) => format!("```{language}\n{content}\n```"),
        None => content.to_string(),
    }
}

/// Builds payloads from raw text. The upload file, if any, is read once on
/// construction and attached to every payload.
#[derive(Debug)]
pub struct Assembler {
    code_block: Option<String>,
    as_file_name: Option<String>,
    upload: Option<Attachment>,
}

impl Assembler {
    pub fn new(options: ContentOptions) -> Result<Self, Error> {
        if options.as_file {
            let name = options
                .file
                .as_deref()
                .map_or_else(|| DEFAULT_AS_FILE_NAME.to_string(), base_name);
            return Ok(Self {
                code_block: options.code_block,
                as_file_name: Some(name),
                upload: None,
            });
        }

        let upload = options.file.as_deref().map(read_upload).transpose()?;
        Ok(Self {
            code_block: options.code_block,
            as_file_name: None,
            upload,
        })
    }

    pub fn assemble(&self, raw: &str) -> Payload {
        let text = wrap_code_block(raw, self.code_block.as_deref());

        if let Some(file_name) = &self.as_file_name {
            return Payload {
                content: None,
                attachments: vec![Attachment {
                    field: AS_FILE_FIELD,
                    file_name: file_name.clone(),
                    bytes: text.into_bytes(),
                    mime: Some("text/plain"),
                }],
            };
        }

        Payload {
            content: Some(text),
            attachments: self.upload.iter().cloned().collect(),
        }
    }
}

fn read_upload(path: &Path) -> Result<Attachment, Error> {
    let bytes = fs::read(path).map_err(|source| Error::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("read {} bytes from {}", bytes.len(), path.display());

    Ok(Attachment {
        field: UPLOAD_FIELD,
        file_name: base_name(path),
        bytes,
        mime: None,
    })
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or(path.as_os_str())
        .to_string_lossy()
        .into_owned()
}
