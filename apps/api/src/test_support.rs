//! Stubs and request builders shared by the unit tests.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::auth::{AuthError, Claims, TokenVerifier};
use crate::llm_client::{CompletionModel, LlmError, ModelCompletion};

pub const VALID_TOKEN: &str = "valid-token";
pub const BOUNDARY: &str = "----jobify-test-boundary";

/// Canned model. Records every prompt, and optionally how many entries a
/// watched directory held at the moment of each call.
pub struct StubModel {
    reply: Result<String, String>,
    watch_dir: Option<PathBuf>,
    prompts: Mutex<Vec<String>>,
    files_at_call: Mutex<Vec<usize>>,
}

impl StubModel {
    pub fn replying(text: &str) -> Self {
        Self::with_reply(Ok(text.to_string()))
    }

    pub fn failing(message: &str) -> Self {
        Self::with_reply(Err(message.to_string()))
    }

    fn with_reply(reply: Result<String, String>) -> Self {
        Self {
            reply,
            watch_dir: None,
            prompts: Mutex::new(Vec::new()),
            files_at_call: Mutex::new(Vec::new()),
        }
    }

    pub fn watching(mut self, dir: &Path) -> Self {
        self.watch_dir = Some(dir.to_path_buf());
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn files_at_call(&self) -> Vec<usize> {
        self.files_at_call.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionModel for StubModel {
    async fn complete(&self, prompt: &str) -> Result<ModelCompletion, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(dir) = &self.watch_dir {
            self.files_at_call.lock().unwrap().push(file_count(dir));
        }
        match &self.reply {
            Ok(text) => Ok(ModelCompletion { text: text.clone() }),
            Err(message) => Err(LlmError::Api {
                status: 503,
                message: message.clone(),
            }),
        }
    }
}

/// Accepts exactly `VALID_TOKEN`.
pub struct StubVerifier;

#[async_trait]
impl TokenVerifier for StubVerifier {
    async fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        if token == VALID_TOKEN {
            Ok(Claims {
                sub: "auth0|tester".to_string(),
            })
        } else {
            Err(AuthError::InvalidToken("signature mismatch".to_string()))
        }
    }
}

pub fn file_count(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

/// One multipart part: field name, optional filename, raw bytes.
pub struct Part<'a> {
    pub name: &'a str,
    pub filename: Option<&'a str>,
    pub bytes: &'a [u8],
}

impl<'a> Part<'a> {
    pub fn text(name: &'a str, value: &'a str) -> Self {
        Self {
            name,
            filename: None,
            bytes: value.as_bytes(),
        }
    }

    pub fn file(name: &'a str, filename: &'a str, bytes: &'a [u8]) -> Self {
        Self {
            name,
            filename: Some(filename),
            bytes,
        }
    }
}

/// Encodes parts as a `multipart/form-data` body delimited by `BOUNDARY`.
pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part.filename {
            Some(filename) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{filename}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n",
                        part.name
                    )
                    .as_bytes(),
                );
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", part.name)
                        .as_bytes(),
                );
            }
        }
        body.extend_from_slice(part.bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={BOUNDARY}")
}
