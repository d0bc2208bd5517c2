//! Inbound request shapes: raw multipart form → validated `ImprovementRequest`.
//!
//! Validation never touches the filesystem or the network. Anything that fails
//! here is a 400 and nothing gets staged.

use std::fmt;
use std::str::FromStr;

use axum::extract::Multipart;
use bytes::Bytes;
use serde::Serialize;

use crate::errors::PipelineError;

// ────────────────────────────────────────────────────────────────────────────
// Formats
// ────────────────────────────────────────────────────────────────────────────

/// The closed set of document formats the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DocumentFormat {
    Pdf,
    Markdown,
    PlainText,
}

impl DocumentFormat {
    /// Matches a bare extension (no dot), case-insensitively.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(DocumentFormat::Pdf),
            "md" => Some(DocumentFormat::Markdown),
            "txt" => Some(DocumentFormat::PlainText),
            _ => None,
        }
    }

    /// Uses the text after the last `.`; a name without a dot has no format.
    pub fn from_filename(filename: &str) -> Option<Self> {
        filename
            .rsplit_once('.')
            .and_then(|(_, ext)| Self::from_extension(ext))
    }

    pub fn extension(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Markdown => "md",
            DocumentFormat::PlainText => "txt",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// What the caller wants back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum OutputFormat {
    #[default]
    Text,
    Pdf,
}

impl FromStr for OutputFormat {
    type Err = PipelineError;

    /// Blank means "use the default".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "text" => Ok(OutputFormat::Text),
            "pdf" => Ok(OutputFormat::Pdf),
            other => Err(PipelineError::Validation(format!(
                "Unsupported output format: {other}"
            ))),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Raw form
// ────────────────────────────────────────────────────────────────────────────

/// The uploaded resume, held in memory until it is staged.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub filename: String,
    pub bytes: Bytes,
}

/// Multipart fields exactly as received. Unknown fields are ignored.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub resume: Option<UploadedDocument>,
    pub job_description: Option<String>,
    pub improvement_prompt: Option<String>,
    pub output_format: Option<String>,
}

impl UploadForm {
    /// Drains the multipart stream. The whole body is bounded by the router's
    /// `DefaultBodyLimit`, so buffering the file is fine.
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, PipelineError> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            match name.as_str() {
                "resume" => {
                    let filename = field.file_name().unwrap_or_default().to_string();
                    let bytes = field.bytes().await?;
                    form.resume = Some(UploadedDocument { filename, bytes });
                }
                "job_description" => form.job_description = Some(field.text().await?),
                "improvement_prompt" => form.improvement_prompt = Some(field.text().await?),
                "output_format" => form.output_format = Some(field.text().await?),
                _ => {}
            }
        }

        Ok(form)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Validated request
// ────────────────────────────────────────────────────────────────────────────

/// A request that passed validation and is ready to stage.
#[derive(Debug, Clone)]
pub struct ImprovementRequest {
    pub document: UploadedDocument,
    pub format: DocumentFormat,
    pub job_description: String,
    pub improvement_prompt: String,
    pub output_format: OutputFormat,
}

/// Checks, in order: file present, filename present, extension allowed,
/// job description non-blank, output format recognised.
pub fn validate(form: UploadForm) -> Result<ImprovementRequest, PipelineError> {
    let document = form
        .resume
        .ok_or_else(|| PipelineError::Validation("No resume file uploaded".to_string()))?;

    if document.filename.is_empty() {
        return Err(PipelineError::Validation("No file selected".to_string()));
    }

    let format = DocumentFormat::from_filename(&document.filename).ok_or_else(|| {
        PipelineError::Validation(
            "Invalid file type. Supported types: PDF, Markdown, Text".to_string(),
        )
    })?;

    let job_description = form.job_description.unwrap_or_default().trim().to_string();
    if job_description.is_empty() {
        return Err(PipelineError::Validation(
            "Job description is required".to_string(),
        ));
    }

    let improvement_prompt = form.improvement_prompt.unwrap_or_default().trim().to_string();

    let output_format = match form.output_format.as_deref() {
        Some(raw) => raw.parse()?,
        None => OutputFormat::default(),
    };

    Ok(ImprovementRequest {
        document,
        format,
        job_description,
        improvement_prompt,
        output_format,
    })
}
