//! Text extraction for staged documents (PDF / Markdown / plain text).
//!
//! Synchronous and CPU-bound for PDFs. The pipeline calls it inside
//! `tokio::task::spawn_blocking`.

use std::path::Path;

use pulldown_cmark::{html, Parser};
use tracing::debug;

use crate::errors::PipelineError;
use crate::pipeline::request::DocumentFormat;

/// Extracts text from the document at `path`.
///
/// `declared` wins over the file suffix. An unrecognised suffix fails before
/// the file is opened.
pub fn extract(path: &Path, declared: Option<DocumentFormat>) -> Result<String, PipelineError> {
    let format = match declared {
        Some(format) => format,
        None => detect_format(path)?,
    };

    let text = match format {
        DocumentFormat::Pdf => extract_pdf(path)?,
        DocumentFormat::Markdown => extract_markdown(path)?,
        DocumentFormat::PlainText => read_utf8(path, format)?,
    };

    debug!(%format, chars = text.len(), "Extracted document text");
    Ok(text)
}

fn detect_format(path: &Path) -> Result<DocumentFormat, PipelineError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();

    DocumentFormat::from_extension(&ext)
        .ok_or_else(|| PipelineError::Extraction(format!("Unsupported file type: {ext}")))
}

/// Pages in physical order, each followed by `\n`, then trimmed.
/// A page with no text layer contributes an empty string.
fn extract_pdf(path: &Path) -> Result<String, PipelineError> {
    let bytes = std::fs::read(path).map_err(pdf_error)?;

    // pdf-extract panics on some malformed inputs instead of returning Err
    let pages = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(&bytes))
        .map_err(|_| pdf_error("the PDF parser could not read this document"))?
        .map_err(pdf_error)?;

    Ok(join_pages(&pages))
}

fn join_pages(pages: &[String]) -> String {
    let mut text = String::new();
    for page in pages {
        text.push_str(page);
        text.push('\n');
    }
    text.trim().to_string()
}

fn pdf_error(cause: impl std::fmt::Display) -> PipelineError {
    PipelineError::Extraction(format!("Error extracting text from PDF: {cause}"))
}

/// Markdown is rendered to HTML and handed on as-is; markup is not stripped.
fn extract_markdown(path: &Path) -> Result<String, PipelineError> {
    let markdown = read_utf8(path, DocumentFormat::Markdown)?;

    let parser = Parser::new(&markdown);
    let mut html_output = String::new();
    html::push_html(&mut html_output, parser);
    Ok(html_output)
}

fn read_utf8(path: &Path, format: DocumentFormat) -> Result<String, PipelineError> {
    std::fs::read_to_string(path).map_err(|e| {
        PipelineError::Extraction(format!("Error reading {format} document: {e}"))
    })
}
