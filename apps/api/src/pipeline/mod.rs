//! Resume processing pipeline.
//!
//! Flow: validate → stage → extract → build prompt → model completion → render.
//!
//! The staged upload is gone before the model is called, whether extraction
//! succeeded, failed, or panicked. Every failure leaves as a `PipelineError`.

pub mod extract;
pub mod font_metrics;
pub mod prompts;
pub mod render;
pub mod request;
pub mod staging;

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::errors::PipelineError;
use crate::llm_client::{CompletionModel, MISSING_API_KEY};
use crate::pipeline::extract::extract;
use crate::pipeline::prompts::build_prompt;
use crate::pipeline::render::{render, RenderedResult};
use crate::pipeline::request::{validate, ImprovementRequest, UploadForm};
use crate::pipeline::staging::StagedFile;

/// Orchestrates one request end to end. Holds only read-only configuration,
/// so a single instance is shared by every request.
#[derive(Clone)]
pub struct ResumePipeline {
    upload_dir: PathBuf,
    /// `None` when no API key was configured at startup.
    model: Option<Arc<dyn CompletionModel>>,
}

impl ResumePipeline {
    pub fn new(upload_dir: PathBuf, model: Option<Arc<dyn CompletionModel>>) -> Self {
        Self { upload_dir, model }
    }

    pub async fn process(&self, form: UploadForm) -> Result<RenderedResult, PipelineError> {
        let request_id = Uuid::new_v4();
        self.run(form)
            .instrument(info_span!("process_resume", %request_id))
            .await
    }

    async fn run(&self, form: UploadForm) -> Result<RenderedResult, PipelineError> {
        // Step 1: Validate (no filesystem or network side effects)
        let request = validate(form)?;
        info!(
            "Validated upload {:?} ({}, {} bytes), output={:?}",
            request.document.filename,
            request.format,
            request.document.bytes.len(),
            request.output_format
        );

        // Step 2: Model availability is a configuration precondition
        let model = self.model()?;

        // Step 3: Stage + extract, cleanup on every exit
        let document_text = self.stage_and_extract(&request).await?;

        // Step 4: Prompt + single completion call
        let prompt = build_prompt(
            &document_text,
            &request.job_description,
            &request.improvement_prompt,
        );
        let completion = model
            .complete(&prompt)
            .await
            .map_err(|e| PipelineError::Model(format!("Error processing resume: {e}")))?;
        info!("Model returned {} chars", completion.text.len());

        // Step 5: Render
        let output_format = request.output_format;
        tokio::task::spawn_blocking(move || render(completion.text, output_format))
            .await
            .map_err(|e| PipelineError::Render(format!("Render task failed: {e}")))?
    }

    fn model(&self) -> Result<&dyn CompletionModel, PipelineError> {
        self.model
            .as_deref()
            .ok_or_else(|| PipelineError::Internal(MISSING_API_KEY.to_string()))
    }

    /// Stages the upload and extracts its text on the blocking pool.
    ///
    /// The `StagedFile` lives entirely inside the closure, so it is dropped
    /// (and the file deleted) before this returns, including on panic unwind.
    async fn stage_and_extract(&self, request: &ImprovementRequest) -> Result<String, PipelineError> {
        let upload_dir = self.upload_dir.clone();
        let document = request.document.clone();
        let format = request.format;

        tokio::task::spawn_blocking(move || {
            let staged = StagedFile::create(&upload_dir, &document.filename, &document.bytes)?;
            extract(staged.path(), Some(format))
        })
        .await
        .map_err(|e| PipelineError::Extraction(format!("Extraction task failed: {e}")))?
    }
}
