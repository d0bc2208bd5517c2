use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::info;

use crate::auth::AuthenticatedUser;
use crate::errors::PipelineError;
use crate::pipeline::render::{RenderedResult, PDF_CONTENT_TYPE, PDF_FILENAME};
use crate::pipeline::request::UploadForm;
use crate::state::AppState;

/// POST /api/process_resume
///
/// Multipart fields: `resume` (file), `job_description`, `improvement_prompt`,
/// `output_format` (`text` | `pdf`). Text output is wrapped in the JSON success
/// envelope; PDF output is returned as a bare attachment.
pub async fn handle_process_resume(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, PipelineError> {
    info!("Processing resume for {}", claims.sub);

    let multipart = multipart.map_err(PipelineError::from)?;
    let form = UploadForm::from_multipart(multipart).await?;

    let response = match state.pipeline.process(form).await? {
        RenderedResult::Text(improved_resume) => Json(json!({
            "success": true,
            "improved_resume": improved_resume,
        }))
        .into_response(),
        RenderedResult::Pdf(bytes) => (
            [
                (header::CONTENT_TYPE, PDF_CONTENT_TYPE.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{PDF_FILENAME}\""),
                ),
            ],
            bytes,
        )
            .into_response(),
    };

    Ok(response)
}
