// Prompt constants for the resume improvement call.

/// Fixed instruction block appended after the three input sections.
pub const IMPROVEMENT_INSTRUCTIONS: &str = "\
Please improve this resume based on the job description and improvement request.
Focus on matching relevant skills and experience while maintaining accuracy. \
Do NOT invent employers, titles, dates, credentials, or achievements that the resume does not support.
Format the output in a clean, professional way that will work well with ATS systems.";

/// Builds the single user message sent to the model.
///
/// Section order is fixed: resume, job description, improvement request,
/// instructions. Inputs are inserted literally, never re-scanned for placeholders.
pub fn build_prompt(resume_text: &str, job_description: &str, improvement_prompt: &str) -> String {
    format!(
        "RESUME:\n{resume_text}\n\n\
         JOB DESCRIPTION:\n{job_description}\n\n\
         IMPROVEMENT REQUEST:\n{improvement_prompt}\n\n\
         {IMPROVEMENT_INSTRUCTIONS}"
    )
}
