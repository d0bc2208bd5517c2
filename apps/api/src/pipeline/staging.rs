//! Scoped staging of uploaded bytes on disk.
//!
//! A `StagedFile` owns its path. Dropping it deletes the file, which covers the
//! success path, early `?` returns and panics inside `spawn_blocking` alike.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::errors::PipelineError;

const STAGED_PREFIX: &str = "jobify-";

/// Reduces an untrusted filename to `[A-Za-z0-9._-]`.
///
/// Path separators and whitespace become `_`, anything else outside the set is
/// dropped, and leading/trailing `.`/`_` are stripped so the result can never
/// name a parent directory or a dotfile. Falls back to `upload`.
pub fn sanitize_filename(filename: &str) -> String {
    let spaced: String = filename
        .chars()
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");

    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();

    let trimmed = kept.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        "upload".to_string()
    } else {
        trimmed.to_string()
    }
}

/// An uploaded document written to a uniquely named file under the staging root.
#[derive(Debug)]
pub struct StagedFile {
    file: NamedTempFile,
}

impl StagedFile {
    /// Writes `bytes` to `<dir>/jobify-<random>-<sanitized filename>`.
    ///
    /// The random component keeps concurrent uploads of the same filename apart.
    pub fn create(dir: &Path, filename: &str, bytes: &[u8]) -> Result<Self, PipelineError> {
        let suffix = format!("-{}", sanitize_filename(filename));

        let mut file = tempfile::Builder::new()
            .prefix(STAGED_PREFIX)
            .suffix(&suffix)
            .tempfile_in(dir)
            .map_err(|e| PipelineError::Internal(format!("Failed to stage upload: {e}")))?;

        file.write_all(bytes)
            .and_then(|_| file.flush())
            .map_err(|e| PipelineError::Internal(format!("Failed to stage upload: {e}")))?;

        debug!(path = %file.path().display(), size = bytes.len(), "Staged upload");
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        // NamedTempFile removes the file right after this
        debug!(path = %self.file.path().display(), "Removing staged upload");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_keeps_ordinary_names() {
        assert_eq!(sanitize_filename("resume.pdf"), "resume.pdf");
        assert_eq!(sanitize_filename("my-cv_v2.md"), "my-cv_v2.md");
    }

    #[test]
    fn test_sanitize_strips_traversal() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "etc_passwd");
        assert_eq!(sanitize_filename("..\\..\\boot.ini"), "boot.ini");
        assert_eq!(sanitize_filename("/abs/path/cv.txt"), "abs_path_cv.txt");
    }

    #[test]
    fn test_sanitize_replaces_whitespace_and_drops_unsafe_chars() {
        assert_eq!(sanitize_filename("My Resume (final).pdf"), "My_Resume_final.pdf");
        assert_eq!(sanitize_filename("résumé.txt"), "rsum.txt");
    }

    #[test]
    fn test_sanitize_falls_back_when_nothing_survives() {
        assert_eq!(sanitize_filename("..."), "upload");
        assert_eq!(sanitize_filename("///"), "upload");
    }

    #[test]
    fn test_staged_file_lives_under_dir_and_is_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let staged = StagedFile::create(dir.path(), "../resume.txt", b"hello").unwrap();
        let path = staged.path().to_path_buf();

        assert_eq!(path.parent().unwrap(), dir.path());
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with(STAGED_PREFIX));
        assert!(name.ends_with("-resume.txt"));
        assert_eq!(std::fs::read(&path).unwrap(), b"hello");

        drop(staged);
        assert!(!path.exists());
    }

    #[test]
    fn test_same_filename_stages_to_distinct_paths() {
        let dir = tempfile::tempdir().unwrap();
        let a = StagedFile::create(dir.path(), "resume.pdf", b"a").unwrap();
        let b = StagedFile::create(dir.path(), "resume.pdf", b"b").unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn test_missing_staging_dir_is_internal_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = StagedFile::create(&missing, "resume.txt", b"x").unwrap_err();
        assert!(matches!(err, PipelineError::Internal(_)));
    }
}
