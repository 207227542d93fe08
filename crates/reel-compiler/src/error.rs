//! Compilation error types.

use thiserror::Error;

use reel_media::MediaError;
use reel_models::PayloadError;

pub type CompileResult<T> = Result<T, CompileError>;

/// Fatal compilation failures.
///
/// Soft conditions (duplicate images, borrowed or repeated images,
/// fast-start fallback, duration trim) are logged and recorded on the
/// compiled video instead.
#[derive(Debug, Error)]
pub enum CompileError {
    /// No scenes in the script, or no timeline could be derived from them.
    #[error("Script parse failed: {0}")]
    Parse(String),

    /// The voiceover's duration could not be determined.
    #[error("Audio probe failed: {0}")]
    Probe(#[source] MediaError),

    /// No image was available for the first interval.
    #[error("Image alignment failed: {0}")]
    AlignmentExhaustion(String),

    /// A render, concat or mux subprocess failed or timed out.
    #[error("Video composition failed: {0}")]
    Composition(#[source] MediaError),

    /// The final container did not pass media inspection.
    #[error("Video validation failed: {0}")]
    Validation(#[source] MediaError),

    #[error("Invalid payload: {0}")]
    Payload(#[from] PayloadError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<MediaError> for CompileError {
    fn from(err: MediaError) -> Self {
        if err.is_validation_failure() {
            Self::Validation(err)
        } else {
            Self::Composition(err)
        }
    }
}

impl CompileError {
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn alignment_exhausted(msg: impl Into<String>) -> Self {
        Self::AlignmentExhaustion(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Human-readable reason surfaced with a failed compilation status.
    pub fn reason(&self) -> String {
        match self {
            Self::Probe(e) | Self::Composition(e) | Self::Validation(e) => match e.stderr() {
                Some(stderr) => format!("{}: {}", self, last_line(stderr)),
                None => self.to_string(),
            },
            _ => self.to_string(),
        }
    }

    /// Short label for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Parse(_) => "parse",
            Self::Probe(_) => "probe",
            Self::AlignmentExhaustion(_) => "alignment",
            Self::Composition(_) => "composition",
            Self::Validation(_) => "validation",
            Self::Payload(_) => "payload",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
        }
    }

    /// Whether a job queue may retry the same inputs.
    ///
    /// Only timeouts and local I/O failures qualify; everything else fails
    /// the same way on every attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Probe(e) | Self::Composition(e) => e.is_timeout(),
            Self::Io(_) => true,
            _ => false,
        }
    }
}

fn last_line(text: &str) -> &str {
    text.lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("")
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_error_routing() {
        let err: CompileError = MediaError::validation_failed("no video stream").into();
        assert!(matches!(err, CompileError::Validation(_)));

        let err: CompileError = MediaError::Timeout(60).into();
        assert!(matches!(err, CompileError::Composition(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_reason_includes_stderr_tail() {
        let err: CompileError = MediaError::ffmpeg_failed(
            "FFmpeg exited with non-zero status",
            Some("frame=1\nscene_001.png: Invalid data found\n".to_string()),
            Some(1),
        )
        .into();
        assert_eq!(
            err.reason(),
            "Video composition failed: FFmpeg command failed: FFmpeg exited with non-zero status: scene_001.png: Invalid data found"
        );
        assert_eq!(err.kind(), "composition");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_fatal_errors_are_not_retryable() {
        assert!(!CompileError::parse("no scenes").is_retryable());
        assert!(!CompileError::alignment_exhausted("no images").is_retryable());
        assert_eq!(CompileError::parse("no scenes").reason(), "Script parse failed: no scenes");
    }
}
