//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during media processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("{0} not found in PATH")]
    ToolNotFound(String),

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("{program} failed: {message}")]
    ToolFailed {
        program: String,
        message: String,
        exit_code: Option<i32>,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid audio file: {0}")]
    InvalidAudio(String),

    #[error("Invalid video file: {0}")]
    InvalidVideo(String),

    #[error("Output validation failed: {0}")]
    ValidationFailed(String),

    #[error("Invalid composition input: {0}")]
    InvalidInput(String),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create an FFprobe failure error.
    pub fn ffprobe_failed(message: impl Into<String>, stderr: Option<String>) -> Self {
        Self::FfprobeFailed {
            message: message.into(),
            stderr,
        }
    }

    /// Create a validation failure error.
    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::ValidationFailed(message.into())
    }

    /// Error for a tool missing from PATH.
    pub fn not_found(program: &str) -> Self {
        match program {
            "ffmpeg" => Self::FfmpegNotFound,
            "ffprobe" => Self::FfprobeNotFound,
            other => Self::ToolNotFound(other.to_string()),
        }
    }

    /// Error for a tool that exited unsuccessfully.
    pub fn tool_failed(program: &str, stderr: String, exit_code: Option<i32>) -> Self {
        let stderr = (!stderr.trim().is_empty()).then_some(stderr);
        match program {
            "ffmpeg" => Self::ffmpeg_failed("FFmpeg exited with non-zero status", stderr, exit_code),
            "ffprobe" => Self::ffprobe_failed("FFprobe exited with non-zero status", stderr),
            other => Self::ToolFailed {
                program: other.to_string(),
                message: stderr.unwrap_or_else(|| "exited with non-zero status".to_string()),
                exit_code,
            },
        }
    }

    /// Whether the final output failed container validation.
    pub fn is_validation_failure(&self) -> bool {
        matches!(self, Self::ValidationFailed(_) | Self::InvalidVideo(_))
    }

    /// Whether the failure came from a subprocess deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Captured stderr, when the failing tool produced any.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::FfmpegFailed { stderr, .. } | Self::FfprobeFailed { stderr, .. } => {
                stderr.as_deref()
            }
            _ => None,
        }
    }
}
