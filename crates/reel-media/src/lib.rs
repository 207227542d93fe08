//! FFmpeg CLI wrapper for scene video assembly.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - A runner seam with per-call timeouts and progress parsing
//! - Audio duration probing and container validation via FFprobe
//! - Fast-start post-processing
//! - The scene compositor (render, concat, mux, fast-start, validate)

pub mod command;
pub mod compose;
pub mod error;
pub mod faststart;
pub mod probe;
pub mod progress;
pub mod runner;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use command::{FfmpegCommand, ToolInvocation};
pub use compose::{
    Composition, CompositorConfig, ToolTimeouts, VideoCompositor, DEFAULT_FADE_SECS,
    DEFAULT_MISMATCH_TOLERANCE_SECS,
};
pub use error::{MediaError, MediaResult};
pub use faststart::FaststartOutcome;
pub use probe::{probe_audio_duration, probe_media, validate_container, MediaInfo};
pub use progress::FfmpegProgress;
pub use runner::{check_ffmpeg, check_ffprobe, CommandRunner, ProcessRunner, ToolOutput};
