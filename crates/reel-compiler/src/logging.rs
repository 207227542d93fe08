//! Per-compilation structured logging.
//!
//! Each pipeline stage reports typed fields instead of free text, so JSON
//! logs can be filtered by compilation, stage and timing policy.

use tracing::{error, info, warn, Span};
use uuid::Uuid;

use reel_models::CompiledVideo;

use crate::error::CompileError;
use crate::timing::SceneTimeline;

/// Stage logger for one compilation.
#[derive(Debug, Clone, Copy)]
pub struct CompilationLogger {
    compilation_id: Uuid,
}

impl CompilationLogger {
    pub fn new(compilation_id: Uuid) -> Self {
        Self { compilation_id }
    }

    /// Span wrapping the compile future; subprocess logs nest under it.
    pub fn span(&self) -> Span {
        tracing::info_span!("compilation", compilation_id = %self.compilation_id)
    }

    pub fn inputs_received(&self, image_count: usize, audio_bytes: usize) {
        info!(
            compilation_id = %self.compilation_id,
            stage = "inputs",
            image_count,
            audio_bytes,
            "Compilation started"
        );
    }

    pub fn script_parsed(&self, scene_count: usize) {
        info!(
            compilation_id = %self.compilation_id,
            stage = "parse",
            scene_count,
            "Script parsed"
        );
    }

    pub fn audio_probed(&self, audio_duration: f64) {
        info!(
            compilation_id = %self.compilation_id,
            stage = "probe",
            audio_duration,
            "Voiceover probed"
        );
    }

    pub fn timeline_computed(&self, timeline: &SceneTimeline) {
        info!(
            compilation_id = %self.compilation_id,
            stage = "timing",
            policy = %timeline.policy.as_str(),
            intervals = timeline.intervals.len(),
            covered_secs = timeline.total_duration(),
            dropped = timeline.warnings.len(),
            "Scene timeline computed"
        );
    }

    pub fn segments_aligned(&self, segments: usize, notes: usize) {
        info!(
            compilation_id = %self.compilation_id,
            stage = "align",
            segments,
            notes,
            "Images aligned"
        );
    }

    pub fn warning(&self, message: &str) {
        warn!(
            compilation_id = %self.compilation_id,
            "Compilation warning: {}", message
        );
    }

    pub fn completed(&self, video: &CompiledVideo, elapsed_secs: f64) {
        info!(
            compilation_id = %self.compilation_id,
            duration = video.duration,
            size_mb = video.size_mb(),
            width = video.resolution.width,
            height = video.resolution.height,
            warnings = video.warnings.len(),
            elapsed_secs,
            "Compilation completed"
        );
    }

    pub fn failed(&self, err: &CompileError, elapsed_secs: f64) {
        error!(
            compilation_id = %self.compilation_id,
            kind = err.kind(),
            retryable = err.is_retryable(),
            elapsed_secs,
            "Compilation failed: {}", err.reason()
        );
    }
}
