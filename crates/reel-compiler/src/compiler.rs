//! Compilation orchestrator.
//!
//! Drives one compilation end to end:
//! parse → probe audio → compute timings → align images → compose.
//!
//! Each compilation owns a fresh scratch directory under the configured
//! work directory. The directory is a [`tempfile::TempDir`], so it is
//! removed on success, on every error path and when the compile future is
//! dropped mid-flight.

use std::time::Instant;

use chrono::Utc;
use tempfile::TempDir;
use tracing::{info, warn, Instrument};
use uuid::Uuid;

use reel_media::{probe_audio_duration, CommandRunner, ProcessRunner, VideoCompositor};
use reel_models::{AudioPayload, CompiledVideo, ImageAsset, Resolution};

use crate::align::align;
use crate::config::CompilerConfig;
use crate::error::{CompileError, CompileResult};
use crate::logging::CompilationLogger;
use crate::script::parse_script;
use crate::timing::compute_timings;

/// Everything one compilation consumes.
#[derive(Debug, Clone)]
pub struct CompilationRequest {
    /// Raw script text with `Scene N` markers
    pub script_text: String,
    /// Voiceover bytes
    pub audio: AudioPayload,
    /// Scene images, tagged or untagged
    pub images: Vec<ImageAsset>,
}

impl CompilationRequest {
    pub fn new(script_text: impl Into<String>, audio: AudioPayload, images: Vec<ImageAsset>) -> Self {
        Self {
            script_text: script_text.into(),
            audio,
            images,
        }
    }
}

/// Compiles scripts, voiceovers and images into MP4 videos.
pub struct VideoCompiler<R = ProcessRunner> {
    runner: R,
    config: CompilerConfig,
}

impl VideoCompiler<ProcessRunner> {
    /// Compiler that runs the FFmpeg tools found on `PATH`.
    pub fn new(config: CompilerConfig) -> Self {
        Self::with_runner(ProcessRunner::new(), config)
    }
}

impl<R: CommandRunner> VideoCompiler<R> {
    pub fn with_runner(runner: R, config: CompilerConfig) -> Self {
        Self { runner, config }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Compile one video.
    ///
    /// Fails before any subprocess runs when the script has no scenes, no
    /// timeline can be derived or no images were supplied.
    pub async fn compile(&self, request: CompilationRequest) -> CompileResult<CompiledVideo> {
        let compilation_id = Uuid::new_v4();
        let logger = CompilationLogger::new(compilation_id);
        let span = logger.span();
        let started = Instant::now();

        logger.inputs_received(request.images.len(), request.audio.bytes.len());

        let result = self
            .run(compilation_id, &logger, request)
            .instrument(span)
            .await;

        let elapsed_secs = started.elapsed().as_secs_f64();
        let outcome = match &result {
            Ok(video) => {
                logger.completed(video, elapsed_secs);
                "success"
            }
            Err(e) => {
                logger.failed(e, elapsed_secs);
                e.kind()
            }
        };

        metrics::counter!("reel_compilations_total", "outcome" => outcome).increment(1);
        metrics::histogram!("reel_compile_duration_seconds").record(elapsed_secs);

        result
    }

    async fn run(
        &self,
        compilation_id: Uuid,
        logger: &CompilationLogger,
        request: CompilationRequest,
    ) -> CompileResult<CompiledVideo> {
        self.config.validate().map_err(CompileError::Config)?;

        let scenes = parse_script(&request.script_text)?;
        if request.images.is_empty() {
            return Err(CompileError::alignment_exhausted("no images were supplied"));
        }
        logger.script_parsed(scenes.len());

        let scratch = self.create_scratch_dir().await?;
        let scratch_dir = scratch.path();

        let audio_path = scratch_dir.join(request.audio.file_name());
        tokio::fs::write(&audio_path, &request.audio.bytes).await?;

        let audio_duration = probe_audio_duration(&self.runner, &audio_path, self.config.timeouts.probe)
            .await
            .map_err(CompileError::Probe)?;
        logger.audio_probed(audio_duration);

        let timeline = compute_timings(&scenes, audio_duration);
        if timeline.is_empty() {
            return Err(CompileError::parse(format!(
                "no timing intervals could be derived from {} scenes",
                scenes.len()
            )));
        }
        logger.timeline_computed(&timeline);

        let (segments, alignment_warnings) =
            align(&timeline.intervals, &request.images, scratch_dir).await?;
        logger.segments_aligned(segments.len(), alignment_warnings.len());

        let compositor = VideoCompositor::new(&self.runner, self.config.compositor_config());
        let composition = compositor
            .compose(&segments, &audio_path, audio_duration, scratch_dir)
            .await?;

        let video_bytes = tokio::fs::read(&composition.output_path).await?;

        let mut warnings = timeline.warnings;
        warnings.extend(alignment_warnings);
        warnings.extend(composition.warnings);
        for warning in &warnings {
            logger.warning(warning);
        }

        close_scratch_dir(scratch);

        Ok(CompiledVideo {
            compilation_id,
            size_bytes: video_bytes.len() as u64,
            video_bytes,
            duration: composition.info.duration,
            resolution: Resolution {
                width: composition.info.width,
                height: composition.info.height,
            },
            codec_profile: self.config.encoding.codec_profile(),
            created_at: Utc::now(),
            timings: timeline.intervals,
            warnings,
        })
    }

    async fn create_scratch_dir(&self) -> CompileResult<TempDir> {
        tokio::fs::create_dir_all(&self.config.work_dir).await?;
        let dir = tempfile::Builder::new()
            .prefix("reel-")
            .tempdir_in(&self.config.work_dir)?;
        info!("Created scratch directory {}", dir.path().display());
        Ok(dir)
    }
}

/// Remove the scratch directory, logging rather than failing on error.
fn close_scratch_dir(dir: TempDir) {
    let path = dir.path().to_path_buf();
    if let Err(e) = dir.close() {
        warn!("Failed to remove scratch directory {}: {}", path.display(), e);
    }
}
