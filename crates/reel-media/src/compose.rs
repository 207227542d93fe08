//! Scene video composition.
//!
//! Turns aligned still images plus a voiceover into one MP4:
//! 1. Render each segment as a fixed-length faded clip at the target size
//! 2. Concatenate clips in segment order into a silent video
//! 3. Mux with the voiceover, trimming to the shorter stream
//! 4. Apply fast-start (soft failure)
//! 5. Validate the container with FFprobe (hard failure)
//!
//! Every subprocess runs sequentially: concatenation needs all clips on
//! disk. Intermediate files live in the caller's scratch directory and are
//! removed on every exit path.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, warn};

use reel_models::{AlignedSegment, EncodingConfig, RenderTarget};

use crate::command::FfmpegCommand;
use crate::error::{MediaError, MediaResult};
use crate::faststart::{apply_faststart, discard_partial, FaststartOutcome};
use crate::probe::{validate_container, MediaInfo};
use crate::runner::CommandRunner;

/// Default fade-in/fade-out length in seconds.
pub const DEFAULT_FADE_SECS: f64 = 0.5;

/// Default tolerated gap between rendered video and audio length.
pub const DEFAULT_MISMATCH_TOLERANCE_SECS: f64 = 0.25;

/// Final output file name inside the scratch directory.
pub const OUTPUT_FILE_NAME: &str = "output.mp4";

/// Per-step subprocess deadlines.
#[derive(Debug, Clone)]
pub struct ToolTimeouts {
    pub probe: Duration,
    pub segment: Duration,
    pub concat: Duration,
    pub mux: Duration,
    pub faststart: Duration,
}

impl Default for ToolTimeouts {
    fn default() -> Self {
        Self {
            probe: Duration::from_secs(10),
            segment: Duration::from_secs(60),
            concat: Duration::from_secs(60),
            mux: Duration::from_secs(180),
            faststart: Duration::from_secs(60),
        }
    }
}

/// Compositor settings.
#[derive(Debug, Clone)]
pub struct CompositorConfig {
    pub target: RenderTarget,
    pub encoding: EncodingConfig,
    /// Fade-in and fade-out length per clip
    pub fade_secs: f64,
    pub timeouts: ToolTimeouts,
    /// Larger video/audio length differences are reported as warnings
    pub mismatch_tolerance_secs: f64,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            target: RenderTarget::default(),
            encoding: EncodingConfig::default(),
            fade_secs: DEFAULT_FADE_SECS,
            timeouts: ToolTimeouts::default(),
            mismatch_tolerance_secs: DEFAULT_MISMATCH_TOLERANCE_SECS,
        }
    }
}

/// Result of a successful composition.
#[derive(Debug, Clone)]
pub struct Composition {
    /// Validated MP4 inside the scratch directory
    pub output_path: PathBuf,
    /// FFprobe view of the output
    pub info: MediaInfo,
    pub faststart: FaststartOutcome,
    /// Sum of rendered segment durations
    pub rendered_duration: f64,
    /// Soft warnings (duration trim, fast-start fallback)
    pub warnings: Vec<String>,
}

/// Drives FFmpeg to assemble aligned segments into a video.
pub struct VideoCompositor<'a> {
    runner: &'a dyn CommandRunner,
    config: CompositorConfig,
}

impl<'a> VideoCompositor<'a> {
    pub fn new(runner: &'a dyn CommandRunner, config: CompositorConfig) -> Self {
        Self { runner, config }
    }

    pub fn config(&self) -> &CompositorConfig {
        &self.config
    }

    /// Compose `segments` with the audio at `audio_path`.
    ///
    /// `audio_duration` is the probed voiceover length, used only to report
    /// how much `-shortest` trims.
    pub async fn compose(
        &self,
        segments: &[AlignedSegment],
        audio_path: &Path,
        audio_duration: f64,
        scratch_dir: &Path,
    ) -> MediaResult<Composition> {
        if segments.is_empty() {
            return Err(MediaError::InvalidInput("no segments to render".to_string()));
        }

        let mut intermediates = IntermediateFiles::default();
        let mut warnings = Vec::new();

        info!(
            "Composing {} segments at {} with audio {}",
            segments.len(),
            self.config.target,
            audio_path.display()
        );

        // Step 1: one faded clip per segment
        let mut clips = Vec::with_capacity(segments.len());
        for (index, segment) in segments.iter().enumerate() {
            let clip = intermediates.track(scratch_dir.join(format!("clip_{:04}.mp4", index)));
            info!(
                "Rendering segment {}/{}: scene {} ({:.2}s)",
                index + 1,
                segments.len(),
                segment.scene_number,
                segment.duration
            );
            self.render_segment(segment, &clip).await?;
            metrics::counter!("reel_segments_rendered_total").increment(1);
            clips.push(clip);
        }

        // Step 2: concatenate in segment order
        let list = intermediates.track(scratch_dir.join("concat.txt"));
        tokio::fs::write(&list, concat_list(&clips)).await?;
        let silent = intermediates.track(scratch_dir.join("video_no_audio.mp4"));
        self.concat(&list, &silent).await?;

        // Step 3: mux with audio
        let rendered_duration: f64 = segments.iter().map(|s| s.duration).sum();
        if let Some(message) = duration_mismatch(
            rendered_duration,
            audio_duration,
            self.config.mismatch_tolerance_secs,
        ) {
            warn!("{}", message);
            warnings.push(message);
        }

        let muxed = intermediates.track(scratch_dir.join("muxed.mp4"));
        self.mux(&silent, audio_path, &muxed).await?;

        // Step 4: fast-start (soft)
        let output = scratch_dir.join(OUTPUT_FILE_NAME);
        let faststart = apply_faststart(
            self.runner,
            &muxed,
            &output,
            self.config.timeouts.faststart,
            &mut warnings,
        )
        .await?;

        // Step 5: validate (hard)
        let info = match validate_container(self.runner, &output, self.config.timeouts.probe).await {
            Ok(info) => info,
            Err(e) => {
                warn!("Discarding unplayable output {}: {}", output.display(), e);
                discard_partial(&output).await;
                return Err(e);
            }
        };

        if !info.has_audio() {
            let message = format!("{} has no audio stream", output.display());
            warn!("{}", message);
            warnings.push(message);
        }

        intermediates.cleanup();

        info!(
            "Composition complete: {} ({:.2}s, {}x{}, fast-start: {})",
            output.display(),
            info.duration,
            info.width,
            info.height,
            faststart.as_str()
        );

        Ok(Composition {
            output_path: output,
            info,
            faststart,
            rendered_duration,
            warnings,
        })
    }

    async fn render_segment(&self, segment: &AlignedSegment, clip: &Path) -> MediaResult<()> {
        if segment.duration.is_nan() || segment.duration <= 0.0 {
            return Err(MediaError::InvalidInput(format!(
                "scene {} has non-positive duration {:.3}",
                segment.scene_number, segment.duration
            )));
        }

        let filter = segment_filter(&self.config.target, segment.duration, self.config.fade_secs);
        debug!(scene_number = segment.scene_number, filter = %filter, "Segment filter");

        let cmd = FfmpegCommand::new(&segment.resolved_image_path, clip)
            .loop_input()
            .video_filter(filter)
            .duration(segment.duration)
            .frame_rate(self.config.target.fps)
            .output_args(self.config.encoding.video_args())
            .no_audio();

        self.runner
            .run(&cmd.to_invocation(), self.config.timeouts.segment)
            .await?;
        Ok(())
    }

    async fn concat(&self, list: &Path, output: &Path) -> MediaResult<()> {
        info!("Concatenating segments into {}", output.display());

        let cmd = FfmpegCommand::new(list, output)
            .input_format("concat")
            .input_args(["-safe", "0"])
            .codec_copy();

        self.runner
            .run(&cmd.to_invocation(), self.config.timeouts.concat)
            .await?;
        Ok(())
    }

    async fn mux(&self, video: &Path, audio: &Path, output: &Path) -> MediaResult<()> {
        info!("Muxing video with audio track");

        let cmd = FfmpegCommand::new(video, output)
            .add_input(audio)
            .map("0:v:0")
            .map("1:a:0")
            .output_args(self.config.encoding.video_args())
            .output_args(self.config.encoding.audio_args())
            .shortest();

        self.runner
            .run(&cmd.to_invocation(), self.config.timeouts.mux)
            .await?;
        Ok(())
    }
}

/// Video filter for one clip: letterbox to `target`, fade in at 0 and fade
/// out so the fade ends exactly at `duration`.
///
/// Clips shorter than the fade start their fade-out at 0. A zero fade
/// length leaves both fade filters out.
pub fn segment_filter(target: &RenderTarget, duration: f64, fade_secs: f64) -> String {
    // FFmpeg reads `d=0` as "use nb_frames", which still fades.
    if fade_secs <= 0.0 {
        return target.scale_pad_filter();
    }
    let fade_out_start = (duration - fade_secs).max(0.0);
    format!(
        "{},fade=t=in:st=0:d={:.3},fade=t=out:st={:.3}:d={:.3}",
        target.scale_pad_filter(),
        fade_secs,
        fade_out_start,
        fade_secs
    )
}

/// Concat demuxer list for `clips`, in order.
pub fn concat_list(clips: &[PathBuf]) -> String {
    clips
        .iter()
        .map(|clip| {
            let escaped = clip.to_string_lossy().replace('\'', r"'\''");
            format!("file '{}'\n", escaped)
        })
        .collect()
}

/// Warning text when `-shortest` will drop more than `tolerance` seconds.
pub fn duration_mismatch(video_secs: f64, audio_secs: f64, tolerance: f64) -> Option<String> {
    let diff = video_secs - audio_secs;
    if diff.abs() <= tolerance {
        return None;
    }
    let trimmed = if diff > 0.0 { "video" } else { "audio" };
    Some(format!(
        "rendered video is {:.2}s and audio is {:.2}s; {:.2}s of {} will be trimmed",
        video_secs,
        audio_secs,
        diff.abs(),
        trimmed
    ))
}

/// Intermediate files removed when dropped.
#[derive(Debug, Default)]
struct IntermediateFiles {
    paths: Vec<PathBuf>,
}

impl IntermediateFiles {
    fn track(&mut self, path: PathBuf) -> PathBuf {
        self.paths.push(path.clone());
        path
    }

    fn cleanup(&mut self) {
        for path in self.paths.drain(..) {
            if path.exists() {
                if let Err(e) = std::fs::remove_file(&path) {
                    warn!("Failed to remove intermediate {}: {}", path.display(), e);
                }
            }
        }
    }
}

impl Drop for IntermediateFiles {
    fn drop(&mut self) {
        self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedRunner;
    use reel_models::AlignmentPolicy;
    use tempfile::TempDir;

    fn segment(dir: &Path, scene: u32, start: f64, duration: f64) -> AlignedSegment {
        let path = dir.join(format!("scene_{:03}_{:04}.png", scene, scene - 1));
        std::fs::write(&path, b"png").unwrap();
        AlignedSegment {
            scene_number: scene,
            resolved_image_path: path,
            start_time: start,
            duration,
            policy: AlignmentPolicy::Matched,
        }
    }

    fn audio(dir: &Path) -> PathBuf {
        let path = dir.join("audio.wav");
        std::fs::write(&path, b"RIFF").unwrap();
        path
    }

    fn remaining_files(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_segment_filter_fades() {
        let filter = segment_filter(&RenderTarget::hd(), 10.0, 0.5);
        assert!(filter.contains("fade=t=in:st=0:d=0.500"));
        assert!(filter.contains("fade=t=out:st=9.500:d=0.500"));
    }

    #[test]
    fn test_segment_filter_clamps_short_clips() {
        let filter = segment_filter(&RenderTarget::hd(), 0.3, 0.5);
        assert!(filter.contains("fade=t=out:st=0.000:d=0.500"));
    }

    #[test]
    fn test_segment_filter_without_fade() {
        let filter = segment_filter(&RenderTarget::hd(), 10.0, 0.0);
        assert!(!filter.contains("fade="));
        assert_eq!(filter, RenderTarget::hd().scale_pad_filter());
    }

    #[test]
    fn test_concat_list_escapes_quotes() {
        let list = concat_list(&[PathBuf::from("/tmp/a.mp4"), PathBuf::from("/tmp/it's.mp4")]);
        assert_eq!(list, "file '/tmp/a.mp4'\nfile '/tmp/it'\\''s.mp4'\n");
    }

    #[test]
    fn test_duration_mismatch() {
        assert!(duration_mismatch(40.0, 40.1, 0.25).is_none());
        let message = duration_mismatch(25.0, 30.0, 0.25).unwrap();
        assert!(message.contains("5.00s of audio"));
        let message = duration_mismatch(31.0, 30.0, 0.25).unwrap();
        assert!(message.contains("of video"));
    }

    #[tokio::test]
    async fn test_compose_runs_steps_in_order_and_cleans_up() {
        let dir = TempDir::new().unwrap();
        let segments = vec![
            segment(dir.path(), 1, 0.0, 10.0),
            segment(dir.path(), 2, 10.0, 20.0),
            segment(dir.path(), 3, 30.0, 10.0),
        ];
        let audio = audio(dir.path());
        let runner = ScriptedRunner::new();

        let compositor = VideoCompositor::new(&runner, CompositorConfig::default());
        let composition = compositor
            .compose(&segments, &audio, 40.0, dir.path())
            .await
            .unwrap();

        assert_eq!(composition.output_path, dir.path().join(OUTPUT_FILE_NAME));
        assert_eq!(composition.faststart, FaststartOutcome::Remux);
        assert!(composition.warnings.is_empty());
        assert!((composition.rendered_duration - 40.0).abs() < 1e-9);

        let calls = runner.invocations();
        let programs: Vec<&str> = calls.iter().map(|c| c.program.as_str()).collect();
        // 3 renders, concat, mux, remux, validate
        assert_eq!(
            programs,
            ["ffmpeg", "ffmpeg", "ffmpeg", "ffmpeg", "ffmpeg", "ffmpeg", "ffprobe"]
        );
        assert!(calls[0].args.contains(&"scale=1280:720:force_original_aspect_ratio=decrease,pad=1280:720:(ow-iw)/2:(oh-ih)/2,setsar=1,fade=t=in:st=0:d=0.500,fade=t=out:st=9.500:d=0.500".to_string()));
        assert!(calls[3].args.contains(&"concat".to_string()));
        assert!(calls[4].args.contains(&"-shortest".to_string()));
        assert!(calls[5].args.contains(&"+faststart".to_string()));

        let remaining = remaining_files(dir.path());
        assert!(remaining.contains(&OUTPUT_FILE_NAME.to_string()));
        assert!(!remaining.iter().any(|n| n.starts_with("clip_")));
        assert!(!remaining.contains(&"concat.txt".to_string()));
        assert!(!remaining.contains(&"muxed.mp4".to_string()));
    }

    #[tokio::test]
    async fn test_compose_prefers_qt_faststart() {
        let dir = TempDir::new().unwrap();
        let segments = vec![segment(dir.path(), 1, 0.0, 5.0)];
        let audio = audio(dir.path());
        let runner = ScriptedRunner::new().with_available("qt-faststart");

        let compositor = VideoCompositor::new(&runner, CompositorConfig::default());
        let composition = compositor
            .compose(&segments, &audio, 5.0, dir.path())
            .await
            .unwrap();

        assert_eq!(composition.faststart, FaststartOutcome::QtFaststart);
        assert_eq!(runner.count("qt-faststart"), 1);
    }

    #[tokio::test]
    async fn test_faststart_failure_is_soft() {
        let dir = TempDir::new().unwrap();
        let segments = vec![segment(dir.path(), 1, 0.0, 5.0)];
        let audio = audio(dir.path());
        let runner = ScriptedRunner::new()
            .with_available("qt-faststart")
            .fail_on("qt-faststart", "")
            .fail_on("ffmpeg", "+faststart");

        let compositor = VideoCompositor::new(&runner, CompositorConfig::default());
        let composition = compositor
            .compose(&segments, &audio, 5.0, dir.path())
            .await
            .unwrap();

        assert_eq!(composition.faststart, FaststartOutcome::Skipped);
        assert_eq!(composition.warnings.len(), 1);
        assert!(composition.output_path.exists());
    }

    #[tokio::test]
    async fn test_render_failure_cleans_intermediates() {
        let dir = TempDir::new().unwrap();
        let segments = vec![
            segment(dir.path(), 1, 0.0, 5.0),
            segment(dir.path(), 2, 5.0, 5.0),
        ];
        let audio = audio(dir.path());
        let runner = ScriptedRunner::new().fail_on("ffmpeg", "scene_002");

        let compositor = VideoCompositor::new(&runner, CompositorConfig::default());
        let err = compositor
            .compose(&segments, &audio, 10.0, dir.path())
            .await
            .unwrap_err();

        assert!(matches!(err, MediaError::FfmpegFailed { .. }));
        assert_eq!(runner.count("ffmpeg"), 2);
        assert!(!remaining_files(dir.path()).iter().any(|n| n.starts_with("clip_")));
    }

    #[tokio::test]
    async fn test_validation_failure_discards_output() {
        let dir = TempDir::new().unwrap();
        let segments = vec![segment(dir.path(), 1, 0.0, 5.0)];
        let audio = audio(dir.path());
        let runner = ScriptedRunner::new().with_probe_json("moov atom not found");

        let compositor = VideoCompositor::new(&runner, CompositorConfig::default());
        let err = compositor
            .compose(&segments, &audio, 5.0, dir.path())
            .await
            .unwrap_err();

        assert!(err.is_validation_failure());
        assert!(!dir.path().join(OUTPUT_FILE_NAME).exists());
    }

    #[tokio::test]
    async fn test_mismatch_is_reported_as_warning() {
        let dir = TempDir::new().unwrap();
        let segments = vec![
            segment(dir.path(), 1, 0.0, 10.0),
            segment(dir.path(), 2, 10.0, 15.0),
        ];
        let audio = audio(dir.path());
        let runner = ScriptedRunner::new();

        let compositor = VideoCompositor::new(&runner, CompositorConfig::default());
        let composition = compositor
            .compose(&segments, &audio, 30.0, dir.path())
            .await
            .unwrap();

        assert_eq!(composition.warnings.len(), 1);
        assert!(composition.warnings[0].contains("5.00s of audio"));
    }

    #[tokio::test]
    async fn test_rejects_empty_and_degenerate_segments() {
        let dir = TempDir::new().unwrap();
        let audio = audio(dir.path());
        let runner = ScriptedRunner::new();
        let compositor = VideoCompositor::new(&runner, CompositorConfig::default());

        let err = compositor.compose(&[], &audio, 5.0, dir.path()).await.unwrap_err();
        assert!(matches!(err, MediaError::InvalidInput(_)));

        let segments = vec![segment(dir.path(), 1, 0.0, 0.0)];
        let err = compositor
            .compose(&segments, &audio, 5.0, dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::InvalidInput(_)));
        assert!(runner.invocations().is_empty());
    }
}
