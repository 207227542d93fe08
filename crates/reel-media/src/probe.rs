//! FFprobe media inspection.
//!
//! Two uses: reading the voiceover's duration before timing is computed,
//! and validating the final container after composition.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::command::ToolInvocation;
use crate::error::{MediaError, MediaResult};
use crate::runner::CommandRunner;

/// Media file information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Duration in seconds
    pub duration: f64,
    /// Width in pixels (0 without a video stream)
    pub width: u32,
    /// Height in pixels (0 without a video stream)
    pub height: u32,
    /// Frame rate (fps)
    pub fps: f64,
    /// Video codec
    pub video_codec: Option<String>,
    /// Video codec profile
    pub video_profile: Option<String>,
    /// Audio codec
    pub audio_codec: Option<String>,
    /// File size in bytes
    pub size: u64,
    /// Bitrate in bits/second
    pub bitrate: u64,
}

impl MediaInfo {
    pub fn has_video(&self) -> bool {
        self.video_codec.is_some()
    }

    pub fn has_audio(&self) -> bool {
        self.audio_codec.is_some()
    }
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    size: Option<String>,
    bit_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    codec_name: Option<String>,
    profile: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
}

/// Probe a media file for format and stream information.
pub async fn probe_media(
    runner: &dyn CommandRunner,
    path: impl AsRef<Path>,
    timeout: Duration,
) -> MediaResult<MediaInfo> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    let invocation = ToolInvocation::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path.to_string_lossy());

    let output = runner.run(&invocation, timeout).await?;
    parse_probe_output(&output.stdout)
}

/// Read an audio file's duration in seconds.
///
/// Fails with [`MediaError::InvalidAudio`] when FFprobe reports no usable
/// duration or a non-positive one.
pub async fn probe_audio_duration(
    runner: &dyn CommandRunner,
    path: impl AsRef<Path>,
    timeout: Duration,
) -> MediaResult<f64> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    let invocation = ToolInvocation::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path.to_string_lossy());

    let output = runner.run(&invocation, timeout).await?;
    let duration = parse_duration_output(&output.stdout_text())?;

    debug!(path = %path.display(), duration, "Probed audio duration");
    Ok(duration)
}

/// Validate a finished container: it must parse, carry a video stream and
/// have a positive duration.
///
/// Every failure, including FFprobe itself failing, is reported as
/// [`MediaError::ValidationFailed`].
pub async fn validate_container(
    runner: &dyn CommandRunner,
    path: impl AsRef<Path>,
    timeout: Duration,
) -> MediaResult<MediaInfo> {
    let path = path.as_ref();

    let info = probe_media(runner, path, timeout).await.map_err(|e| {
        MediaError::validation_failed(format!("{} could not be inspected: {}", path.display(), e))
    })?;

    if !info.has_video() {
        return Err(MediaError::validation_failed(format!(
            "{} has no video stream",
            path.display()
        )));
    }

    if info.duration.is_nan() || info.duration <= 0.0 {
        return Err(MediaError::validation_failed(format!(
            "{} reports no duration",
            path.display()
        )));
    }

    Ok(info)
}

fn parse_duration_output(stdout: &str) -> MediaResult<f64> {
    let raw = stdout.trim();
    let duration: f64 = raw
        .lines()
        .next()
        .and_then(|l| l.trim().parse().ok())
        .ok_or_else(|| MediaError::InvalidAudio(format!("unreadable duration: {:?}", raw)))?;

    if !duration.is_finite() || duration <= 0.0 {
        return Err(MediaError::InvalidAudio(format!(
            "non-positive duration: {}",
            duration
        )));
    }

    Ok(duration)
}

fn parse_probe_output(stdout: &[u8]) -> MediaResult<MediaInfo> {
    let probe: FfprobeOutput = serde_json::from_slice(stdout)?;

    let video = probe.streams.iter().find(|s| s.codec_type == "video");
    let audio = probe.streams.iter().find(|s| s.codec_type == "audio");

    let format = probe.format.as_ref();
    let parse_u64 = |value: Option<&String>| value.and_then(|v| v.parse::<u64>().ok()).unwrap_or(0);

    let duration = format
        .and_then(|f| f.duration.as_ref())
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    let fps = video
        .and_then(|v| v.avg_frame_rate.as_ref().or(v.r_frame_rate.as_ref()))
        .and_then(|r| parse_frame_rate(r))
        .unwrap_or(0.0);

    Ok(MediaInfo {
        duration,
        width: video.and_then(|v| v.width).unwrap_or(0),
        height: video.and_then(|v| v.height).unwrap_or(0),
        fps,
        video_codec: video.and_then(|v| v.codec_name.clone()),
        video_profile: video.and_then(|v| v.profile.clone()),
        audio_codec: audio.and_then(|a| a.codec_name.clone()),
        size: parse_u64(format.and_then(|f| f.size.as_ref())),
        bitrate: parse_u64(format.and_then(|f| f.bit_rate.as_ref())),
    })
}

/// Parse frame rate string (e.g., "30/1" or "29.97").
fn parse_frame_rate(s: &str) -> Option<f64> {
    if let Some((num, den)) = s.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den > 0.0 {
            return Some(num / den);
        }
        return None;
    }
    s.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROBE_JSON: &str = r#"{
        "streams": [
            {"codec_type": "video", "codec_name": "h264", "profile": "Main",
             "width": 1280, "height": 720, "avg_frame_rate": "30/1"},
            {"codec_type": "audio", "codec_name": "aac"}
        ],
        "format": {"duration": "40.021000", "size": "1048576", "bit_rate": "209612"}
    }"#;

    #[test]
    fn test_parse_frame_rate() {
        assert!((parse_frame_rate("30/1").unwrap() - 30.0).abs() < 0.01);
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert!((parse_frame_rate("29.97").unwrap() - 29.97).abs() < 0.01);
        assert!(parse_frame_rate("0/0").is_none());
    }

    #[test]
    fn test_parse_probe_output() {
        let info = parse_probe_output(PROBE_JSON.as_bytes()).unwrap();
        assert!((info.duration - 40.021).abs() < 1e-6);
        assert_eq!((info.width, info.height), (1280, 720));
        assert_eq!(info.video_codec.as_deref(), Some("h264"));
        assert_eq!(info.video_profile.as_deref(), Some("Main"));
        assert!(info.has_audio());
        assert_eq!(info.size, 1_048_576);
    }

    #[test]
    fn test_parse_probe_output_audio_only() {
        let json = r#"{"streams": [{"codec_type": "audio", "codec_name": "pcm_s16le"}],
                       "format": {"duration": "12.5"}}"#;
        let info = parse_probe_output(json.as_bytes()).unwrap();
        assert!(!info.has_video());
        assert_eq!(info.fps, 0.0);
    }

    #[test]
    fn test_parse_probe_output_rejects_garbage() {
        assert!(matches!(
            parse_probe_output(b"moov atom not found"),
            Err(MediaError::JsonParse(_))
        ));
    }

    #[test]
    fn test_parse_duration_output() {
        assert!((parse_duration_output("40.000000\n").unwrap() - 40.0).abs() < 1e-9);
        assert!(matches!(parse_duration_output("N/A"), Err(MediaError::InvalidAudio(_))));
        assert!(matches!(parse_duration_output(""), Err(MediaError::InvalidAudio(_))));
        assert!(matches!(parse_duration_output("0.0"), Err(MediaError::InvalidAudio(_))));
        assert!(matches!(parse_duration_output("-3"), Err(MediaError::InvalidAudio(_))));
    }
}
