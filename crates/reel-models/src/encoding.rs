//! Render targets and encoding configuration.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default video codec (H.264)
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
/// Default H.264 profile, playable by practically every decoder
pub const DEFAULT_VIDEO_PROFILE: &str = "main";
/// Default pixel format
pub const DEFAULT_PIXEL_FORMAT: &str = "yuv420p";
/// Default encoding preset
pub const DEFAULT_PRESET: &str = "medium";
/// Default CRF (Constant Rate Factor)
pub const DEFAULT_CRF: u8 = 23;
/// Default audio codec
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
/// Default audio bitrate
pub const DEFAULT_AUDIO_BITRATE: &str = "192k";
/// Default audio sample rate (Hz)
pub const DEFAULT_AUDIO_SAMPLE_RATE: u32 = 44_100;
/// Default audio channel count
pub const DEFAULT_AUDIO_CHANNELS: u8 = 2;

/// Output frame geometry and rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RenderTarget {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for RenderTarget {
    fn default() -> Self {
        Self::hd()
    }
}

impl RenderTarget {
    pub fn new(width: u32, height: u32, fps: u32) -> Self {
        Self { width, height, fps }
    }

    /// 1280x720 @ 30fps.
    pub fn hd() -> Self {
        Self::new(1280, 720, 30)
    }

    /// 1920x1080 @ 30fps.
    pub fn full_hd() -> Self {
        Self::new(1920, 1080, 30)
    }

    /// Check that the target can be encoded as yuv420p.
    pub fn validate(&self) -> Result<(), String> {
        if self.width == 0 || self.height == 0 {
            return Err(format!("resolution must be non-zero, got {}", self));
        }
        if self.width % 2 != 0 || self.height % 2 != 0 {
            return Err(format!("resolution must have even dimensions, got {}", self));
        }
        if self.fps == 0 {
            return Err("fps must be positive".to_string());
        }
        Ok(())
    }

    /// Scale-and-pad filter that letterboxes any input into this frame.
    pub fn scale_pad_filter(&self) -> String {
        format!(
            "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1",
            w = self.width,
            h = self.height
        )
    }
}

impl std::fmt::Display for RenderTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}@{}", self.width, self.height, self.fps)
    }
}

/// Video/audio encoding configuration for rendered clips and the final mux.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EncodingConfig {
    /// Video codec (e.g., "libx264")
    #[serde(default = "default_video_codec")]
    pub codec: String,

    /// Codec profile (e.g., "main", "high")
    #[serde(default = "default_profile")]
    pub profile: String,

    /// Pixel format
    #[serde(default = "default_pixel_format")]
    pub pixel_format: String,

    /// Encoding preset (e.g., "fast", "medium", "slow")
    #[serde(default = "default_preset")]
    pub preset: String,

    /// Constant Rate Factor (quality, 0-51, lower is better)
    #[serde(default = "default_crf")]
    pub crf: u8,

    /// Audio codec
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    /// Audio bitrate
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,

    /// Audio sample rate in Hz
    #[serde(default = "default_sample_rate")]
    pub audio_sample_rate: u32,

    /// Audio channels
    #[serde(default = "default_channels")]
    pub audio_channels: u8,
}

fn default_video_codec() -> String {
    DEFAULT_VIDEO_CODEC.to_string()
}
fn default_profile() -> String {
    DEFAULT_VIDEO_PROFILE.to_string()
}
fn default_pixel_format() -> String {
    DEFAULT_PIXEL_FORMAT.to_string()
}
fn default_preset() -> String {
    DEFAULT_PRESET.to_string()
}
fn default_crf() -> u8 {
    DEFAULT_CRF
}
fn default_audio_codec() -> String {
    DEFAULT_AUDIO_CODEC.to_string()
}
fn default_audio_bitrate() -> String {
    DEFAULT_AUDIO_BITRATE.to_string()
}
fn default_sample_rate() -> u32 {
    DEFAULT_AUDIO_SAMPLE_RATE
}
fn default_channels() -> u8 {
    DEFAULT_AUDIO_CHANNELS
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            codec: default_video_codec(),
            profile: default_profile(),
            pixel_format: default_pixel_format(),
            preset: default_preset(),
            crf: DEFAULT_CRF,
            audio_codec: default_audio_codec(),
            audio_bitrate: default_audio_bitrate(),
            audio_sample_rate: DEFAULT_AUDIO_SAMPLE_RATE,
            audio_channels: DEFAULT_AUDIO_CHANNELS,
        }
    }
}

impl EncodingConfig {
    /// Video encoder arguments.
    pub fn video_args(&self) -> Vec<String> {
        vec![
            "-c:v".to_string(),
            self.codec.clone(),
            "-profile:v".to_string(),
            self.profile.clone(),
            "-pix_fmt".to_string(),
            self.pixel_format.clone(),
            "-preset".to_string(),
            self.preset.clone(),
            "-crf".to_string(),
            self.crf.to_string(),
        ]
    }

    /// Audio encoder arguments.
    pub fn audio_args(&self) -> Vec<String> {
        vec![
            "-c:a".to_string(),
            self.audio_codec.clone(),
            "-b:a".to_string(),
            self.audio_bitrate.clone(),
            "-ar".to_string(),
            self.audio_sample_rate.to_string(),
            "-ac".to_string(),
            self.audio_channels.to_string(),
        ]
    }

    /// Codec/profile label recorded on the compiled video (e.g. `h264/main`).
    pub fn codec_profile(&self) -> String {
        let family = match self.codec.as_str() {
            "libx264" | "h264_nvenc" | "h264" => "h264",
            other => other,
        };
        format!("{}/{}", family, self.profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_target_presets() {
        assert_eq!(RenderTarget::default(), RenderTarget::new(1280, 720, 30));
        assert_eq!(RenderTarget::full_hd().to_string(), "1920x1080@30");
    }

    #[test]
    fn test_render_target_validation() {
        assert!(RenderTarget::hd().validate().is_ok());
        assert!(RenderTarget::new(1281, 720, 30).validate().is_err());
        assert!(RenderTarget::new(0, 720, 30).validate().is_err());
        assert!(RenderTarget::new(1280, 720, 0).validate().is_err());
    }

    #[test]
    fn test_scale_pad_filter() {
        let filter = RenderTarget::hd().scale_pad_filter();
        assert!(filter.starts_with("scale=1280:720:force_original_aspect_ratio=decrease"));
        assert!(filter.contains("pad=1280:720:(ow-iw)/2:(oh-ih)/2"));
    }

    #[test]
    fn test_encoder_args() {
        let config = EncodingConfig::default();
        let video = config.video_args();
        assert!(video.contains(&"libx264".to_string()));
        assert!(video.contains(&"yuv420p".to_string()));
        let audio = config.audio_args();
        assert!(audio.contains(&"192k".to_string()));
        assert!(audio.contains(&"44100".to_string()));
        assert_eq!(config.codec_profile(), "h264/main");
    }

    #[test]
    fn test_partial_deserialization_uses_defaults() {
        let config: EncodingConfig = serde_json::from_str(r#"{"crf": 18}"#).unwrap();
        assert_eq!(config.crf, 18);
        assert_eq!(config.audio_codec, "aac");
        assert_eq!(config.audio_channels, 2);
    }
}
