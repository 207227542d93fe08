//! Compiled video artifact.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::payload::encode_data_url;
use crate::scene::TimingInterval;

/// Pixel dimensions of a video stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// The MP4 produced by one successful compilation.
///
/// Immutable once created; ownership passes to the caller, which decides
/// how to persist it.
#[derive(Debug, Clone, Serialize)]
pub struct CompiledVideo {
    /// Record handle for this compilation
    pub compilation_id: Uuid,
    /// MP4 container bytes
    #[serde(skip)]
    pub video_bytes: Vec<u8>,
    /// Container duration in seconds as reported by the validator
    pub duration: f64,
    pub resolution: Resolution,
    /// Codec and profile label, e.g. `h264/main`
    pub codec_profile: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
    /// Scene timeline the video was rendered from
    pub timings: Vec<TimingInterval>,
    /// Soft warnings raised during compilation
    pub warnings: Vec<String>,
}

impl CompiledVideo {
    /// Encode the video as a `data:video/mp4;base64,...` URL.
    pub fn to_data_url(&self) -> String {
        encode_data_url("video/mp4", &self.video_bytes)
    }

    /// Size in mebibytes, for log lines.
    pub fn size_mb(&self) -> f64 {
        self.size_bytes as f64 / (1024.0 * 1024.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CompiledVideo {
        CompiledVideo {
            compilation_id: Uuid::new_v4(),
            video_bytes: b"mp4".to_vec(),
            duration: 40.0,
            resolution: Resolution {
                width: 1280,
                height: 720,
            },
            codec_profile: "h264/main".to_string(),
            size_bytes: 3,
            created_at: Utc::now(),
            timings: vec![TimingInterval::new(1, 0.0, 40.0)],
            warnings: Vec::new(),
        }
    }

    #[test]
    fn test_data_url() {
        assert_eq!(sample().to_data_url(), "data:video/mp4;base64,bXA0");
    }

    #[test]
    fn test_serialization_omits_bytes() {
        let json = serde_json::to_value(sample()).unwrap();
        assert!(json.get("video_bytes").is_none());
        assert_eq!(json["resolution"]["width"], 1280);
        assert_eq!(json["timings"][0]["end_time"], 40.0);
    }
}
