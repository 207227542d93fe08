//! Compiler configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use reel_media::{CompositorConfig, ToolTimeouts, DEFAULT_FADE_SECS, DEFAULT_MISMATCH_TOLERANCE_SECS};
use reel_models::{EncodingConfig, RenderTarget};

/// Compiler configuration.
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// Parent directory for per-compilation scratch directories
    pub work_dir: PathBuf,
    /// Output resolution and frame rate
    pub target: RenderTarget,
    /// Encoder settings for clips and the final mux
    pub encoding: EncodingConfig,
    /// Fade-in/fade-out length per scene; 0 renders hard cuts
    pub fade_secs: f64,
    /// Subprocess deadlines
    pub timeouts: ToolTimeouts,
    /// Video/audio length differences above this are reported as warnings
    pub mismatch_tolerance_secs: f64,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("/tmp/reel"),
            target: RenderTarget::default(),
            encoding: EncodingConfig::default(),
            fade_secs: DEFAULT_FADE_SECS,
            timeouts: ToolTimeouts::default(),
            mismatch_tolerance_secs: DEFAULT_MISMATCH_TOLERANCE_SECS,
        }
    }
}

impl CompilerConfig {
    /// Create config from environment variables.
    ///
    /// Unset or unparsable variables keep their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let timeouts = defaults.timeouts.clone();

        Self {
            work_dir: std::env::var("REEL_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            target: RenderTarget::new(
                env_or("REEL_WIDTH", defaults.target.width),
                env_or("REEL_HEIGHT", defaults.target.height),
                env_or("REEL_FPS", defaults.target.fps),
            ),
            encoding: defaults.encoding,
            fade_secs: env_or("REEL_FADE_SECS", defaults.fade_secs),
            timeouts: ToolTimeouts {
                probe: env_secs("REEL_PROBE_TIMEOUT_SECS", timeouts.probe),
                segment: env_secs("REEL_SEGMENT_TIMEOUT_SECS", timeouts.segment),
                concat: env_secs("REEL_CONCAT_TIMEOUT_SECS", timeouts.concat),
                mux: env_secs("REEL_MUX_TIMEOUT_SECS", timeouts.mux),
                faststart: env_secs("REEL_FASTSTART_TIMEOUT_SECS", timeouts.faststart),
            },
            mismatch_tolerance_secs: env_or(
                "REEL_DURATION_MISMATCH_TOLERANCE_SECS",
                defaults.mismatch_tolerance_secs,
            ),
        }
    }

    /// Use a different render target.
    pub fn with_target(mut self, target: RenderTarget) -> Self {
        self.target = target;
        self
    }

    /// Use a different scratch parent directory.
    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = work_dir.into();
        self
    }

    /// Check values that would otherwise fail deep inside FFmpeg.
    pub fn validate(&self) -> Result<(), String> {
        self.target.validate()?;
        if !self.fade_secs.is_finite() || self.fade_secs < 0.0 {
            return Err(format!("fade length must be non-negative, got {}", self.fade_secs));
        }
        Ok(())
    }

    /// Settings handed to the compositor.
    pub fn compositor_config(&self) -> CompositorConfig {
        CompositorConfig {
            target: self.target,
            encoding: self.encoding.clone(),
            fade_secs: self.fade_secs,
            timeouts: self.timeouts.clone(),
            mismatch_tolerance_secs: self.mismatch_tolerance_secs,
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}
