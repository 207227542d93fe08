//! Shared data models for the AutoReel video compiler.
//!
//! This crate provides Serde-serializable types for:
//! - Script scenes and their computed timing intervals
//! - Image assets and aligned render segments
//! - Render targets and encoding configuration
//! - Compiled video artifacts
//! - Data-URL payload decoding for audio and images

pub mod encoding;
pub mod image;
pub mod payload;
pub mod scene;
pub mod timestamp;
pub mod video;

// Re-export common types
pub use encoding::{EncodingConfig, RenderTarget};
pub use image::{content_digest, AlignedSegment, AlignmentPolicy, ImageAsset, ImageSource};
pub use payload::{AudioPayload, PayloadError};
pub use scene::{Scene, TimingInterval};
pub use timestamp::{format_clock, parse_clock, TimestampError};
pub use video::{CompiledVideo, Resolution};
