//! Image assets and aligned render segments.

use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::payload::{decode_payload, PayloadError};

/// Where an image's bytes live.
#[derive(Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// In-memory bytes (decoded upload or generated image)
    Bytes(Vec<u8>),
    /// An existing file on disk
    Path(PathBuf),
}

impl std::fmt::Debug for ImageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
            Self::Path(path) => write!(f, "Path({})", path.display()),
        }
    }
}

/// A generated or uploaded image tagged to a scene.
///
/// Read-only to the compiler. Several assets may share a scene number;
/// only the first one encountered is used for that scene.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    /// Scene the image was produced for; `None` means positional fallback
    pub scene_number: Option<u32>,
    pub source: ImageSource,
    /// File extension without the dot (`png`, `jpg`)
    pub extension: String,
}

impl ImageAsset {
    /// Create an asset from in-memory bytes.
    pub fn from_bytes(scene_number: Option<u32>, bytes: Vec<u8>, extension: impl Into<String>) -> Self {
        Self {
            scene_number,
            source: ImageSource::Bytes(bytes),
            extension: extension.into(),
        }
    }

    /// Create an asset referencing a file; the extension comes from the path.
    pub fn from_path(scene_number: Option<u32>, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_else(|| "png".to_string());
        Self {
            scene_number,
            source: ImageSource::Path(path.to_path_buf()),
            extension,
        }
    }

    /// Decode an image stored as a data URL or bare base64.
    ///
    /// `data:image/png...` yields `png`, any other image header yields
    /// `jpg`, and bare base64 is assumed to be PNG.
    pub fn from_data_url(scene_number: Option<u32>, raw: &str) -> Result<Self, PayloadError> {
        let decoded = decode_payload(raw)?;
        let extension = match decoded.header.as_deref() {
            Some(header) if header.contains("png") => "png",
            Some(_) => "jpg",
            None => "png",
        };
        Ok(Self::from_bytes(scene_number, decoded.bytes, extension))
    }

    /// SHA-256 digest of in-memory bytes, for diagnostics only.
    ///
    /// Path-backed assets are not read; they return `None`.
    pub fn content_hash(&self) -> Option<String> {
        match &self.source {
            ImageSource::Bytes(bytes) => Some(content_digest(bytes)),
            ImageSource::Path(_) => None,
        }
    }
}

/// Hex SHA-256 digest of a byte slice.
pub fn content_digest(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// How an aligned segment obtained its image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum AlignmentPolicy {
    /// The scene's own image
    Matched,
    /// An unused image borrowed from another scene (or an untagged one)
    Borrowed { from_scene: Option<u32> },
    /// The preceding segment's image shown again
    Repeated,
}

impl AlignmentPolicy {
    /// Whether the segment fell back to a substitute image.
    pub fn is_fallback(&self) -> bool {
        !matches!(self, Self::Matched)
    }
}

/// One timing interval bound to a materialized image file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AlignedSegment {
    pub scene_number: u32,
    /// Scratch copy of the chosen image, unique per segment
    pub resolved_image_path: PathBuf,
    /// Start time in seconds
    pub start_time: f64,
    /// Display duration in seconds
    pub duration: f64,
    #[serde(flatten)]
    pub policy: AlignmentPolicy,
}
