//! Data-URL payload decoding.
//!
//! The persistence layer stores voiceovers and images either as
//! `data:<mime>;base64,<payload>` strings or as bare base64. These helpers
//! turn both shapes into raw bytes plus a file extension.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use thiserror::Error;

/// Errors produced while decoding an embedded payload.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("Payload is empty")]
    Empty,

    #[error("Malformed data URL: {0}")]
    MalformedDataUrl(String),

    #[error("Invalid base64 payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
}

/// Decoded payload bytes with the extension inferred from the MIME header.
#[derive(Clone, PartialEq, Eq)]
pub(crate) struct DecodedPayload {
    pub bytes: Vec<u8>,
    /// MIME header between `data:` and `,`, absent for bare base64
    pub header: Option<String>,
}

/// Decode a `data:` URL or bare base64 string.
pub(crate) fn decode_payload(raw: &str) -> Result<DecodedPayload, PayloadError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(PayloadError::Empty);
    }

    if let Some(rest) = raw.strip_prefix("data:") {
        let (header, data) = rest
            .split_once(',')
            .ok_or_else(|| PayloadError::MalformedDataUrl(truncate(raw)))?;
        if !header.ends_with(";base64") {
            return Err(PayloadError::MalformedDataUrl(truncate(raw)));
        }
        let bytes = STANDARD.decode(data.trim())?;
        return Ok(DecodedPayload {
            bytes,
            header: Some(header.to_ascii_lowercase()),
        });
    }

    Ok(DecodedPayload {
        bytes: STANDARD.decode(raw)?,
        header: None,
    })
}

/// Encode bytes as a base64 data URL.
pub fn encode_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

fn truncate(raw: &str) -> String {
    raw.chars().take(48).collect()
}

/// Voiceover audio handed to the compiler.
#[derive(Clone, PartialEq, Eq)]
pub struct AudioPayload {
    pub bytes: Vec<u8>,
    /// File extension without the dot (`wav`, `mp3`)
    pub extension: String,
}

impl AudioPayload {
    pub fn new(bytes: Vec<u8>, extension: impl Into<String>) -> Self {
        Self {
            bytes,
            extension: extension.into(),
        }
    }

    /// Decode a voiceover stored as a data URL or bare base64.
    ///
    /// `data:audio/wav...` yields `wav`, any other audio header yields
    /// `mp3`, and bare base64 is assumed to be WAV.
    pub fn from_data_url(raw: &str) -> Result<Self, PayloadError> {
        let decoded = decode_payload(raw)?;
        let extension = match decoded.header.as_deref() {
            Some(header) if header.contains("wav") => "wav",
            Some(_) => "mp3",
            None => "wav",
        };
        Ok(Self::new(decoded.bytes, extension))
    }

    /// Scratch file name for this payload.
    pub fn file_name(&self) -> String {
        format!("audio.{}", self.extension)
    }
}

impl std::fmt::Debug for AudioPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioPayload")
            .field("len", &self.bytes.len())
            .field("extension", &self.extension)
            .finish()
    }
}
