//! Script scenes and computed timing intervals.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One narrative beat of a script.
///
/// Created by the script parser and immutable afterward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Scene {
    /// Scene number as written in the marker (`Scene 3` -> 3)
    pub scene_number: u32,
    /// Text after the marker on the same line, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Spoken content; its word count drives proportional timing
    #[serde(default)]
    pub narration_text: String,
    /// Literal start time in seconds from `(M:SS-M:SS)`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explicit_start: Option<f64>,
    /// Literal end time in seconds from `(M:SS-M:SS)`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explicit_end: Option<f64>,
}

impl Scene {
    /// Create a scene without title or explicit timestamps.
    pub fn new(scene_number: u32, narration_text: impl Into<String>) -> Self {
        Self {
            scene_number,
            title: None,
            narration_text: narration_text.into(),
            explicit_start: None,
            explicit_end: None,
        }
    }

    /// Attach a title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Attach an explicit time range.
    pub fn with_explicit_range(mut self, start: Option<f64>, end: Option<f64>) -> Self {
        self.explicit_start = start;
        self.explicit_end = end;
        self
    }

    /// Number of whitespace-separated words in the narration.
    pub fn word_count(&self) -> usize {
        self.narration_text.split_whitespace().count()
    }
}

/// The temporal slot `[start_time, end_time)` during which a scene's image
/// is on screen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TimingInterval {
    pub scene_number: u32,
    /// Start time in seconds (>= 0)
    pub start_time: f64,
    /// End time in seconds (> start_time)
    pub end_time: f64,
    /// `end_time - start_time`
    pub duration: f64,
}

impl TimingInterval {
    pub fn new(scene_number: u32, start_time: f64, end_time: f64) -> Self {
        Self {
            scene_number,
            start_time,
            end_time,
            duration: end_time - start_time,
        }
    }

    /// Whether the interval satisfies `0 <= start < end`.
    pub fn is_well_formed(&self) -> bool {
        self.start_time >= 0.0 && self.end_time > self.start_time
    }
}
