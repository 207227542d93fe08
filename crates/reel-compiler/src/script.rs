//! Narration script parsing.
//!
//! A script is free text split into scenes by marker lines:
//!
//! ```text
//! Scene 1 (0:00-0:10): Opening
//! Welcome to the show.
//!
//! **Scene 2**
//! Today we look at rivers.
//! ```
//!
//! A marker may carry Markdown emphasis or heading prefixes, an optional
//! `(M:SS-M:SS)` range and an optional title. Either side of the range may
//! be left empty to mark it open; a side that is not a clock value voids
//! the whole range. The non-empty lines that
//! follow a marker, up to the next marker, are that scene's narration.

use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, warn};

use reel_models::{format_clock, parse_clock, Scene, TimestampError};

use crate::error::{CompileError, CompileResult};

const MARKER_PATTERN: &str =
    r"(?i)^[#*_\s]*scene\s+(\d+)(?:\s*\(\s*([^()]*?)\s*-\s*([^()]*?)\s*\))?(.*)$";

fn marker_regex() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| Regex::new(MARKER_PATTERN).expect("scene marker pattern compiles"))
}

/// A recognized marker line.
#[derive(Debug, Clone, PartialEq)]
struct Marker {
    scene_number: u32,
    title: Option<String>,
    start: Option<f64>,
    end: Option<f64>,
}

fn parse_marker(line: &str) -> Option<Marker> {
    let caps = marker_regex().captures(line)?;
    let scene_number = caps.get(1)?.as_str().parse().ok()?;

    let (start, end) = match (range_side(caps.get(2)), range_side(caps.get(3))) {
        (Ok(start), Ok(end)) => (start, end),
        (Err(e), _) | (_, Err(e)) => {
            debug!(scene_number, "Ignoring malformed range: {}", e);
            (None, None)
        }
    };

    let title = caps
        .get(4)
        .map(|m| m.as_str().trim_matches(|c: char| c.is_whitespace() || "*_:-".contains(c)))
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    Some(Marker {
        scene_number,
        title,
        start,
        end,
    })
}

/// One side of a marker range; empty means open.
fn range_side(side: Option<regex::Match<'_>>) -> Result<Option<f64>, TimestampError> {
    match side.map(|m| m.as_str().trim()).filter(|s| !s.is_empty()) {
        Some(text) => parse_clock(text).map(Some),
        None => Ok(None),
    }
}

/// Split a script into scenes in order of appearance.
///
/// Text before the first marker is ignored. Narration lines are trimmed and
/// joined with single spaces. A repeated scene number replaces the earlier
/// scene's content but keeps its position. Fails when the script has no
/// markers at all.
pub fn parse_script(text: &str) -> CompileResult<Vec<Scene>> {
    let mut scenes: Vec<Scene> = Vec::new();
    let mut current: Option<(Scene, Vec<String>)> = None;

    for line in text.lines().map(str::trim) {
        if let Some(marker) = parse_marker(line) {
            if let Some(done) = current.take() {
                push_scene(&mut scenes, done);
            }
            let mut scene = Scene::new(marker.scene_number, String::new())
                .with_explicit_range(marker.start, marker.end);
            scene.title = marker.title;
            current = Some((scene, Vec::new()));
        } else if !line.is_empty() {
            if let Some((_, lines)) = current.as_mut() {
                lines.push(line.to_string());
            }
        }
    }
    if let Some(done) = current.take() {
        push_scene(&mut scenes, done);
    }

    if scenes.is_empty() {
        return Err(CompileError::parse("script contains no scene markers"));
    }

    debug!("Parsed {} scenes", scenes.len());
    Ok(scenes)
}

fn push_scene(scenes: &mut Vec<Scene>, (mut scene, lines): (Scene, Vec<String>)) {
    scene.narration_text = lines.join(" ");

    match scenes.iter_mut().find(|s| s.scene_number == scene.scene_number) {
        Some(existing) => {
            warn!(
                scene_number = scene.scene_number,
                "Scene number repeated in script, later content wins"
            );
            *existing = scene;
        }
        None => scenes.push(scene),
    }
}

/// Render scenes back into script text that [`parse_script`] reads back
/// into the same scenes.
pub fn render_script(scenes: &[Scene]) -> String {
    let mut out = String::new();

    for scene in scenes {
        out.push_str(&format!("Scene {}", scene.scene_number));

        if scene.explicit_start.is_some() || scene.explicit_end.is_some() {
            let clock = |v: Option<f64>| v.map(format_clock).unwrap_or_default();
            out.push_str(&format!(
                " ({}-{})",
                clock(scene.explicit_start),
                clock(scene.explicit_end)
            ));
        }
        if let Some(title) = &scene.title {
            out.push_str(": ");
            out.push_str(title);
        }
        out.push('\n');

        if !scene.narration_text.is_empty() {
            out.push_str(&scene.narration_text);
            out.push('\n');
        }
        out.push('\n');
    }

    out
}
