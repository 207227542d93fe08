//! Scripted [`CommandRunner`] for tests.
//!
//! Records every invocation and answers without spawning processes:
//! - `ffmpeg` and `qt-faststart` write a placeholder file at their last
//!   argument (the output path)
//! - `ffprobe -show_entries format=duration` prints the configured audio
//!   duration
//! - `ffprobe -show_format -show_streams` prints the configured JSON
//!
//! Failures are injected per program with [`ScriptedRunner::fail_on`] and
//! [`ScriptedRunner::timeout_on`].

use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::command::ToolInvocation;
use crate::error::{MediaError, MediaResult};
use crate::runner::{CommandRunner, ToolOutput};

#[derive(Debug, Clone)]
struct Rule {
    program: String,
    needle: String,
    timeout: bool,
}

/// In-memory stand-in for external media tools.
#[derive(Debug)]
pub struct ScriptedRunner {
    calls: Mutex<Vec<ToolInvocation>>,
    rules: Vec<Rule>,
    available: HashSet<String>,
    audio_duration: String,
    probe_json: String,
}

impl Default for ScriptedRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedRunner {
    /// Runner with `ffmpeg` and `ffprobe` available, a 40 second voiceover
    /// and a valid 1280x720 H.264 output.
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            rules: Vec::new(),
            available: ["ffmpeg", "ffprobe"].iter().map(|p| p.to_string()).collect(),
            audio_duration: "40.000000".to_string(),
            probe_json: probe_json(40.0, 1280, 720),
        }
    }

    /// Mark another program as installed.
    pub fn with_available(mut self, program: &str) -> Self {
        self.available.insert(program.to_string());
        self
    }

    /// Raw stdout for the audio duration probe.
    pub fn with_audio_duration(mut self, stdout: impl Into<String>) -> Self {
        self.audio_duration = stdout.into();
        self
    }

    /// Raw stdout for the container probe.
    pub fn with_probe_json(mut self, stdout: impl Into<String>) -> Self {
        self.probe_json = stdout.into();
        self
    }

    /// Fail calls to `program` whose joined arguments contain `needle`.
    pub fn fail_on(mut self, program: &str, needle: &str) -> Self {
        self.rules.push(Rule {
            program: program.to_string(),
            needle: needle.to_string(),
            timeout: false,
        });
        self
    }

    /// Time out calls to `program` whose joined arguments contain `needle`.
    pub fn timeout_on(mut self, program: &str, needle: &str) -> Self {
        self.rules.push(Rule {
            program: program.to_string(),
            needle: needle.to_string(),
            timeout: true,
        });
        self
    }

    /// Every invocation seen so far, in order.
    pub fn invocations(&self) -> Vec<ToolInvocation> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Number of invocations of `program`.
    pub fn count(&self, program: &str) -> usize {
        self.invocations()
            .iter()
            .filter(|c| c.program == program)
            .count()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, invocation: &ToolInvocation, timeout: Duration) -> MediaResult<ToolOutput> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(invocation.clone());
        }

        if !self.available.contains(&invocation.program) {
            return Err(MediaError::not_found(&invocation.program));
        }

        let joined = invocation.args.join(" ");
        if let Some(rule) = self
            .rules
            .iter()
            .find(|r| r.program == invocation.program && joined.contains(&r.needle))
        {
            return Err(if rule.timeout {
                MediaError::Timeout(timeout.as_secs())
            } else {
                MediaError::tool_failed(&invocation.program, "scripted failure".to_string(), Some(1))
            });
        }

        match invocation.program.as_str() {
            "ffprobe" => {
                let stdout = if joined.contains("-show_entries") {
                    self.audio_duration.clone()
                } else {
                    self.probe_json.clone()
                };
                Ok(ToolOutput {
                    stdout: stdout.into_bytes(),
                    stderr: String::new(),
                })
            }
            _ => {
                if let Some(output) = invocation.args.last() {
                    tokio::fs::write(Path::new(output), b"scripted output").await?;
                }
                Ok(ToolOutput::default())
            }
        }
    }

    fn is_available(&self, program: &str) -> bool {
        self.available.contains(program)
    }
}

/// FFprobe JSON for an H.264/AAC MP4 of the given length and size.
pub fn probe_json(duration: f64, width: u32, height: u32) -> String {
    format!(
        r#"{{"streams": [
            {{"codec_type": "video", "codec_name": "h264", "profile": "Main",
              "width": {width}, "height": {height}, "avg_frame_rate": "30/1"}},
            {{"codec_type": "audio", "codec_name": "aac"}}
        ],
        "format": {{"duration": "{duration:.6}", "size": "15", "bit_rate": "3000"}}}}"#
    )
}
