//! Process runner seam for external media tools.
//!
//! Every FFmpeg, FFprobe and qt-faststart call goes through
//! [`CommandRunner`], so the pipeline can be exercised with a scripted
//! runner in tests and with [`ProcessRunner`] in production.

use std::collections::VecDeque;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::command::ToolInvocation;
use crate::error::{MediaError, MediaResult};
use crate::progress::{is_progress_line, parse_progress_line, FfmpegProgress};

/// Number of trailing stderr diagnostic lines kept for error reports.
const STDERR_TAIL_LINES: usize = 40;

/// Captured output of a successful tool run.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub stdout: Vec<u8>,
    /// Diagnostic stderr lines (progress lines excluded)
    pub stderr: String,
}

impl ToolOutput {
    /// Stdout decoded lossily as UTF-8.
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }
}

/// Runs external tools with a deadline.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `invocation` to completion.
    ///
    /// Fails with [`MediaError::Timeout`] once `timeout` elapses (the child
    /// is killed), and with a tool failure on non-zero exit.
    async fn run(&self, invocation: &ToolInvocation, timeout: Duration) -> MediaResult<ToolOutput>;

    /// Whether `program` can be resolved on this host.
    fn is_available(&self, program: &str) -> bool;
}

/// Runs tools as `tokio` child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, invocation: &ToolInvocation, timeout: Duration) -> MediaResult<ToolOutput> {
        let program = which::which(&invocation.program)
            .map_err(|_| MediaError::not_found(&invocation.program))?;

        debug!("Running: {}", invocation.display());

        let mut child = Command::new(&program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("stdout not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| std::io::Error::other("stderr not captured"))?;

        let stdout_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            stdout.read_to_end(&mut buf).await.map(|_| buf)
        });

        let label = invocation.program.clone();
        let stderr_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            let mut progress = FfmpegProgress::default();
            let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);

            while let Ok(Some(line)) = lines.next_line().await {
                if is_progress_line(&line) {
                    if let Some(snapshot) = parse_progress_line(&line, &mut progress) {
                        debug!(
                            program = %label,
                            frame = snapshot.frame,
                            out_time_ms = snapshot.out_time_ms,
                            speed = snapshot.speed,
                            "progress"
                        );
                    }
                    continue;
                }
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }

            Vec::from(tail).join("\n")
        });

        let status = match tokio::time::timeout(timeout, child.wait()).await {
            Ok(status) => status?,
            Err(_) => {
                warn!(
                    "{} timed out after {} seconds, killing process",
                    invocation.program,
                    timeout.as_secs()
                );
                let _ = child.kill().await;
                return Err(MediaError::Timeout(timeout.as_secs()));
            }
        };

        let stdout = stdout_task.await.map_err(std::io::Error::other)??;
        let stderr = stderr_task.await.map_err(std::io::Error::other)?;

        if status.success() {
            Ok(ToolOutput { stdout, stderr })
        } else {
            Err(MediaError::tool_failed(&invocation.program, stderr, status.code()))
        }
    }

    fn is_available(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<std::path::PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

/// Check if FFprobe is available.
pub fn check_ffprobe() -> MediaResult<std::path::PathBuf> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)
}
