//! Fast-start post-processing.
//!
//! Moves the MP4 `moov` index in front of the media data so playback can
//! begin before the whole file has downloaded. `qt-faststart` is tried
//! first; a stream-copy remux with `-movflags +faststart` is the fallback.
//! If both fail the original file is kept: it still plays after a full
//! download, so the failure is only a warning.

use std::path::Path;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use crate::command::{FfmpegCommand, ToolInvocation};
use crate::error::MediaResult;
use crate::runner::CommandRunner;

const QT_FASTSTART: &str = "qt-faststart";

/// Which method produced the final file layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FaststartOutcome {
    /// Rewritten by `qt-faststart`
    QtFaststart,
    /// Re-containerized by FFmpeg with `+faststart`
    Remux,
    /// Left as muxed; progressive playback is not guaranteed
    Skipped,
}

impl FaststartOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QtFaststart => "qt_faststart",
            Self::Remux => "remux",
            Self::Skipped => "skipped",
        }
    }
}

/// Write a fast-start copy of `input` to `output`.
///
/// On [`FaststartOutcome::Skipped`] `input` has been moved to `output`
/// unchanged, so `output` exists whenever this returns `Ok`.
pub async fn apply_faststart(
    runner: &dyn CommandRunner,
    input: &Path,
    output: &Path,
    timeout: Duration,
    warnings: &mut Vec<String>,
) -> MediaResult<FaststartOutcome> {
    if runner.is_available(QT_FASTSTART) {
        let invocation = ToolInvocation::new(QT_FASTSTART)
            .arg(input.to_string_lossy())
            .arg(output.to_string_lossy());

        match runner.run(&invocation, timeout).await {
            Ok(_) if output.exists() => {
                info!("Fast-start applied with {}", QT_FASTSTART);
                return Ok(finish(FaststartOutcome::QtFaststart));
            }
            Ok(_) => {
                warn!("{} produced no output, falling back to remux", QT_FASTSTART);
            }
            Err(e) => {
                warn!("{} failed, falling back to remux: {}", QT_FASTSTART, e);
            }
        }
        discard_partial(output).await;
    }

    let remux = FfmpegCommand::new(input, output)
        .codec_copy()
        .faststart()
        .without_progress();

    match runner.run(&remux.to_invocation(), timeout).await {
        Ok(_) if output.exists() => {
            info!("Fast-start applied with FFmpeg remux");
            Ok(finish(FaststartOutcome::Remux))
        }
        outcome => {
            let reason = match outcome {
                Err(e) => e.to_string(),
                Ok(_) => "remux produced no output".to_string(),
            };
            let message = format!(
                "fast-start post-processing failed, video will not stream progressively: {}",
                reason
            );
            warn!("{}", message);
            warnings.push(message);

            discard_partial(output).await;
            tokio::fs::rename(input, output).await?;
            Ok(finish(FaststartOutcome::Skipped))
        }
    }
}

fn finish(outcome: FaststartOutcome) -> FaststartOutcome {
    metrics::counter!("reel_faststart_total", "method" => outcome.as_str()).increment(1);
    outcome
}

/// Remove a file the pipeline will not hand out, warning if that fails.
pub(crate) async fn discard_partial(path: &Path) {
    if path.exists() {
        if let Err(e) = tokio::fs::remove_file(path).await {
            warn!("Failed to remove partial file {}: {}", path.display(), e);
        }
    }
}
