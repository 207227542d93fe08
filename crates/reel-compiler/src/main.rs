//! Single-shot compilation worker binary.

use std::path::PathBuf;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reel_compiler::inputs::load_request;
use reel_compiler::{CompilerConfig, VideoCompiler};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing();

    info!("Starting reel-compile");

    if let Err(e) = run().await {
        error!("Compilation failed: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing() {
    // Colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let mut env_filter = EnvFilter::from_default_env();
    if let Ok(directive) = "reel=info".parse::<Directive>() {
        env_filter = env_filter.add_directive(directive);
    }

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

async fn run() -> anyhow::Result<()> {
    let config = CompilerConfig::from_env();
    info!("Compiler config: {:?}", config);

    let script_path = required_path("REEL_SCRIPT_PATH")?;
    let audio_path = required_path("REEL_AUDIO_PATH")?;
    let images_dir = required_path("REEL_IMAGES_DIR")?;
    let output_path = std::env::var("REEL_OUTPUT_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("output.mp4"));

    let request = load_request(&script_path, &audio_path, &images_dir)
        .await
        .context("failed to load compilation inputs")?;

    let compiler = VideoCompiler::new(config);
    let video = compiler.compile(request).await?;

    for warning in &video.warnings {
        warn!("{}", warning);
    }

    tokio::fs::write(&output_path, &video.video_bytes)
        .await
        .with_context(|| format!("failed to write {}", output_path.display()))?;

    info!(
        compilation_id = %video.compilation_id,
        "Wrote {} ({:.2}s, {}, {:.2} MB)",
        output_path.display(),
        video.duration,
        video.resolution,
        video.size_mb()
    );

    println!("{}", serde_json::to_string_pretty(&video)?);
    Ok(())
}

fn required_path(var: &str) -> anyhow::Result<PathBuf> {
    std::env::var(var)
        .map(PathBuf::from)
        .map_err(|_| anyhow::anyhow!("missing required env var {}", var))
}
