use std::path::Path;

use reel_compiler::CompilerConfig;
use reel_media::{check_ffmpeg, check_ffprobe};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = CompilerConfig::from_env();

    println!(
        "reel-selfcheck: starting with work_dir={}",
        config.work_dir.display()
    );
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {}", e))?;
    ensure_workdir(&config.work_dir).await?;
    ensure_tools()?;

    println!("reel-selfcheck: ok ({})", config.target);
    Ok(())
}

async fn ensure_workdir<P: AsRef<Path>>(path: P) -> anyhow::Result<()> {
    let path = path.as_ref();
    tokio::fs::create_dir_all(path).await?;

    // The compiler creates scratch directories here.
    let probe = tempfile::Builder::new().prefix("reel-").tempdir_in(path)?;
    probe.close()?;
    Ok(())
}

fn ensure_tools() -> anyhow::Result<()> {
    let ffmpeg = check_ffmpeg().map_err(|e| anyhow::anyhow!("ffmpeg not available: {}", e))?;
    let ffprobe = check_ffprobe().map_err(|e| anyhow::anyhow!("ffprobe not available: {}", e))?;

    println!("reel-selfcheck: ffmpeg at {}", ffmpeg.display());
    println!("reel-selfcheck: ffprobe at {}", ffprobe.display());
    Ok(())
}
