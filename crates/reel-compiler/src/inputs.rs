//! Loading compilation inputs from disk.
//!
//! Used by the `reel-compile` binary, which reads a script, a voiceover
//! and a directory of images instead of receiving them from the API layer.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use reel_models::{AudioPayload, ImageAsset};

use crate::compiler::CompilationRequest;
use crate::error::{CompileError, CompileResult};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

fn scene_file_regex() -> &'static Regex {
    static SCENE_FILE: OnceLock<Regex> = OnceLock::new();
    SCENE_FILE.get_or_init(|| Regex::new(r"(?i)^scene[_-]?(\d+)$").expect("scene file pattern compiles"))
}

/// Scene number encoded in an image file stem (`scene_3.png` → 3).
pub fn scene_from_file_name(path: &Path) -> Option<u32> {
    let stem = path.file_stem()?.to_str()?;
    scene_file_regex().captures(stem)?.get(1)?.as_str().parse().ok()
}

/// Load every image in `dir`, sorted by file name.
///
/// Files named `scene_<N>.<ext>` are tagged with scene N; other images are
/// untagged. Non-image files are skipped.
pub async fn load_image_dir(dir: &Path) -> CompileResult<Vec<ImageAsset>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut paths = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_image = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false);

        if is_image && entry.file_type().await?.is_file() {
            paths.push(path);
        } else {
            debug!("Skipping non-image entry {}", path.display());
        }
    }
    paths.sort();

    Ok(paths
        .iter()
        .map(|p| ImageAsset::from_path(scene_from_file_name(p), p))
        .collect())
}

/// Read a voiceover file; the extension is taken from the path.
pub async fn load_audio(path: &Path) -> CompileResult<AudioPayload> {
    let bytes = tokio::fs::read(path).await?;
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| "wav".to_string());
    Ok(AudioPayload::new(bytes, extension))
}

/// Build a request from a script file, an audio file and an image directory.
pub async fn load_request(
    script_path: &Path,
    audio_path: &Path,
    images_dir: &Path,
) -> CompileResult<CompilationRequest> {
    let script_text = tokio::fs::read_to_string(script_path).await?;
    let audio = load_audio(audio_path).await?;
    let images = load_image_dir(images_dir).await?;

    if images.is_empty() {
        return Err(CompileError::alignment_exhausted(format!(
            "no images found in {}",
            images_dir.display()
        )));
    }

    Ok(CompilationRequest::new(script_text, audio, images))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_scene_from_file_name() {
        assert_eq!(scene_from_file_name(Path::new("scene_3.png")), Some(3));
        assert_eq!(scene_from_file_name(Path::new("/x/Scene-12.JPG")), Some(12));
        assert_eq!(scene_from_file_name(Path::new("scene7.webp")), Some(7));
        assert_eq!(scene_from_file_name(Path::new("cover.png")), None);
        assert_eq!(scene_from_file_name(Path::new("scene_3_alt.png")), None);
    }

    #[tokio::test]
    async fn test_load_image_dir_sorts_and_tags() {
        let dir = TempDir::new().unwrap();
        for name in ["scene_2.png", "cover.jpg", "scene_1.png", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        let images = load_image_dir(dir.path()).await.unwrap();
        let tags: Vec<Option<u32>> = images.iter().map(|i| i.scene_number).collect();
        assert_eq!(tags, vec![None, Some(1), Some(2)]);
        assert_eq!(images[0].extension, "jpg");
    }

    #[tokio::test]
    async fn test_load_request() {
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("script.txt");
        let audio = dir.path().join("voice.MP3");
        let images = dir.path().join("images");
        std::fs::write(&script, "Scene 1\nHello").unwrap();
        std::fs::write(&audio, b"ID3").unwrap();
        std::fs::create_dir(&images).unwrap();
        std::fs::write(images.join("scene_1.png"), b"png").unwrap();

        let request = load_request(&script, &audio, &images).await.unwrap();
        assert_eq!(request.script_text, "Scene 1\nHello");
        assert_eq!(request.audio.extension, "mp3");
        assert_eq!(request.images.len(), 1);
    }

    #[tokio::test]
    async fn test_load_request_without_images_fails() {
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("script.txt");
        let audio = dir.path().join("voice.wav");
        std::fs::write(&script, "Scene 1\nHello").unwrap();
        std::fs::write(&audio, b"RIFF").unwrap();

        let err = load_request(&script, &audio, dir.path()).await.unwrap_err();
        assert!(matches!(err, CompileError::AlignmentExhaustion(_)));

        let missing = load_image_dir(&PathBuf::from("/nonexistent/reel/images")).await;
        assert!(matches!(missing, Err(CompileError::Io(_))));
    }
}
