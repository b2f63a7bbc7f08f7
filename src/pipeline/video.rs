use super::Pipeline;
use crate::artifacts::ArtifactKind;
use crate::error::{Error, Result};
use crate::util::write_with_parents;
use std::path::PathBuf;

pub const DEFAULT_FPS: u32 = 30;

#[derive(Debug, Clone)]
pub struct VideoRequest {
    /// Names the derived output file, usually the ticker.
    pub label: String,
    pub image: PathBuf,
    pub audio: PathBuf,
    pub output: Option<PathBuf>,
    pub fps: u32,
}

impl Pipeline<'_> {
    /// Still image plus narration into an mp4 lasting as long as the audio.
    pub fn assemble_video(&self, request: &VideoRequest) -> Result<PathBuf> {
        if request.fps == 0 {
            return Err(Error::InvalidInput("fps must be positive".to_string()));
        }
        let output = self
            .artifacts
            .resolve(request.output.as_deref(), ArtifactKind::Video, &request.label);

        if self.runtime.dry_run() {
            tracing::info!(
                output = %output.display(),
                "[dry-run] Skipping ffmpeg; writing placeholder video"
            );
            let marker = format!(
                "dry-run video placeholder\nimage={}\naudio={}\nfps={}\n",
                request.image.display(),
                request.audio.display(),
                request.fps
            );
            write_with_parents(&output, marker.as_bytes())?;
            return Ok(output);
        }

        let composer = self
            .composer
            .ok_or_else(|| Error::InvalidConfig("no video composer configured".to_string()))?;
        let path = composer.compose(&request.image, &request.audio, &output, request.fps)?;
        tracing::info!(output = %path.display(), "video rendered");
        Ok(path)
    }
}
