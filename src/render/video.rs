//! Still-image + narration video composition through an ffmpeg subprocess.
use super::VideoComposer;
use crate::config::Settings;
use crate::error::{Error, Result, Service};
use crate::util::truncate_string;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Instant;

const STDERR_LIMIT: usize = 800;

pub struct FfmpegComposer {
    argv: Vec<String>,
}

impl FfmpegComposer {
    /// Use `FFMPEG_COMMAND` (split with shell quoting rules) or `ffmpeg` from PATH.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        if let Some(command) = settings.ffmpeg_command.as_deref() {
            let argv = shell_words::split(command)
                .map_err(|err| Error::InvalidConfig(format!("parse FFMPEG_COMMAND: {err}")))?;
            return Self::from_argv(argv);
        }
        let program = which::which("ffmpeg").map_err(|err| {
            Error::InvalidConfig(format!(
                "ffmpeg not found on PATH ({err}); install it or set FFMPEG_COMMAND"
            ))
        })?;
        Self::from_argv(vec![program.display().to_string()])
    }

    fn from_argv(argv: Vec<String>) -> Result<Self> {
        if argv.is_empty() {
            return Err(Error::InvalidConfig("FFMPEG_COMMAND is empty".to_string()));
        }
        Ok(Self { argv })
    }

    fn arguments(image: &Path, audio: &Path, output: &Path, fps: u32) -> Vec<String> {
        let fps = fps.to_string();
        let path = |p: &Path| p.display().to_string();
        vec![
            "-y".into(),
            "-loglevel".into(),
            "error".into(),
            "-loop".into(),
            "1".into(),
            "-framerate".into(),
            fps.clone(),
            "-i".into(),
            path(image),
            "-i".into(),
            path(audio),
            "-c:v".into(),
            "libx264".into(),
            "-tune".into(),
            "stillimage".into(),
            "-pix_fmt".into(),
            "yuv420p".into(),
            "-r".into(),
            fps,
            "-c:a".into(),
            "aac".into(),
            "-shortest".into(),
            path(output),
        ]
    }
}

fn require_file(path: &Path, label: &str) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!("{label} not found: {}", path.display())))
    }
}

impl VideoComposer for FfmpegComposer {
    fn compose(&self, image: &Path, audio: &Path, output: &Path, fps: u32) -> Result<PathBuf> {
        require_file(image, "image")?;
        require_file(audio, "audio")?;
        if fps == 0 {
            return Err(Error::InvalidInput("fps must be positive".to_string()));
        }
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| Error::io("create directory", parent, err))?;
        }

        let start = Instant::now();
        let result = Command::new(&self.argv[0])
            .args(&self.argv[1..])
            .args(Self::arguments(image, audio, output, fps))
            .stdin(Stdio::null())
            .output()
            .map_err(|err| Error::io("spawn", &self.argv[0], err))?;
        tracing::info!(
            elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            output = %output.display(),
            "ffmpeg finished"
        );
        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(Error::Render(format!(
                "{} exited with {}: {}",
                Service::Ffmpeg,
                result.status,
                truncate_string(stderr.trim(), STDERR_LIMIT)
            )));
        }
        Ok(output.to_path_buf())
    }
}
