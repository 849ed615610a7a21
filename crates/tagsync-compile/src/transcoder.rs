use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::{CompileError, Result};

/// One clip to cut out of a source stream.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipRequest {
    pub input: String,
    pub start_seconds: f64,
    pub duration_seconds: u32,
    pub output: PathBuf,
}

#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn cut_clip(&self, clip: &ClipRequest) -> Result<()>;

    /// Joins the clips listed in `list_file` into `output`, both relative to `dir`.
    async fn concat(&self, dir: &Path, list_file: &str, output: &str) -> Result<()>;
}

const QUIET: [&str; 3] = ["-hide_banner", "-loglevel", "warning"];

/// Re-encodes to 1080p/30fps H.264 with 48kHz AAC so clips from different
/// scenes can be concatenated without another encode.
pub fn clip_args(clip: &ClipRequest) -> Vec<String> {
    let mut args: Vec<String> = QUIET.iter().map(|a| a.to_string()).collect();
    args.extend(
        [
            "-ss".to_string(),
            clip.start_seconds.to_string(),
            "-i".to_string(),
            clip.input.clone(),
            "-t".to_string(),
            clip.duration_seconds.to_string(),
        ]
        .into_iter()
        .chain(
            [
                "-c:v",
                "libx264",
                "-preset",
                "slow",
                "-crf",
                "22",
                "-acodec",
                "aac",
                "-vf",
                "scale=1920:-2,fps=30",
                "-ar",
                "48000",
            ]
            .iter()
            .map(|a| a.to_string()),
        ),
    );
    args.push(clip.output.display().to_string());
    args
}

pub fn concat_args(list_file: &str, output: &str) -> Vec<String> {
    QUIET
        .iter()
        .chain(["-f", "concat", "-i", list_file, "-c", "copy", output].iter())
        .map(|a| a.to_string())
        .collect()
}

/// Runs the `ffmpeg` executable.
pub struct FfmpegTranscoder {
    program: PathBuf,
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FfmpegTranscoder {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run(&self, args: &[String], dir: Option<&Path>, output: &str) -> Result<()> {
        let mut command = Command::new(&self.program);
        command.args(args);
        if let Some(dir) = dir {
            command.current_dir(dir);
        }
        debug!(program = %self.program.display(), args = %args.join(" "), "running transcoder");
        let result = command.output().await.map_err(|source| CompileError::Spawn {
            program: self.program.display().to_string(),
            source,
        })?;
        if !result.status.success() {
            return Err(CompileError::Transcoder {
                output: output.to_string(),
                status: result.status.to_string(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn cut_clip(&self, clip: &ClipRequest) -> Result<()> {
        let output = clip.output.display().to_string();
        self.run(&clip_args(clip), None, &output).await
    }

    async fn concat(&self, dir: &Path, list_file: &str, output: &str) -> Result<()> {
        self.run(&concat_args(list_file, output), Some(dir), output)
            .await
    }
}
