use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use tokio::fs;
use tracing::{debug, info};

use tagsync_types::CompilationMarker;

use crate::error::{CompileError, Result};
use crate::transcoder::{ClipRequest, Transcoder};

pub const CLIP_LIST_FILE: &str = "clips.txt";
pub const COMPILATION_FILE: &str = "compilation.mp4";

#[derive(Debug, Clone, PartialEq)]
pub struct CompileOptions {
    pub clip_duration: u32,
    /// Re-cut clips that already exist in `clip_dir`.
    pub force_new: bool,
    pub shuffle: bool,
    pub clip_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Compilation {
    pub clips: Vec<PathBuf>,
    /// Clips cut during this build; the rest were reused.
    pub created: usize,
    pub output: PathBuf,
}

/// `<scene>_<start>-<end>.mp4`, so a clip is reused across builds.
pub fn clip_file_name(marker: &CompilationMarker, clip_duration: u32) -> String {
    let end = marker.seconds + f64::from(clip_duration);
    format!("{}_{}-{}.mp4", marker.scene_id, marker.seconds, end)
}

pub struct CompilationBuilder<T> {
    transcoder: T,
}

impl<T: Transcoder> CompilationBuilder<T> {
    pub fn new(transcoder: T) -> Self {
        Self { transcoder }
    }

    pub fn transcoder(&self) -> &T {
        &self.transcoder
    }

    pub async fn build(
        &self,
        mut markers: Vec<CompilationMarker>,
        options: &CompileOptions,
    ) -> Result<Compilation> {
        if markers.is_empty() {
            return Err(CompileError::NoMarkers);
        }
        if options.clip_duration == 0 {
            return Err(CompileError::InvalidDuration);
        }
        if options.shuffle {
            markers.shuffle(&mut rand::thread_rng());
        }

        let dir = options.clip_dir.as_path();
        fs::create_dir_all(dir).await.map_err(|e| io_error(dir, e))?;

        let total = markers.len();
        let mut clips = Vec::with_capacity(total);
        let mut created = 0;
        for marker in &markers {
            let clip = dir.join(clip_file_name(marker, options.clip_duration));
            if options.force_new {
                remove_if_present(&clip).await?;
            }
            let exists = fs::try_exists(&clip)
                .await
                .map_err(|e| io_error(&clip, e))?;
            if exists {
                debug!(clip = %clip.display(), "reusing existing clip");
            } else {
                let request = ClipRequest {
                    input: marker.stream_url.clone(),
                    start_seconds: marker.seconds,
                    duration_seconds: options.clip_duration,
                    output: clip.clone(),
                };
                self.transcoder.cut_clip(&request).await?;
                created += 1;
                info!(
                    clip = %clip.display(),
                    tag = %marker.primary_tag,
                    performers = ?marker.performers,
                    "created clip ({created} / {total})"
                );
            }
            clips.push(clip);
        }

        let list = clip_list(&clips);
        let list_path = dir.join(CLIP_LIST_FILE);
        fs::write(&list_path, list)
            .await
            .map_err(|e| io_error(&list_path, e))?;

        // ffmpeg will not overwrite without a terminal to confirm on.
        let output = dir.join(COMPILATION_FILE);
        remove_if_present(&output).await?;
        self.transcoder
            .concat(dir, CLIP_LIST_FILE, COMPILATION_FILE)
            .await?;
        info!(output = %output.display(), clips = clips.len(), created, "compilation finished");
        Ok(Compilation {
            clips,
            created,
            output,
        })
    }
}

/// Concat demuxer input: one `file '<name>'` line per clip, relative to the list.
fn clip_list(clips: &[PathBuf]) -> String {
    clips
        .iter()
        .filter_map(|clip| clip.file_name())
        .map(|name| format!("file '{}'", name.to_string_lossy()))
        .collect::<Vec<_>>()
        .join("\n")
}

async fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(io_error(path, err)),
    }
}

fn io_error(path: &Path, source: std::io::Error) -> CompileError {
    CompileError::Io {
        path: path.to_path_buf(),
        source,
    }
}
