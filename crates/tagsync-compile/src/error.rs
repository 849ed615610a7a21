use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("no markers to compile")]
    NoMarkers,
    #[error("clip duration must be positive")]
    InvalidDuration,
    #[error("clip directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("transcoder exited with {status} while writing {output}: {stderr}")]
    Transcoder {
        output: String,
        status: String,
        stderr: String,
    },
}

pub type Result<T> = std::result::Result<T, CompileError>;
