use tagsync_types::MatchBy;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    /// Several local tags matched and none matched exactly.
    #[error("ambiguous {by} lookup for `{query}`: candidates [{}]", .candidates.join(", "))]
    Ambiguous {
        query: String,
        by: MatchBy,
        candidates: Vec<String>,
    },

    /// The catalog kept failing past the retry budget. Ends the run.
    #[error("catalog operation `{operation}` failed {attempts} times in a row: {last_error}")]
    CatalogUnavailable {
        operation: &'static str,
        attempts: u32,
        last_error: String,
    },

    /// The catalog did not reflect a write the engine just made.
    #[error("catalog state inconsistent: {0}")]
    Inconsistent(String),

    #[error("remote taxonomy error: {0:#}")]
    Remote(anyhow::Error),

    #[error("tag cache error at {path}: {reason}")]
    Cache { path: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),
}

impl SyncError {
    /// Fatal errors stop the whole run; everything else is absorbed per tag.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SyncError::CatalogUnavailable { .. })
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
