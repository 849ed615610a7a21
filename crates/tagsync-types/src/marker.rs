use serde::{Deserialize, Serialize};

/// A scene marker selected for a compilation, with what is needed to cut it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompilationMarker {
    pub primary_tag: String,
    #[serde(default)]
    pub performers: Vec<String>,
    pub seconds: f64,
    pub stream_url: String,
    pub scene_id: String,
}
