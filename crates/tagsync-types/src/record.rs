use serde::{Deserialize, Serialize};

/// The four catalog entity kinds that can carry tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Scene,
    Gallery,
    Performer,
    Marker,
}

impl RecordKind {
    pub const ALL: [RecordKind; 4] = [
        RecordKind::Scene,
        RecordKind::Gallery,
        RecordKind::Performer,
        RecordKind::Marker,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RecordKind::Scene => "scene",
            RecordKind::Gallery => "gallery",
            RecordKind::Performer => "performer",
            RecordKind::Marker => "marker",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub tag_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gallery {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub tag_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Performer {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tag_ids: Vec<String>,
}

/// Scene markers are updated with a full replace, so every field the update
/// mutation requires is kept alongside the tag set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneMarker {
    pub id: String,
    pub title: String,
    pub seconds: f64,
    pub scene_id: String,
    pub primary_tag_id: String,
    #[serde(default)]
    pub tag_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaggableRecord {
    Scene(Scene),
    Gallery(Gallery),
    Performer(Performer),
    Marker(SceneMarker),
}

impl TaggableRecord {
    pub fn kind(&self) -> RecordKind {
        match self {
            TaggableRecord::Scene(_) => RecordKind::Scene,
            TaggableRecord::Gallery(_) => RecordKind::Gallery,
            TaggableRecord::Performer(_) => RecordKind::Performer,
            TaggableRecord::Marker(_) => RecordKind::Marker,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            TaggableRecord::Scene(r) => &r.id,
            TaggableRecord::Gallery(r) => &r.id,
            TaggableRecord::Performer(r) => &r.id,
            TaggableRecord::Marker(r) => &r.id,
        }
    }

    /// Human-readable identification for logs.
    pub fn label(&self) -> &str {
        match self {
            TaggableRecord::Scene(r) => r.title.as_deref().unwrap_or(""),
            TaggableRecord::Gallery(r) => r.title.as_deref().unwrap_or(""),
            TaggableRecord::Performer(r) => &r.name,
            TaggableRecord::Marker(r) => &r.title,
        }
    }

    pub fn tag_ids(&self) -> &[String] {
        match self {
            TaggableRecord::Scene(r) => &r.tag_ids,
            TaggableRecord::Gallery(r) => &r.tag_ids,
            TaggableRecord::Performer(r) => &r.tag_ids,
            TaggableRecord::Marker(r) => &r.tag_ids,
        }
    }

    pub fn has_tag(&self, tag_id: &str) -> bool {
        self.tag_ids().iter().any(|id| id == tag_id)
    }

    /// The record with `tag_id` appended to its tag set, or `None` when the
    /// record already carries it. Existing tags are never dropped.
    pub fn with_tag(&self, tag_id: &str) -> Option<TaggableRecord> {
        if self.has_tag(tag_id) {
            return None;
        }
        let mut next = self.clone();
        let tags = match &mut next {
            TaggableRecord::Scene(r) => &mut r.tag_ids,
            TaggableRecord::Gallery(r) => &mut r.tag_ids,
            TaggableRecord::Performer(r) => &mut r.tag_ids,
            TaggableRecord::Marker(r) => &mut r.tag_ids,
        };
        tags.push(tag_id.to_string());
        Some(next)
    }
}
