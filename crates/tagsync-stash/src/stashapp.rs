use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use tagsync_types::{
    Gallery, LocalTag, MatchBy, NewTag, Performer, RecordKind, Scene, SceneMarker, TagMatches,
    TagPatch, TagUsage, TaggableRecord,
};

use crate::catalog::LocalCatalog;
use crate::graphql::GraphQlClient;

const FIND_TAGS: &str = r#"
query FindTags($filter: FindFilterType, $tag_filter: TagFilterType) {
    findTags(filter: $filter, tag_filter: $tag_filter) {
        count
        tags { id name description aliases }
    }
}
"#;

const FIND_TAG_USAGE: &str = r#"
query FindTagUsage($filter: FindFilterType, $tag_filter: TagFilterType) {
    findTags(filter: $filter, tag_filter: $tag_filter) {
        tags { id name scene_marker_count }
    }
}
"#;

const TAG_CREATE: &str = r#"
mutation TagCreate($input: TagCreateInput!) {
    tagCreate(input: $input) { id name description aliases }
}
"#;

const TAG_UPDATE: &str = r#"
mutation TagUpdate($input: TagUpdateInput!) {
    tagUpdate(input: $input) { id }
}
"#;

const TAGS_MERGE: &str = r#"
mutation TagsMerge($source: [ID!]!, $destination: ID!) {
    tagsMerge(input: { source: $source, destination: $destination }) { id }
}
"#;

const FIND_SCENES: &str = r#"
query FindScenes($filter: FindFilterType, $scene_filter: SceneFilterType) {
    findScenes(filter: $filter, scene_filter: $scene_filter) {
        scenes { id title tags { id } }
    }
}
"#;

const FIND_GALLERIES: &str = r#"
query FindGalleries($filter: FindFilterType, $gallery_filter: GalleryFilterType) {
    findGalleries(filter: $filter, gallery_filter: $gallery_filter) {
        galleries { id title tags { id } }
    }
}
"#;

const FIND_PERFORMERS: &str = r#"
query FindPerformers($filter: FindFilterType, $performer_filter: PerformerFilterType) {
    findPerformers(filter: $filter, performer_filter: $performer_filter) {
        performers { id name tags { id } }
    }
}
"#;

const FIND_MARKERS: &str = r#"
query FindSceneMarkers($filter: FindFilterType, $scene_marker_filter: SceneMarkerFilterType) {
    findSceneMarkers(filter: $filter, scene_marker_filter: $scene_marker_filter) {
        scene_markers {
            id
            title
            seconds
            scene { id }
            primary_tag { id }
            tags { id }
        }
    }
}
"#;

const SCENE_UPDATE: &str = r#"
mutation SceneUpdate($input: SceneUpdateInput!) { sceneUpdate(input: $input) { id } }
"#;

const GALLERY_UPDATE: &str = r#"
mutation GalleryUpdate($input: GalleryUpdateInput!) { galleryUpdate(input: $input) { id } }
"#;

const PERFORMER_UPDATE: &str = r#"
mutation PerformerUpdate($input: PerformerUpdateInput!) { performerUpdate(input: $input) { id } }
"#;

const MARKER_UPDATE: &str = r#"
mutation SceneMarkerUpdate($input: SceneMarkerUpdateInput!) { sceneMarkerUpdate(input: $input) { id } }
"#;

#[derive(Deserialize)]
struct IdRef {
    id: String,
}

fn ids(refs: Vec<IdRef>) -> Vec<String> {
    refs.into_iter().map(|r| r.id).collect()
}

#[derive(Deserialize)]
struct FindTagsData {
    #[serde(rename = "findTags")]
    find_tags: TagList,
}

#[derive(Deserialize)]
struct TagList {
    #[serde(default)]
    tags: Vec<LocalTag>,
}

#[derive(Deserialize)]
struct TagUsageData {
    #[serde(rename = "findTags")]
    find_tags: TagUsageList,
}

#[derive(Deserialize)]
struct TagUsageList {
    #[serde(default)]
    tags: Vec<WireTagUsage>,
}

#[derive(Deserialize)]
struct WireTagUsage {
    id: String,
    name: String,
    #[serde(default)]
    scene_marker_count: u64,
}

#[derive(Deserialize)]
struct TagCreateData {
    #[serde(rename = "tagCreate")]
    tag_create: LocalTag,
}

#[derive(Deserialize)]
struct WireScene {
    id: String,
    title: Option<String>,
    #[serde(default)]
    tags: Vec<IdRef>,
}

#[derive(Deserialize)]
struct WirePerformer {
    id: String,
    name: String,
    #[serde(default)]
    tags: Vec<IdRef>,
}

#[derive(Deserialize)]
struct WireMarker {
    id: String,
    #[serde(default)]
    title: String,
    seconds: f64,
    scene: IdRef,
    primary_tag: IdRef,
    #[serde(default)]
    tags: Vec<IdRef>,
}

#[derive(Deserialize)]
struct FindScenesData {
    #[serde(rename = "findScenes")]
    find_scenes: SceneList,
}

#[derive(Deserialize)]
struct SceneList {
    #[serde(default)]
    scenes: Vec<WireScene>,
}

#[derive(Deserialize)]
struct FindGalleriesData {
    #[serde(rename = "findGalleries")]
    find_galleries: GalleryList,
}

#[derive(Deserialize)]
struct GalleryList {
    #[serde(default)]
    galleries: Vec<WireScene>,
}

#[derive(Deserialize)]
struct FindPerformersData {
    #[serde(rename = "findPerformers")]
    find_performers: PerformerList,
}

#[derive(Deserialize)]
struct PerformerList {
    #[serde(default)]
    performers: Vec<WirePerformer>,
}

#[derive(Deserialize)]
struct FindMarkersData {
    #[serde(rename = "findSceneMarkers")]
    find_scene_markers: MarkerList,
}

#[derive(Deserialize)]
struct MarkerList {
    #[serde(default)]
    scene_markers: Vec<WireMarker>,
}

/// Client for the local stash-app catalog.
pub struct StashAppClient {
    graphql: GraphQlClient,
}

impl StashAppClient {
    pub fn new(graphql: GraphQlClient) -> Self {
        Self { graphql }
    }

    pub fn graphql(&self) -> &GraphQlClient {
        &self.graphql
    }

    /// Tags used as a marker tag at least once, most used first.
    pub async fn marker_tag_counts(&self) -> anyhow::Result<Vec<TagUsage>> {
        let variables = json!({
            "filter": { "per_page": -1 },
            "tag_filter": { "marker_count": { "value": 0, "modifier": "GREATER_THAN" } },
        });
        let data: TagUsageData = self
            .graphql
            .execute("findTags", FIND_TAG_USAGE, variables)
            .await?;
        let mut usage = data
            .find_tags
            .tags
            .into_iter()
            .filter(|t| t.scene_marker_count > 0)
            .map(|t| TagUsage {
                id: t.id,
                name: t.name,
                marker_count: t.scene_marker_count,
            })
            .collect::<Vec<_>>();
        usage.sort_by(|a, b| b.marker_count.cmp(&a.marker_count));
        Ok(usage)
    }
}

/// Filter value selecting records that carry `tag_id`.
fn tagged_with(tag_id: &str) -> Value {
    json!({ "tags": { "value": [tag_id], "modifier": "INCLUDES", "depth": 0 } })
}

fn tag_filter(query: &str, by: MatchBy) -> Value {
    let criterion = json!({ "value": query, "modifier": "EQUALS" });
    match by {
        MatchBy::Name => json!({ "name": criterion, "OR": { "aliases": criterion } }),
        MatchBy::Alias => json!({ "aliases": criterion }),
    }
}

#[async_trait]
impl LocalCatalog for StashAppClient {
    async fn find_tags(&self, query: &str, by: MatchBy) -> anyhow::Result<TagMatches> {
        let variables = json!({
            "filter": { "per_page": -1 },
            "tag_filter": tag_filter(query, by),
        });
        let data: FindTagsData = self
            .graphql
            .execute("findTags", FIND_TAGS, variables)
            .await?;
        Ok(TagMatches::from(data.find_tags.tags))
    }

    async fn create_tag(&self, tag: &NewTag) -> anyhow::Result<LocalTag> {
        let data: TagCreateData = self
            .graphql
            .execute("tagCreate", TAG_CREATE, json!({ "input": tag }))
            .await?;
        Ok(data.tag_create)
    }

    async fn update_tag(&self, patch: &TagPatch) -> anyhow::Result<()> {
        let _: Value = self
            .graphql
            .execute("tagUpdate", TAG_UPDATE, json!({ "input": patch }))
            .await?;
        Ok(())
    }

    async fn merge_tags(&self, source_id: &str, destination_id: &str) -> anyhow::Result<()> {
        let variables = json!({ "source": [source_id], "destination": destination_id });
        let _: Value = self
            .graphql
            .execute("tagsMerge", TAGS_MERGE, variables)
            .await?;
        Ok(())
    }

    async fn find_tagged(
        &self,
        kind: RecordKind,
        tag_id: &str,
    ) -> anyhow::Result<Vec<TaggableRecord>> {
        let filter = json!({ "per_page": -1 });
        let records: Vec<TaggableRecord> = match kind {
            RecordKind::Scene => {
                let data: FindScenesData = self
                    .graphql
                    .execute(
                        "findScenes",
                        FIND_SCENES,
                        json!({ "filter": filter, "scene_filter": tagged_with(tag_id) }),
                    )
                    .await?;
                data.find_scenes
                    .scenes
                    .into_iter()
                    .map(|s| {
                        TaggableRecord::Scene(Scene {
                            id: s.id,
                            title: s.title,
                            tag_ids: ids(s.tags),
                        })
                    })
                    .collect()
            }
            RecordKind::Gallery => {
                let data: FindGalleriesData = self
                    .graphql
                    .execute(
                        "findGalleries",
                        FIND_GALLERIES,
                        json!({ "filter": filter, "gallery_filter": tagged_with(tag_id) }),
                    )
                    .await?;
                data.find_galleries
                    .galleries
                    .into_iter()
                    .map(|g| {
                        TaggableRecord::Gallery(Gallery {
                            id: g.id,
                            title: g.title,
                            tag_ids: ids(g.tags),
                        })
                    })
                    .collect()
            }
            RecordKind::Performer => {
                let data: FindPerformersData = self
                    .graphql
                    .execute(
                        "findPerformers",
                        FIND_PERFORMERS,
                        json!({ "filter": filter, "performer_filter": tagged_with(tag_id) }),
                    )
                    .await?;
                data.find_performers
                    .performers
                    .into_iter()
                    .map(|p| {
                        TaggableRecord::Performer(Performer {
                            id: p.id,
                            name: p.name,
                            tag_ids: ids(p.tags),
                        })
                    })
                    .collect()
            }
            RecordKind::Marker => {
                let data: FindMarkersData = self
                    .graphql
                    .execute(
                        "findSceneMarkers",
                        FIND_MARKERS,
                        json!({ "filter": filter, "scene_marker_filter": tagged_with(tag_id) }),
                    )
                    .await?;
                data.find_scene_markers
                    .scene_markers
                    .into_iter()
                    .map(|m| {
                        TaggableRecord::Marker(SceneMarker {
                            id: m.id,
                            title: m.title,
                            seconds: m.seconds,
                            scene_id: m.scene.id,
                            primary_tag_id: m.primary_tag.id,
                            tag_ids: ids(m.tags),
                        })
                    })
                    .collect()
            }
        };
        Ok(records)
    }

    async fn update_record(&self, record: &TaggableRecord) -> anyhow::Result<()> {
        let (operation, mutation, input) = match record {
            TaggableRecord::Scene(s) => (
                "sceneUpdate",
                SCENE_UPDATE,
                json!({ "id": s.id, "tag_ids": s.tag_ids }),
            ),
            TaggableRecord::Gallery(g) => (
                "galleryUpdate",
                GALLERY_UPDATE,
                json!({ "id": g.id, "tag_ids": g.tag_ids }),
            ),
            TaggableRecord::Performer(p) => (
                "performerUpdate",
                PERFORMER_UPDATE,
                json!({ "id": p.id, "tag_ids": p.tag_ids }),
            ),
            TaggableRecord::Marker(m) => (
                "sceneMarkerUpdate",
                MARKER_UPDATE,
                json!({
                    "id": m.id,
                    "title": m.title,
                    "seconds": m.seconds,
                    "scene_id": m.scene_id,
                    "primary_tag_id": m.primary_tag_id,
                    "tag_ids": m.tag_ids,
                }),
            ),
        };
        let _: Value = self
            .graphql
            .execute(operation, mutation, json!({ "input": input }))
            .await?;
        Ok(())
    }
}
