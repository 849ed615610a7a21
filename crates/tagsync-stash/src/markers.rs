use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use tagsync_types::CompilationMarker;

use crate::graphql::GraphQlClient;

pub const MARKERS_PER_PAGE: u32 = 100;
pub const DIRECT_STREAM_LABEL: &str = "Direct stream";

const FIND_COMPILATION_MARKERS: &str = r#"
query FindSceneMarkers($filter: FindFilterType, $scene_marker_filter: SceneMarkerFilterType) {
    findSceneMarkers(filter: $filter, scene_marker_filter: $scene_marker_filter) {
        count
        scene_markers {
            seconds
            primary_tag { name }
            scene {
                id
                performers { name }
                sceneStreams { url label }
            }
        }
    }
}
"#;

#[derive(Deserialize)]
struct FindMarkersData {
    #[serde(rename = "findSceneMarkers")]
    find_scene_markers: MarkerPage,
}

#[derive(Deserialize)]
struct MarkerPage {
    count: usize,
    #[serde(default)]
    scene_markers: Vec<WireMarker>,
}

#[derive(Deserialize)]
struct WireMarker {
    seconds: f64,
    primary_tag: Named,
    scene: WireScene,
}

#[derive(Deserialize)]
struct Named {
    name: String,
}

#[derive(Deserialize)]
struct WireScene {
    id: String,
    #[serde(default)]
    performers: Vec<Named>,
    #[serde(rename = "sceneStreams", default)]
    scene_streams: Vec<WireStream>,
}

#[derive(Deserialize)]
struct WireStream {
    url: String,
    label: Option<String>,
}

impl WireMarker {
    fn into_marker(self) -> Option<CompilationMarker> {
        let stream_url = self
            .scene
            .scene_streams
            .into_iter()
            .find(|s| s.label.as_deref() == Some(DIRECT_STREAM_LABEL))?
            .url;
        Some(CompilationMarker {
            primary_tag: self.primary_tag.name,
            performers: self.scene.performers.into_iter().map(|p| p.name).collect(),
            seconds: self.seconds,
            stream_url,
            scene_id: self.scene.id,
        })
    }
}

/// Markers whose primary tag is one of `tag_ids`, newest first.
///
/// Markers whose scene has no direct stream cannot be cut and are skipped.
pub async fn fetch_compilation_markers(
    graphql: &GraphQlClient,
    tag_ids: &[String],
) -> anyhow::Result<Vec<CompilationMarker>> {
    let mut markers = Vec::new();
    let mut seen = 0;
    let mut page = 1;
    loop {
        let variables = json!({
            "filter": {
                "q": "",
                "page": page,
                "per_page": MARKERS_PER_PAGE,
                "sort": "created_at",
                "direction": "DESC",
            },
            "scene_marker_filter": {
                "tags": { "value": tag_ids, "modifier": "INCLUDES", "depth": 0 },
            },
        });
        let data: FindMarkersData = graphql
            .execute("findSceneMarkers", FIND_COMPILATION_MARKERS, variables)
            .await?;
        let batch = data.find_scene_markers;
        if batch.scene_markers.is_empty() {
            break;
        }
        seen += batch.scene_markers.len();
        for wire in batch.scene_markers {
            let scene_id = wire.scene.id.clone();
            let seconds = wire.seconds;
            match wire.into_marker() {
                Some(marker) => markers.push(marker),
                None => warn!(%scene_id, seconds, "marker scene has no direct stream; skipping"),
            }
        }
        if seen >= batch.count {
            break;
        }
        page += 1;
    }
    info!(count = markers.len(), seen, "compilation markers fetched");
    Ok(markers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn marker_json(scene: &str, seconds: f64, streams: serde_json::Value) -> serde_json::Value {
        json!({
            "seconds": seconds,
            "primary_tag": { "name": "Kissing" },
            "scene": {
                "id": scene,
                "performers": [{ "name": "A" }, { "name": "B" }],
                "sceneStreams": streams,
            }
        })
    }

    #[tokio::test]
    async fn keeps_direct_stream_and_skips_unplayable_markers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "variables": {
                    "filter": { "page": 1, "per_page": 100, "sort": "created_at" },
                    "scene_marker_filter": { "tags": { "value": ["4"], "modifier": "INCLUDES" } }
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "findSceneMarkers": { "count": 2, "scene_markers": [
                    marker_json("10", 12.5, json!([
                        { "url": "http://stash/scene/10/stream.m3u8", "label": "HLS" },
                        { "url": "http://stash/scene/10/stream", "label": "Direct stream" }
                    ])),
                    marker_json("11", 3.0, json!([
                        { "url": "http://stash/scene/11/stream.m3u8", "label": "HLS" }
                    ])),
                ] } }
            })))
            .mount(&server)
            .await;

        let graphql = GraphQlClient::new(server.uri(), None).expect("client");
        let markers = fetch_compilation_markers(&graphql, &["4".to_string()])
            .await
            .expect("markers");

        assert_eq!(markers.len(), 1);
        let marker = &markers[0];
        assert_eq!(marker.scene_id, "10");
        assert_eq!(marker.stream_url, "http://stash/scene/10/stream");
        assert_eq!(marker.performers, vec!["A", "B"]);
        assert_eq!(marker.primary_tag, "Kissing");
        assert_eq!(marker.seconds, 12.5);
    }
}
