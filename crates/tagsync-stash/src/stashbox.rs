use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use tagsync_types::RemoteTag;

use crate::graphql::GraphQlClient;

pub const TAGS_PER_PAGE: u32 = 100;
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(750);

const QUERY_TAGS: &str = r#"
query Tags($input: TagQueryInput!) {
    queryTags(input: $input) {
        count
        tags {
            id
            name
            aliases
            description
        }
    }
}
"#;

#[derive(Debug, Clone, Deserialize)]
pub struct TagPage {
    pub count: usize,
    #[serde(default)]
    pub tags: Vec<RemoteTag>,
}

#[async_trait]
pub trait RemoteTagSource: Send + Sync {
    /// One page (1-based) of the authoritative tag list.
    async fn fetch_page(&self, page: u32, per_page: u32) -> anyhow::Result<TagPage>;

    /// Total number of remote tags.
    async fn tag_count(&self) -> anyhow::Result<usize> {
        Ok(self.fetch_page(1, 1).await?.count)
    }
}

/// Pages through the remote taxonomy until `count` tags have been collected.
pub async fn fetch_all_tags(
    source: &dyn RemoteTagSource,
    page_delay: Duration,
) -> anyhow::Result<Vec<RemoteTag>> {
    let mut page = 1;
    let first = source.fetch_page(page, TAGS_PER_PAGE).await?;
    let total = first.count;
    let mut all_tags = first.tags;

    while all_tags.len() < total {
        page += 1;
        info!(page, collected = all_tags.len(), total, "fetching remote tag page");
        tokio::time::sleep(page_delay).await;
        let next = source.fetch_page(page, TAGS_PER_PAGE).await?;
        if next.tags.is_empty() {
            warn!(
                page,
                collected = all_tags.len(),
                total,
                "remote returned an empty page before the advertised count was reached"
            );
            break;
        }
        all_tags.extend(next.tags);
    }

    info!(count = all_tags.len(), "remote tag list fetched");
    Ok(all_tags)
}

/// Client for the authoritative stash-box taxonomy.
pub struct StashBoxClient {
    graphql: GraphQlClient,
}

#[derive(Deserialize)]
struct QueryTagsData {
    #[serde(rename = "queryTags")]
    query_tags: TagPage,
}

impl StashBoxClient {
    pub fn new(graphql: GraphQlClient) -> Self {
        Self { graphql }
    }
}

#[async_trait]
impl RemoteTagSource for StashBoxClient {
    async fn fetch_page(&self, page: u32, per_page: u32) -> anyhow::Result<TagPage> {
        let variables = json!({
            "input": {
                "page": page,
                "per_page": per_page,
                "sort": "NAME",
                "direction": "DESC",
            }
        });
        let data: QueryTagsData = self
            .graphql
            .execute("queryTags", QUERY_TAGS, variables)
            .await?;
        Ok(data.query_tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn remote(id: usize) -> RemoteTag {
        RemoteTag {
            id: id.to_string(),
            name: format!("Tag {id}"),
            description: String::new(),
            aliases: Vec::new(),
        }
    }

    struct PagedSource {
        total: usize,
        served: Mutex<Vec<u32>>,
    }

    #[async_trait]
    impl RemoteTagSource for PagedSource {
        async fn fetch_page(&self, page: u32, per_page: u32) -> anyhow::Result<TagPage> {
            self.served.lock().expect("lock").push(page);
            let start = (page as usize - 1) * per_page as usize;
            let end = (start + per_page as usize).min(self.total);
            Ok(TagPage {
                count: self.total,
                tags: (start..end).map(remote).collect(),
            })
        }
    }

    #[tokio::test]
    async fn pages_until_count_is_reached() {
        let source = PagedSource {
            total: 250,
            served: Mutex::new(Vec::new()),
        };
        let tags = fetch_all_tags(&source, Duration::ZERO).await.expect("tags");
        assert_eq!(tags.len(), 250);
        assert_eq!(*source.served.lock().expect("lock"), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn stops_on_short_remote() {
        struct Lying;
        #[async_trait]
        impl RemoteTagSource for Lying {
            async fn fetch_page(&self, page: u32, _per_page: u32) -> anyhow::Result<TagPage> {
                let tags = if page == 1 { vec![remote(1)] } else { Vec::new() };
                Ok(TagPage { count: 5, tags })
            }
        }
        let tags = fetch_all_tags(&Lying, Duration::ZERO).await.expect("tags");
        assert_eq!(tags.len(), 1);
    }

    #[tokio::test]
    async fn stashbox_client_decodes_query_tags() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "variables": { "input": { "page": 2, "per_page": 100, "sort": "NAME" } }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {
                    "queryTags": {
                        "count": 101,
                        "tags": [{
                            "id": "abc",
                            "name": "Kissing",
                            "aliases": ["Smooching"],
                            "description": null
                        }]
                    }
                }
            })))
            .mount(&server)
            .await;

        let client = StashBoxClient::new(GraphQlClient::new(server.uri(), None).expect("client"));
        let page = client.fetch_page(2, TAGS_PER_PAGE).await.expect("page");
        assert_eq!(page.count, 101);
        assert_eq!(page.tags[0].name, "Kissing");
        assert_eq!(page.tags[0].aliases, vec!["Smooching"]);
    }
}
