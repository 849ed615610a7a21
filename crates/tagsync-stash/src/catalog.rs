use async_trait::async_trait;

use tagsync_types::{LocalTag, MatchBy, NewTag, RecordKind, TagMatches, TagPatch, TaggableRecord};

/// The local media catalog: tags plus the records that carry them.
///
/// Every method is a single request against the catalog. Retrying and
/// statistics belong to the caller.
#[async_trait]
pub trait LocalCatalog: Send + Sync {
    /// `MatchBy::Name` matches tag names and aliases, `MatchBy::Alias` only aliases.
    async fn find_tags(&self, query: &str, by: MatchBy) -> anyhow::Result<TagMatches>;

    async fn create_tag(&self, tag: &NewTag) -> anyhow::Result<LocalTag>;

    async fn update_tag(&self, patch: &TagPatch) -> anyhow::Result<()>;

    /// Reassigns every application of `source_id` to `destination_id` and
    /// deletes the source. The source name becomes an alias of the destination.
    async fn merge_tags(&self, source_id: &str, destination_id: &str) -> anyhow::Result<()>;

    async fn find_tagged(
        &self,
        kind: RecordKind,
        tag_id: &str,
    ) -> anyhow::Result<Vec<TaggableRecord>>;

    /// Full replace of the record's tag set (and, for markers, its required fields).
    async fn update_record(&self, record: &TaggableRecord) -> anyhow::Result<()>;
}
