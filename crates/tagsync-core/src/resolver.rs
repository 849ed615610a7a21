use tracing::info;

use tagsync_types::{same_name, LocalTag, MatchBy, TagMatches};

use crate::error::{Result, SyncError};
use crate::gateway::CatalogGateway;
use crate::stats::RunContext;

/// Finds the single local tag a name or alias refers to.
pub struct TagResolver<'a> {
    gateway: &'a CatalogGateway,
}

impl<'a> TagResolver<'a> {
    pub fn new(gateway: &'a CatalogGateway) -> Self {
        Self { gateway }
    }

    pub async fn resolve(
        &self,
        ctx: &mut RunContext,
        query: &str,
        by: MatchBy,
    ) -> Result<Option<LocalTag>> {
        let matches = self.gateway.find_tags(ctx, query, by).await?;
        disambiguate(query, by, matches)
    }
}

/// Picks the tag a search result refers to. Several candidates without
/// exactly one exact match is an error; the resolver never guesses.
pub fn disambiguate(query: &str, by: MatchBy, matches: TagMatches) -> Result<Option<LocalTag>> {
    match matches {
        TagMatches::None => {
            info!(query, %by, "no local tag matches");
            Ok(None)
        }
        TagMatches::Exactly(tag) => {
            info!(query, %by, tag_id = %tag.id, tag = %tag.name, "single local tag match");
            Ok(Some(tag))
        }
        TagMatches::Many(candidates) => {
            let names = candidates.iter().map(|t| t.name.clone()).collect::<Vec<_>>();
            let mut exact = candidates.into_iter().filter(|t| match by {
                MatchBy::Name => same_name(&t.name, query),
                MatchBy::Alias => t.has_alias(query),
            });
            match (exact.next(), exact.next()) {
                (Some(tag), None) => {
                    info!(
                        query,
                        %by,
                        tag_id = %tag.id,
                        tag = %tag.name,
                        candidates = names.len(),
                        "disambiguated among multiple local tags"
                    );
                    Ok(Some(tag))
                }
                _ => Err(SyncError::Ambiguous {
                    query: query.to_string(),
                    by,
                    candidates: names,
                }),
            }
        }
    }
}
