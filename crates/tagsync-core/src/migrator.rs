use tracing::{debug, info, warn};

use tagsync_types::{same_name, LocalTag, NewTag, RecordKind, TagPatch};

use crate::error::Result;
use crate::gateway::CatalogGateway;
use crate::stats::{RunContext, SyncEvent};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Promotion {
    /// The alias now stands on its own as this tag.
    Promoted(LocalTag),
    /// The alias only duplicated the tag's own name and was dropped.
    DuplicateAliasRemoved,
}

/// Moves tag applications and aliases between local tags. Additive only:
/// a record keeps the tag it had and gains the new one.
pub struct Migrator<'a> {
    gateway: &'a CatalogGateway,
}

impl<'a> Migrator<'a> {
    pub fn new(gateway: &'a CatalogGateway) -> Self {
        Self { gateway }
    }

    /// Adds `new_tag` to every scene, gallery, performer and marker tagged
    /// with `old_tag_id`. Returns how many records were rewritten.
    pub async fn migrate_applications(
        &self,
        ctx: &mut RunContext,
        old_tag_id: &str,
        new_tag: &LocalTag,
    ) -> Result<usize> {
        let mut migrated = 0;
        for kind in RecordKind::ALL {
            let records = self.gateway.find_tagged(ctx, kind, old_tag_id).await?;
            for record in records {
                let Some(updated) = record.with_tag(&new_tag.id) else {
                    continue;
                };
                self.gateway.update_record(ctx, &updated).await?;
                ctx.record(SyncEvent::migrated(kind));
                migrated += 1;
                debug!(
                    kind = %kind,
                    record_id = record.id(),
                    record = record.label(),
                    tag = %new_tag.name,
                    "added tag to record"
                );
            }
        }
        info!(
            old_tag_id,
            new_tag = %new_tag.name,
            migrated,
            "tag applications migrated"
        );
        Ok(migrated)
    }

    /// Turns `alias` of `old_tag` into a tag of its own built from `seed`.
    ///
    /// The alias is removed before the new tag is created because the catalog
    /// refuses a tag name that is still an alias elsewhere. A run interrupted
    /// between the two steps leaves applications only on `old_tag`.
    pub async fn promote_alias(
        &self,
        ctx: &mut RunContext,
        old_tag: &LocalTag,
        seed: &NewTag,
        alias: &str,
    ) -> Result<Promotion> {
        let trimmed = old_tag.without_alias(alias);
        self.gateway
            .update_tag(ctx, &TagPatch::between(old_tag, &trimmed))
            .await?;

        if same_name(alias, &old_tag.name) {
            info!(tag = %old_tag.name, alias, "removed alias duplicating the tag name");
            return Ok(Promotion::DuplicateAliasRemoved);
        }

        warn!(
            from = %old_tag.name,
            alias,
            "alias removed; creating tag and migrating applications"
        );
        let created = self.gateway.create_tag(ctx, seed).await?;
        self.migrate_applications(ctx, &old_tag.id, &created).await?;
        info!(from = %old_tag.name, tag = %created.name, "alias promoted to tag");
        Ok(Promotion::Promoted(created))
    }

    /// Moves `alias` from `old_tag` to `new_tag`.
    ///
    /// Applications move first. Until the alias leaves `old_tag` the next run
    /// still sees it as pending, so an interrupted migration is redone.
    pub async fn migrate_alias(
        &self,
        ctx: &mut RunContext,
        old_tag: &LocalTag,
        new_tag: &LocalTag,
        alias: &str,
    ) -> Result<()> {
        self.migrate_applications(ctx, &old_tag.id, new_tag).await?;

        let old_after = old_tag.without_alias(alias);
        self.gateway
            .update_tag(ctx, &TagPatch::between(old_tag, &old_after))
            .await?;

        let new_after = new_tag.with_alias(alias);
        self.gateway
            .update_tag(ctx, &TagPatch::between(new_tag, &new_after))
            .await?;

        info!(from = %old_tag.name, to = %new_tag.name, alias, "alias migrated");
        Ok(())
    }
}
