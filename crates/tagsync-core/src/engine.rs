use std::str::FromStr;

use tracing::{debug, error, info, warn, Level};

use tagsync_observability::{emit_event, RunEvent};
use tagsync_types::{same_name, LocalTag, MatchBy, NewTag, RemoteTag, TagPatch};

use crate::error::{Result, SyncError};
use crate::gateway::CatalogGateway;
use crate::migrator::{Migrator, Promotion};
use crate::resolver::TagResolver;
use crate::stats::{RunContext, SyncEvent};

/// Reconciliation phases in their fixed run order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Create,
    Alias,
    Merge,
    Update,
}

impl Phase {
    pub const ALL: [Phase; 4] = [Phase::Create, Phase::Alias, Phase::Merge, Phase::Update];

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Create => "create",
            Phase::Alias => "alias",
            Phase::Merge => "merge",
            Phase::Update => "update",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = SyncError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Phase::ALL
            .into_iter()
            .find(|p| p.as_str() == wanted)
            .ok_or_else(|| {
                SyncError::Config(format!(
                    "unknown phase `{s}`. phases: create, alias, merge, update"
                ))
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    Merged { source: LocalTag },
    NotFound,
    /// The alias resolves to a tag that only carries it as an alias.
    AliasElsewhere { holder: LocalTag },
    SelfMerge,
}

/// Brings the local taxonomy in line with the remote one.
///
/// Each phase walks the full remote tag list. Per-tag failures are counted
/// and skipped; only [`SyncError::CatalogUnavailable`] stops a run. Every
/// step checks current catalog state before writing, so a run interrupted
/// at any point is finished by running again from the first phase.
pub struct ReconcileEngine {
    gateway: CatalogGateway,
}

impl ReconcileEngine {
    pub fn new(gateway: CatalogGateway) -> Self {
        Self { gateway }
    }

    fn resolver(&self) -> TagResolver<'_> {
        TagResolver::new(&self.gateway)
    }

    fn migrator(&self) -> Migrator<'_> {
        Migrator::new(&self.gateway)
    }

    pub async fn run(&self, ctx: &mut RunContext, remote_tags: &[RemoteTag]) -> Result<()> {
        self.run_phases(ctx, remote_tags, &Phase::ALL).await
    }

    /// Runs the selected phases, always in canonical order.
    pub async fn run_phases(
        &self,
        ctx: &mut RunContext,
        remote_tags: &[RemoteTag],
        phases: &[Phase],
    ) -> Result<()> {
        let detail = format!("remote_tags={}", remote_tags.len());
        emit_event(
            Level::INFO,
            RunEvent {
                event: "run.started",
                component: "engine",
                run_id: Some(&ctx.run_id),
                status: Some("running"),
                detail: Some(&detail),
            },
        );

        for phase in Phase::ALL.into_iter().filter(|p| phases.contains(p)) {
            info!(target: "tagsync::phase", "==== phase: {phase} ====");
            if let Err(err) = self.run_phase(ctx, phase, remote_tags).await {
                ctx.stats.report("aborted");
                let detail = format!("phase={phase} error={err}");
                emit_event(
                    Level::ERROR,
                    RunEvent {
                        event: "run.aborted",
                        component: "engine",
                        run_id: Some(&ctx.run_id),
                        status: Some("failed"),
                        detail: Some(&detail),
                    },
                );
                return Err(err);
            }
            ctx.stats.report(phase.as_str());
        }

        ctx.stats.report("final");
        let detail = format!(
            "mutations={} elapsed_ms={}",
            ctx.stats.mutations(),
            ctx.elapsed_ms()
        );
        emit_event(
            Level::INFO,
            RunEvent {
                event: "run.completed",
                component: "engine",
                run_id: Some(&ctx.run_id),
                status: Some("ok"),
                detail: Some(&detail),
            },
        );
        Ok(())
    }

    async fn run_phase(
        &self,
        ctx: &mut RunContext,
        phase: Phase,
        remote_tags: &[RemoteTag],
    ) -> Result<()> {
        let total = remote_tags.len();
        for (idx, remote) in remote_tags.iter().enumerate() {
            debug!(%phase, position = idx + 1, total, tag = %remote.name, "reconciling tag");
            let result = match phase {
                Phase::Create => self.create_tag(ctx, remote).await,
                Phase::Alias => self.create_aliases(ctx, remote).await,
                Phase::Merge => self.merge_tags(ctx, remote).await,
                Phase::Update => self.update_tag(ctx, remote).await,
            };
            if let Err(err) = result {
                if err.is_fatal() {
                    return Err(err);
                }
                ctx.record(SyncEvent::Error);
                error!(
                    %phase,
                    remote_id = %remote.id,
                    tag = %remote.name,
                    aliases = ?remote.aliases,
                    error = ?err,
                    "failed to reconcile tag: {err}"
                );
            }
        }
        Ok(())
    }

    /// The local tag carrying the remote tag's name, if any. A tag that only
    /// has the name as an alias is not a target; its promotion is pending.
    async fn resolve_target(
        &self,
        ctx: &mut RunContext,
        remote: &RemoteTag,
    ) -> Result<Option<LocalTag>> {
        let Some(local) = self
            .resolver()
            .resolve(ctx, &remote.name, MatchBy::Name)
            .await?
        else {
            debug!(tag = %remote.name, "no local tag yet");
            return Ok(None);
        };
        if !same_name(&local.name, &remote.name) {
            warn!(
                tag = %remote.name,
                holder = %local.name,
                "name is still an alias of another tag; skipping"
            );
            return Ok(None);
        }
        Ok(Some(local))
    }

    async fn reload_target(
        &self,
        ctx: &mut RunContext,
        remote: &RemoteTag,
        after: &str,
    ) -> Result<LocalTag> {
        self.resolve_target(ctx, remote).await?.ok_or_else(|| {
            SyncError::Inconsistent(format!("tag `{}` disappeared after {after}", remote.name))
        })
    }

    async fn create_tag(&self, ctx: &mut RunContext, remote: &RemoteTag) -> Result<()> {
        let seed = NewTag::from_remote(remote);
        match self
            .resolver()
            .resolve(ctx, &remote.name, MatchBy::Name)
            .await?
        {
            None => {
                let created = self.gateway.create_tag(ctx, &seed).await?;
                ctx.record(SyncEvent::TagCreated);
                info!(tag = %created.name, tag_id = %created.id, "tag created");
            }
            Some(local) if local.has_alias(&remote.name) => {
                let promotion = self
                    .migrator()
                    .promote_alias(ctx, &local, &seed, &remote.name)
                    .await?;
                if let Promotion::Promoted(_) = promotion {
                    ctx.record(SyncEvent::AliasPromoted);
                }
            }
            Some(local) => {
                debug!(tag = %local.name, tag_id = %local.id, "tag already present");
            }
        }
        Ok(())
    }

    async fn create_aliases(&self, ctx: &mut RunContext, remote: &RemoteTag) -> Result<()> {
        let Some(mut local) = self.resolve_target(ctx, remote).await? else {
            return Ok(());
        };

        for alias in &remote.aliases {
            if same_name(alias, &local.name) {
                debug!(tag = %local.name, alias, "alias equals tag name; skipping");
                continue;
            }

            let holder = self
                .resolver()
                .resolve(ctx, alias, MatchBy::Alias)
                .await?
                .filter(|h| h.has_alias(alias));

            match holder {
                Some(holder) if holder.id == local.id => {
                    debug!(tag = %local.name, alias, "alias already present");
                }
                Some(holder) => {
                    self.migrator()
                        .migrate_alias(ctx, &holder, &local, alias)
                        .await?;
                    ctx.record(SyncEvent::AliasMigrated);
                    local = self.reload_target(ctx, remote, "alias migration").await?;
                }
                None => {
                    if let MergeOutcome::Merged { .. } =
                        self.merge_alias_into(ctx, &local, alias).await?
                    {
                        // The merge also carried over the source's own aliases.
                        local = self.reload_target(ctx, remote, "merge").await?;
                        continue;
                    }
                    let updated = local.with_alias(alias);
                    self.gateway
                        .update_tag(ctx, &TagPatch::between(&local, &updated))
                        .await?;
                    ctx.record(SyncEvent::AliasCreated);
                    info!(tag = %local.name, alias, "alias created");
                    local = updated;
                }
            }
        }
        Ok(())
    }

    async fn merge_tags(&self, ctx: &mut RunContext, remote: &RemoteTag) -> Result<()> {
        let Some(destination) = self.resolve_target(ctx, remote).await? else {
            return Ok(());
        };
        for alias in &remote.aliases {
            self.merge_alias_into(ctx, &destination, alias).await?;
        }
        Ok(())
    }

    /// Merges the local tag named `alias` into `destination`, if one exists.
    pub async fn merge_alias_into(
        &self,
        ctx: &mut RunContext,
        destination: &LocalTag,
        alias: &str,
    ) -> Result<MergeOutcome> {
        let Some(found) = self.resolver().resolve(ctx, alias, MatchBy::Name).await? else {
            return Ok(MergeOutcome::NotFound);
        };

        if found.id == destination.id || same_name(alias, &destination.name) {
            debug!(tag = %destination.name, alias, "self merge skipped");
            return Ok(MergeOutcome::SelfMerge);
        }

        if !same_name(&found.name, alias) {
            info!(alias, holder = %found.name, "already an alias of another tag");
            return Ok(MergeOutcome::AliasElsewhere { holder: found });
        }

        self.gateway
            .merge_tags(ctx, &found.id, &destination.id)
            .await?;
        ctx.record(SyncEvent::TagMerged);
        info!(
            source = %found.name,
            source_id = %found.id,
            destination = %destination.name,
            destination_id = %destination.id,
            "tag merged"
        );
        Ok(MergeOutcome::Merged { source: found })
    }

    async fn update_tag(&self, ctx: &mut RunContext, remote: &RemoteTag) -> Result<()> {
        let Some(local) = self.resolve_target(ctx, remote).await? else {
            return Ok(());
        };
        let patch = TagPatch::between(&local, &local.aligned_with(remote));
        if patch.is_empty() {
            return Ok(());
        }

        self.gateway.update_tag(ctx, &patch).await?;
        if let Some(name) = &patch.name {
            ctx.record(SyncEvent::TagNameUpdated);
            info!(from = %local.name, to = %name, "tag renamed");
        }
        if patch.description.is_some() {
            ctx.record(SyncEvent::TagDescriptionUpdated);
            info!(tag = %remote.name, "tag description updated");
        }
        Ok(())
    }
}
