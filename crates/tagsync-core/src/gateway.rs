use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use tagsync_stash::LocalCatalog;
use tagsync_types::{
    Gallery, LocalTag, MatchBy, NewTag, Performer, RecordKind, Scene, SceneMarker, TagMatches,
    TagPatch, TaggableRecord,
};

use crate::error::{Result, SyncError};
use crate::stats::{RunContext, SyncEvent};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(10);

/// Retry budget for catalog calls: fixed sleep, no jitter, no growth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewayPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for GatewayPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: DEFAULT_BACKOFF,
        }
    }
}

/// One catalog verb together with its payload.
#[derive(Debug, Clone, Copy)]
pub enum CatalogOp<'a> {
    FindTag { query: &'a str, by: MatchBy },
    FindScenes { tag_id: &'a str },
    FindGalleries { tag_id: &'a str },
    FindPerformers { tag_id: &'a str },
    FindMarkers { tag_id: &'a str },
    CreateTag(&'a NewTag),
    UpdateTag(&'a TagPatch),
    MergeTags {
        source_id: &'a str,
        destination_id: &'a str,
    },
    UpdateScene(&'a Scene),
    UpdateGallery(&'a Gallery),
    UpdatePerformer(&'a Performer),
    UpdateMarker(&'a SceneMarker),
}

impl<'a> CatalogOp<'a> {
    pub fn find_records(kind: RecordKind, tag_id: &'a str) -> Self {
        match kind {
            RecordKind::Scene => CatalogOp::FindScenes { tag_id },
            RecordKind::Gallery => CatalogOp::FindGalleries { tag_id },
            RecordKind::Performer => CatalogOp::FindPerformers { tag_id },
            RecordKind::Marker => CatalogOp::FindMarkers { tag_id },
        }
    }

    pub fn update_record(record: &'a TaggableRecord) -> Self {
        match record {
            TaggableRecord::Scene(r) => CatalogOp::UpdateScene(r),
            TaggableRecord::Gallery(r) => CatalogOp::UpdateGallery(r),
            TaggableRecord::Performer(r) => CatalogOp::UpdatePerformer(r),
            TaggableRecord::Marker(r) => CatalogOp::UpdateMarker(r),
        }
    }

    pub fn verb(&self) -> &'static str {
        match self {
            CatalogOp::FindTag { .. } => "find-tag",
            CatalogOp::FindScenes { .. } => "find-scenes",
            CatalogOp::FindGalleries { .. } => "find-galleries",
            CatalogOp::FindPerformers { .. } => "find-performers",
            CatalogOp::FindMarkers { .. } => "find-markers-by-tag",
            CatalogOp::CreateTag(_) => "create-tag",
            CatalogOp::UpdateTag(_) => "update-tag",
            CatalogOp::MergeTags { .. } => "merge-tags",
            CatalogOp::UpdateScene(_) => "update-scene",
            CatalogOp::UpdateGallery(_) => "update-gallery",
            CatalogOp::UpdatePerformer(_) => "update-performer",
            CatalogOp::UpdateMarker(_) => "update-marker",
        }
    }
}

/// Every catalog access of a run goes through here.
///
/// A failed call is logged with its payload and retried after the policy's
/// backoff. When `max_attempts` consecutive calls fail the gateway counts
/// `api_fail` and returns [`SyncError::CatalogUnavailable`], which ends the
/// run. The first success after a failure counts `api_recovery`.
#[derive(Clone)]
pub struct CatalogGateway {
    catalog: Arc<dyn LocalCatalog>,
    policy: GatewayPolicy,
}

impl CatalogGateway {
    pub fn new(catalog: Arc<dyn LocalCatalog>, policy: GatewayPolicy) -> Self {
        Self { catalog, policy }
    }

    pub fn policy(&self) -> GatewayPolicy {
        self.policy
    }

    pub async fn find_tags(
        &self,
        ctx: &mut RunContext,
        query: &str,
        by: MatchBy,
    ) -> Result<TagMatches> {
        let catalog = self.catalog.as_ref();
        self.call(ctx, CatalogOp::FindTag { query, by }, move || {
            catalog.find_tags(query, by)
        })
        .await
    }

    pub async fn create_tag(&self, ctx: &mut RunContext, tag: &NewTag) -> Result<LocalTag> {
        let catalog = self.catalog.as_ref();
        self.call(ctx, CatalogOp::CreateTag(tag), move || catalog.create_tag(tag))
            .await
    }

    pub async fn update_tag(&self, ctx: &mut RunContext, patch: &TagPatch) -> Result<()> {
        if patch.is_empty() {
            return Ok(());
        }
        let catalog = self.catalog.as_ref();
        self.call(ctx, CatalogOp::UpdateTag(patch), move || {
            catalog.update_tag(patch)
        })
        .await
    }

    pub async fn merge_tags(
        &self,
        ctx: &mut RunContext,
        source_id: &str,
        destination_id: &str,
    ) -> Result<()> {
        let catalog = self.catalog.as_ref();
        let op = CatalogOp::MergeTags {
            source_id,
            destination_id,
        };
        self.call(ctx, op, move || catalog.merge_tags(source_id, destination_id))
            .await
    }

    pub async fn find_tagged(
        &self,
        ctx: &mut RunContext,
        kind: RecordKind,
        tag_id: &str,
    ) -> Result<Vec<TaggableRecord>> {
        let catalog = self.catalog.as_ref();
        self.call(ctx, CatalogOp::find_records(kind, tag_id), move || {
            catalog.find_tagged(kind, tag_id)
        })
        .await
    }

    pub async fn update_record(&self, ctx: &mut RunContext, record: &TaggableRecord) -> Result<()> {
        let catalog = self.catalog.as_ref();
        self.call(ctx, CatalogOp::update_record(record), move || {
            catalog.update_record(record)
        })
        .await
    }

    async fn call<T, F, Fut>(
        &self,
        ctx: &mut RunContext,
        op: CatalogOp<'_>,
        mut invoke: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut failures: u32 = 0;
        loop {
            match invoke().await {
                Ok(value) => {
                    if failures > 0 {
                        ctx.record(SyncEvent::ApiRecovery);
                        info!(
                            operation = op.verb(),
                            failures, "catalog call recovered after retry"
                        );
                    }
                    return Ok(value);
                }
                Err(err) => {
                    failures += 1;
                    warn!(
                        operation = op.verb(),
                        payload = ?op,
                        attempt = failures,
                        max_attempts,
                        "catalog call failed: {err:#}"
                    );
                    if failures >= max_attempts {
                        ctx.record(SyncEvent::ApiFail);
                        error!(
                            operation = op.verb(),
                            payload = ?op,
                            "catalog unreachable after {failures} attempts; aborting run"
                        );
                        return Err(SyncError::CatalogUnavailable {
                            operation: op.verb(),
                            attempts: failures,
                            last_error: format!("{err:#}"),
                        });
                    }
                    tokio::time::sleep(self.policy.backoff).await;
                }
            }
        }
    }
}
