use std::collections::BTreeMap;
use std::time::Instant;

use tracing::info;
use uuid::Uuid;

use tagsync_types::RecordKind;

/// Every state transition a run can perform, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SyncEvent {
    TagCreated,
    AliasCreated,
    AliasPromoted,
    TagMerged,
    AliasMigrated,
    SceneTagMigrated,
    GalleryTagMigrated,
    PerformerTagMigrated,
    MarkerTagMigrated,
    TagNameUpdated,
    TagDescriptionUpdated,
    Error,
    ApiFail,
    ApiRecovery,
}

impl SyncEvent {
    pub const ALL: [SyncEvent; 14] = [
        SyncEvent::TagCreated,
        SyncEvent::AliasCreated,
        SyncEvent::AliasPromoted,
        SyncEvent::TagMerged,
        SyncEvent::AliasMigrated,
        SyncEvent::SceneTagMigrated,
        SyncEvent::GalleryTagMigrated,
        SyncEvent::PerformerTagMigrated,
        SyncEvent::MarkerTagMigrated,
        SyncEvent::TagNameUpdated,
        SyncEvent::TagDescriptionUpdated,
        SyncEvent::Error,
        SyncEvent::ApiFail,
        SyncEvent::ApiRecovery,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SyncEvent::TagCreated => "tag_created",
            SyncEvent::AliasCreated => "alias_created",
            SyncEvent::AliasPromoted => "alias_promoted",
            SyncEvent::TagMerged => "tag_merged",
            SyncEvent::AliasMigrated => "alias_migrated",
            SyncEvent::SceneTagMigrated => "scene_tag_migrated",
            SyncEvent::GalleryTagMigrated => "gallery_tag_migrated",
            SyncEvent::PerformerTagMigrated => "performer_tag_migrated",
            SyncEvent::MarkerTagMigrated => "marker_tag_migrated",
            SyncEvent::TagNameUpdated => "tag_name_updated",
            SyncEvent::TagDescriptionUpdated => "tag_description_updated",
            SyncEvent::Error => "error",
            SyncEvent::ApiFail => "api_fail",
            SyncEvent::ApiRecovery => "api_recovery",
        }
    }

    pub fn migrated(kind: RecordKind) -> Self {
        match kind {
            RecordKind::Scene => SyncEvent::SceneTagMigrated,
            RecordKind::Gallery => SyncEvent::GalleryTagMigrated,
            RecordKind::Performer => SyncEvent::PerformerTagMigrated,
            RecordKind::Marker => SyncEvent::MarkerTagMigrated,
        }
    }

    /// True for events that change catalog content.
    pub fn is_mutation(self) -> bool {
        !matches!(
            self,
            SyncEvent::Error | SyncEvent::ApiFail | SyncEvent::ApiRecovery
        )
    }
}

impl std::fmt::Display for SyncEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunStatistics {
    counts: BTreeMap<SyncEvent, u64>,
}

impl RunStatistics {
    pub fn record(&mut self, event: SyncEvent) {
        *self.counts.entry(event).or_insert(0) += 1;
    }

    pub fn get(&self, event: SyncEvent) -> u64 {
        self.counts.get(&event).copied().unwrap_or(0)
    }

    pub fn mutations(&self) -> u64 {
        SyncEvent::ALL
            .iter()
            .filter(|e| e.is_mutation())
            .map(|e| self.get(*e))
            .sum()
    }

    /// The operator-facing table: every counter, zeros included.
    pub fn render_table(&self) -> String {
        let width = SyncEvent::ALL
            .iter()
            .map(|e| e.as_str().len())
            .max()
            .unwrap_or(0);
        let mut out = String::new();
        for event in SyncEvent::ALL {
            out.push_str(&format!(
                "  {:<width$}  {:>6}\n",
                event.as_str(),
                self.get(event)
            ));
        }
        out
    }

    pub fn report(&self, heading: &str) {
        info!(
            target: "tagsync::stats",
            "statistics ({heading}):\n{}",
            self.render_table().trim_end()
        );
    }
}

/// State threaded through one run: identity, counters, clock.
#[derive(Debug)]
pub struct RunContext {
    pub run_id: String,
    pub stats: RunStatistics,
    started_at: Instant,
}

impl RunContext {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            stats: RunStatistics::default(),
            started_at: Instant::now(),
        }
    }

    pub fn record(&mut self, event: SyncEvent) {
        self.stats.record(event);
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.started_at.elapsed().as_millis()
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}
