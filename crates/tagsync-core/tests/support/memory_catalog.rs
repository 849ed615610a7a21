use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use tagsync_stash::LocalCatalog;
use tagsync_types::{
    same_name, Gallery, LocalTag, MatchBy, NewTag, Performer, RecordKind, Scene, SceneMarker,
    TagMatches, TagPatch, TaggableRecord,
};

/// In-memory catalog with the same rules as stash: names and aliases are
/// unique across tags, and merging turns the source name into an alias.
#[derive(Default)]
pub struct MemoryCatalog {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    next_id: u64,
    tags: BTreeMap<u64, LocalTag>,
    records: Vec<TaggableRecord>,
    fail_next: u32,
    fail_verb: Option<(&'static str, u32)>,
    calls: Vec<&'static str>,
    writes: u32,
}

impl State {
    fn alloc_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn check_fault(&mut self, verb: &'static str) -> anyhow::Result<()> {
        self.calls.push(verb);
        if self.fail_next > 0 {
            self.fail_next -= 1;
            anyhow::bail!("simulated transport failure during {verb}");
        }
        if let Some((failing, remaining)) = self.fail_verb.as_mut() {
            if *failing == verb && *remaining > 0 {
                *remaining -= 1;
                anyhow::bail!("simulated transport failure during {verb}");
            }
        }
        Ok(())
    }

    /// A name or alias may not collide with another tag's name or alias.
    fn check_unique(&self, own_id: Option<&str>, label: &str) -> anyhow::Result<()> {
        for tag in self.tags.values() {
            if Some(tag.id.as_str()) == own_id {
                continue;
            }
            if same_name(&tag.name, label) || tag.has_alias(label) {
                anyhow::bail!("`{label}` is already used by tag `{}`", tag.name);
            }
        }
        Ok(())
    }
}

fn key(id: &str) -> anyhow::Result<u64> {
    id.parse::<u64>()
        .map_err(|_| anyhow::anyhow!("invalid tag id `{id}`"))
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_tag(&self, name: &str, description: &str, aliases: &[&str]) -> LocalTag {
        let mut state = self.state.lock().expect("lock");
        let id = state.alloc_id();
        let tag = LocalTag {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
        };
        state.tags.insert(id, tag.clone());
        tag
    }

    pub fn add_scene(&self, title: &str, tag_ids: &[&str]) -> String {
        let mut state = self.state.lock().expect("lock");
        let id = format!("scene-{}", state.alloc_id());
        state.records.push(TaggableRecord::Scene(Scene {
            id: id.clone(),
            title: Some(title.to_string()),
            tag_ids: tag_ids.iter().map(|t| t.to_string()).collect(),
        }));
        id
    }

    pub fn add_gallery(&self, title: &str, tag_ids: &[&str]) -> String {
        let mut state = self.state.lock().expect("lock");
        let id = format!("gallery-{}", state.alloc_id());
        state.records.push(TaggableRecord::Gallery(Gallery {
            id: id.clone(),
            title: Some(title.to_string()),
            tag_ids: tag_ids.iter().map(|t| t.to_string()).collect(),
        }));
        id
    }

    pub fn add_performer(&self, name: &str, tag_ids: &[&str]) -> String {
        let mut state = self.state.lock().expect("lock");
        let id = format!("performer-{}", state.alloc_id());
        state.records.push(TaggableRecord::Performer(Performer {
            id: id.clone(),
            name: name.to_string(),
            tag_ids: tag_ids.iter().map(|t| t.to_string()).collect(),
        }));
        id
    }

    pub fn add_marker(&self, scene_id: &str, seconds: f64, primary_tag_id: &str) -> String {
        let mut state = self.state.lock().expect("lock");
        let id = format!("marker-{}", state.alloc_id());
        state.records.push(TaggableRecord::Marker(SceneMarker {
            id: id.clone(),
            title: format!("marker at {seconds}"),
            seconds,
            scene_id: scene_id.to_string(),
            primary_tag_id: primary_tag_id.to_string(),
            tag_ids: vec![primary_tag_id.to_string()],
        }));
        id
    }

    /// The next `count` catalog calls fail.
    pub fn fail_next(&self, count: u32) {
        self.state.lock().expect("lock").fail_next = count;
    }

    /// The next `count` calls of `verb` fail; other calls go through.
    pub fn fail_verb(&self, verb: &'static str, count: u32) {
        self.state.lock().expect("lock").fail_verb = Some((verb, count));
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.state.lock().expect("lock").calls.clone()
    }

    pub fn writes(&self) -> u32 {
        self.state.lock().expect("lock").writes
    }

    pub fn tags(&self) -> Vec<LocalTag> {
        self.state.lock().expect("lock").tags.values().cloned().collect()
    }

    pub fn tag_named(&self, name: &str) -> Option<LocalTag> {
        self.state
            .lock()
            .expect("lock")
            .tags
            .values()
            .find(|t| t.name == name)
            .cloned()
    }

    pub fn record(&self, id: &str) -> Option<TaggableRecord> {
        self.state
            .lock()
            .expect("lock")
            .records
            .iter()
            .find(|r| r.id() == id)
            .cloned()
    }
}

#[async_trait]
impl LocalCatalog for MemoryCatalog {
    async fn find_tags(&self, query: &str, by: MatchBy) -> anyhow::Result<TagMatches> {
        let mut state = self.state.lock().expect("lock");
        state.check_fault("find-tag")?;
        let found = state
            .tags
            .values()
            .filter(|t| match by {
                MatchBy::Name => same_name(&t.name, query) || t.has_alias(query),
                MatchBy::Alias => t.has_alias(query),
            })
            .cloned()
            .collect::<Vec<_>>();
        Ok(TagMatches::from(found))
    }

    async fn create_tag(&self, tag: &NewTag) -> anyhow::Result<LocalTag> {
        let mut state = self.state.lock().expect("lock");
        state.check_fault("create-tag")?;
        state.check_unique(None, &tag.name)?;
        for alias in &tag.aliases {
            state.check_unique(None, alias)?;
        }
        let id = state.alloc_id();
        let created = LocalTag {
            id: id.to_string(),
            name: tag.name.clone(),
            description: tag.description.clone(),
            aliases: tag.aliases.clone(),
        };
        state.tags.insert(id, created.clone());
        state.writes += 1;
        Ok(created)
    }

    async fn update_tag(&self, patch: &TagPatch) -> anyhow::Result<()> {
        let mut state = self.state.lock().expect("lock");
        state.check_fault("update-tag")?;
        let id = key(&patch.id)?;
        let current = state
            .tags
            .get(&id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("tag {} not found", patch.id))?;
        let next = patch.apply(&current);
        state.check_unique(Some(&patch.id), &next.name)?;
        for alias in &next.aliases {
            if same_name(alias, &next.name) {
                anyhow::bail!("alias `{alias}` equals the tag name");
            }
            state.check_unique(Some(&patch.id), alias)?;
        }
        state.tags.insert(id, next);
        state.writes += 1;
        Ok(())
    }

    async fn merge_tags(&self, source_id: &str, destination_id: &str) -> anyhow::Result<()> {
        let mut state = self.state.lock().expect("lock");
        state.check_fault("merge-tags")?;
        let source = state
            .tags
            .remove(&key(source_id)?)
            .ok_or_else(|| anyhow::anyhow!("source tag {source_id} not found"))?;
        let destination = state
            .tags
            .get_mut(&key(destination_id)?)
            .ok_or_else(|| anyhow::anyhow!("destination tag {destination_id} not found"))?;
        for label in std::iter::once(&source.name).chain(source.aliases.iter()) {
            if !destination.has_alias(label) && !same_name(label, &destination.name) {
                destination.aliases.push(label.clone());
            }
        }
        for record in state.records.iter_mut() {
            if !record.has_tag(source_id) {
                continue;
            }
            let retagged = record
                .tag_ids()
                .iter()
                .map(|t| if t == source_id { destination_id.to_string() } else { t.clone() })
                .fold(Vec::<String>::new(), |mut acc, t| {
                    if !acc.contains(&t) {
                        acc.push(t);
                    }
                    acc
                });
            match record {
                TaggableRecord::Scene(r) => r.tag_ids = retagged,
                TaggableRecord::Gallery(r) => r.tag_ids = retagged,
                TaggableRecord::Performer(r) => r.tag_ids = retagged,
                TaggableRecord::Marker(r) => {
                    if r.primary_tag_id == source_id {
                        r.primary_tag_id = destination_id.to_string();
                    }
                    r.tag_ids = retagged;
                }
            }
        }
        state.writes += 1;
        Ok(())
    }

    async fn find_tagged(
        &self,
        kind: RecordKind,
        tag_id: &str,
    ) -> anyhow::Result<Vec<TaggableRecord>> {
        let mut state = self.state.lock().expect("lock");
        state.check_fault(match kind {
            RecordKind::Scene => "find-scenes",
            RecordKind::Gallery => "find-galleries",
            RecordKind::Performer => "find-performers",
            RecordKind::Marker => "find-markers-by-tag",
        })?;
        Ok(state
            .records
            .iter()
            .filter(|r| r.kind() == kind && r.has_tag(tag_id))
            .cloned()
            .collect())
    }

    async fn update_record(&self, record: &TaggableRecord) -> anyhow::Result<()> {
        let mut state = self.state.lock().expect("lock");
        state.check_fault("update-record")?;
        let slot = state
            .records
            .iter_mut()
            .find(|r| r.id() == record.id() && r.kind() == record.kind())
            .ok_or_else(|| anyhow::anyhow!("record {} not found", record.id()))?;
        *slot = record.clone();
        state.writes += 1;
        Ok(())
    }
}
