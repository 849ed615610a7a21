use serde::{Deserialize, Serialize};

use crate::{null_as_empty, same_name};

/// A tag as published by the authoritative taxonomy. Fetched once per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteTag {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// A tag owned by the local catalog.
///
/// Values are never edited in place: the `with_*` / `without_*` helpers return
/// a new value and [`TagPatch::between`] describes what has to be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalTag {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl LocalTag {
    pub fn has_alias(&self, alias: &str) -> bool {
        self.aliases.iter().any(|a| same_name(a, alias))
    }

    pub fn with_alias(&self, alias: &str) -> LocalTag {
        let mut next = self.clone();
        if !next.has_alias(alias) {
            next.aliases.push(alias.to_string());
        }
        next
    }

    pub fn without_alias(&self, alias: &str) -> LocalTag {
        let mut next = self.clone();
        next.aliases.retain(|a| !same_name(a, alias));
        next
    }

    /// Same tag carrying the remote name and description.
    pub fn aligned_with(&self, remote: &RemoteTag) -> LocalTag {
        LocalTag {
            name: remote.name.clone(),
            description: remote.description.clone(),
            ..self.clone()
        }
    }
}

/// Payload for creating a local tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTag {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl NewTag {
    /// Seed built from a remote tag. Aliases are attached later by the alias phase.
    pub fn from_remote(remote: &RemoteTag) -> Self {
        Self {
            name: remote.name.clone(),
            description: remote.description.clone(),
            aliases: Vec::new(),
        }
    }
}

/// Minimal update for one tag: only the fields that actually change are set.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TagPatch {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aliases: Option<Vec<String>>,
}

impl TagPatch {
    pub fn between(before: &LocalTag, after: &LocalTag) -> Self {
        Self {
            id: before.id.clone(),
            name: (before.name != after.name).then(|| after.name.clone()),
            description: (before.description != after.description)
                .then(|| after.description.clone()),
            aliases: (before.aliases != after.aliases).then(|| after.aliases.clone()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.aliases.is_none()
    }

    pub fn apply(&self, tag: &LocalTag) -> LocalTag {
        let mut next = tag.clone();
        if let Some(name) = &self.name {
            next.name = name.clone();
        }
        if let Some(description) = &self.description {
            next.description = description.clone();
        }
        if let Some(aliases) = &self.aliases {
            next.aliases = aliases.clone();
        }
        next
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchBy {
    /// Name or alias equal to the query.
    Name,
    /// Alias equal to the query.
    Alias,
}

impl MatchBy {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchBy::Name => "name",
            MatchBy::Alias => "alias",
        }
    }
}

impl std::fmt::Display for MatchBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a catalog tag search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagMatches {
    None,
    Exactly(LocalTag),
    Many(Vec<LocalTag>),
}

impl From<Vec<LocalTag>> for TagMatches {
    fn from(mut tags: Vec<LocalTag>) -> Self {
        match tags.len() {
            0 => TagMatches::None,
            1 => match tags.pop() {
                Some(tag) => TagMatches::Exactly(tag),
                None => TagMatches::None,
            },
            _ => TagMatches::Many(tags),
        }
    }
}

/// A local tag together with how many scene markers use it as primary tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagUsage {
    pub id: String,
    pub name: String,
    pub marker_count: u64,
}
