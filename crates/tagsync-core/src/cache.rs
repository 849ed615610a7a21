use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::fs;
use tracing::{info, warn};

use tagsync_stash::{fetch_all_tags, RemoteTagSource};
use tagsync_types::RemoteTag;

use crate::error::{Result, SyncError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// Use the cache unless the remote count differs from it.
    #[default]
    Auto,
    /// Always refetch.
    Refresh,
    /// Never contact the remote.
    Offline,
}

/// On-disk copy of the remote tag list, stored as a JSON array.
pub struct TagCache {
    path: PathBuf,
}

impl TagCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Result<Option<Vec<RemoteTag>>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)
            .await
            .map_err(|e| self.error(e))?;
        let tags = serde_json::from_str(&raw).map_err(|e| self.error(e))?;
        Ok(Some(tags))
    }

    pub async fn store(&self, tags: &[RemoteTag]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| self.error(e))?;
        }
        let raw = serde_json::to_string(tags).map_err(|e| self.error(e))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, raw).await.map_err(|e| self.error(e))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.error(e))?;
        Ok(())
    }

    /// The cached list without contacting the remote. A missing cache is an error.
    pub async fn load_offline(&self) -> Result<Vec<RemoteTag>> {
        self.load().await?.ok_or_else(|| SyncError::Cache {
            path: self.path.display().to_string(),
            reason: "no cached tag list; run without --offline first".to_string(),
        })
    }

    pub async fn load_or_refresh(
        &self,
        source: &dyn RemoteTagSource,
        mode: CacheMode,
        page_delay: Duration,
    ) -> Result<Vec<RemoteTag>> {
        match mode {
            CacheMode::Offline => return self.load_offline().await,
            CacheMode::Refresh => return self.refresh(source, page_delay).await,
            CacheMode::Auto => {}
        }

        let cached = match self.load().await {
            Ok(cached) => cached,
            Err(err) => {
                warn!("ignoring unreadable tag cache: {err}");
                None
            }
        };
        let Some(cached) = cached else {
            return self.refresh(source, page_delay).await;
        };

        let remote_count = source.tag_count().await.map_err(SyncError::Remote)?;
        if remote_count == cached.len() {
            info!(count = cached.len(), path = %self.path.display(), "using cached remote tags");
            return Ok(cached);
        }
        info!(
            cached = cached.len(),
            remote = remote_count,
            "remote tag count changed; refreshing cache"
        );
        self.refresh(source, page_delay).await
    }

    async fn refresh(
        &self,
        source: &dyn RemoteTagSource,
        page_delay: Duration,
    ) -> Result<Vec<RemoteTag>> {
        let tags = fetch_all_tags(source, page_delay)
            .await
            .map_err(SyncError::Remote)?;
        self.store(&tags).await?;
        info!(count = tags.len(), path = %self.path.display(), "tag cache written");
        Ok(tags)
    }

    fn error(&self, err: impl std::fmt::Display) -> SyncError {
        SyncError::Cache {
            path: self.path.display().to_string(),
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tagsync_stash::TagPage;

    struct CountingSource {
        tags: Vec<RemoteTag>,
        pages: AtomicUsize,
    }

    impl CountingSource {
        fn new(count: usize) -> Self {
            Self {
                tags: (0..count)
                    .map(|i| RemoteTag {
                        id: format!("r{i}"),
                        name: format!("Tag {i}"),
                        description: String::new(),
                        aliases: Vec::new(),
                    })
                    .collect(),
                pages: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl RemoteTagSource for CountingSource {
        async fn fetch_page(&self, page: u32, per_page: u32) -> anyhow::Result<TagPage> {
            self.pages.fetch_add(1, Ordering::SeqCst);
            let start = ((page - 1) * per_page) as usize;
            let end = (start + per_page as usize).min(self.tags.len());
            Ok(TagPage {
                count: self.tags.len(),
                tags: self.tags.get(start..end).unwrap_or_default().to_vec(),
            })
        }
    }

    #[tokio::test]
    async fn fetches_and_stores_when_cache_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = TagCache::new(dir.path().join("state").join("tags.json"));
        let source = CountingSource::new(3);

        let tags = cache
            .load_or_refresh(&source, CacheMode::Auto, Duration::ZERO)
            .await
            .expect("tags");

        assert_eq!(tags.len(), 3);
        assert_eq!(cache.load().await.expect("load").map(|t| t.len()), Some(3));
    }

    #[tokio::test]
    async fn reuses_cache_when_count_matches() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = TagCache::new(dir.path().join("tags.json"));
        let source = CountingSource::new(2);
        cache.store(&source.tags).await.expect("store");

        let tags = cache
            .load_or_refresh(&source, CacheMode::Auto, Duration::ZERO)
            .await
            .expect("tags");

        assert_eq!(tags, source.tags);
        // only the count probe
        assert_eq!(source.pages.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn refreshes_when_remote_count_differs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = TagCache::new(dir.path().join("tags.json"));
        cache
            .store(&CountingSource::new(1).tags)
            .await
            .expect("store");
        let source = CountingSource::new(4);

        let tags = cache
            .load_or_refresh(&source, CacheMode::Auto, Duration::ZERO)
            .await
            .expect("tags");

        assert_eq!(tags.len(), 4);
        assert_eq!(cache.load().await.expect("load").map(|t| t.len()), Some(4));
    }

    #[tokio::test]
    async fn offline_without_cache_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = TagCache::new(dir.path().join("tags.json"));
        let err = cache
            .load_or_refresh(&CountingSource::new(1), CacheMode::Offline, Duration::ZERO)
            .await
            .expect_err("no cache");
        assert!(matches!(err, SyncError::Cache { .. }));
    }
}
