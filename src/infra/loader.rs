//! [`PostLoader`] implementations: generated demo posts and TOML archives.
//!
//! Archive format:
//!
//! ```toml
//! [[posts]]
//! id = 1
//! slug = "hello-world"
//! title = "Hello world"
//! body = "First post."
//! status = "published"
//! category_id = 1
//! tag_ids = [1, 2]
//! created_at = "2024-03-01T09:00:00Z"
//! updated_at = "2024-03-01T09:00:00Z"
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use time::{Duration, OffsetDateTime};
use tracing::{info, instrument};

use crate::application::loader::{LoaderError, PostLoader};
use crate::domain::entities::PostRecord;
use crate::domain::slug::derive_slug;
use crate::domain::types::{PostId, PostStatus};

const CATEGORY_SPREAD: i64 = 10;
const TAG_SPREAD: i64 = 5;

/// Generates `count` demo posts: post `i` is created `i` hours before `now`,
/// so ids ascend as posts get older.
#[derive(Debug, Clone)]
pub struct SeedLoader {
    count: usize,
    now: OffsetDateTime,
}

impl SeedLoader {
    pub fn new(count: usize, now: OffsetDateTime) -> Self {
        Self { count, now }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    fn generate(&self) -> Result<Vec<PostRecord>, LoaderError> {
        (1..=self.count)
            .map(|index| {
                let id = seed_id(index)?;
                let title = format!("Test post {index}");
                let slug =
                    derive_slug(&title).map_err(|source| LoaderError::Seed { index, source })?;
                let status = if index % 2 == 1 {
                    PostStatus::Published
                } else {
                    PostStatus::Draft
                };

                Ok(PostRecord {
                    id,
                    slug,
                    body: format!("Demo content for post {index}."),
                    title,
                    status,
                    category_id: Some(id % CATEGORY_SPREAD),
                    tag_ids: vec![id % TAG_SPREAD],
                    created_at: self.now - Duration::hours(id),
                    updated_at: self.now,
                })
            })
            .collect()
    }
}

fn seed_id(index: usize) -> Result<PostId, LoaderError> {
    PostId::try_from(index).map_err(|_| LoaderError::SeedId { index })
}

#[async_trait]
impl PostLoader for SeedLoader {
    #[instrument(skip(self), fields(count = self.count))]
    async fn load_all(&self) -> Result<Vec<PostRecord>, LoaderError> {
        let posts = self.generate()?;
        info!(posts = posts.len(), "Seed posts generated");
        Ok(posts)
    }
}

/// Reads posts from a TOML archive of `[[posts]]` tables.
#[derive(Debug, Clone)]
pub struct ArchiveLoader {
    path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct ArchiveFile {
    #[serde(default)]
    posts: Vec<PostRecord>,
}

impl ArchiveLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parse(&self, contents: &str) -> Result<Vec<PostRecord>, LoaderError> {
        toml::from_str::<ArchiveFile>(contents)
            .map(|archive| archive.posts)
            .map_err(|err| LoaderError::parse(&self.path, err.to_string()))
    }
}

#[async_trait]
impl PostLoader for ArchiveLoader {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn load_all(&self) -> Result<Vec<PostRecord>, LoaderError> {
        let contents =
            tokio::fs::read_to_string(&self.path)
                .await
                .map_err(|source| LoaderError::Read {
                    path: self.path.clone(),
                    source,
                })?;

        let posts = self.parse(&contents)?;
        info!(posts = posts.len(), "Archive loaded");
        Ok(posts)
    }
}
