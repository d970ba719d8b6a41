//! Source of the initial record set.

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::PostRecord;
use crate::domain::slug::SlugError;

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("failed to read archive `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse archive `{path}`: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("failed to generate seed post {index}: {source}")]
    Seed {
        index: usize,
        #[source]
        source: SlugError,
    },
    #[error("seed post {index} does not fit in a post id")]
    SeedId { index: usize },
}

impl LoaderError {
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Produces every record the store starts from. Called once before the
/// store accepts writes.
#[async_trait]
pub trait PostLoader: Send + Sync {
    async fn load_all(&self) -> Result<Vec<PostRecord>, LoaderError>;
}
