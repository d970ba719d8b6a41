use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::domain::error::DomainError;
use crate::domain::slug::SlugError;
use crate::domain::types::PostId;

/// Lookup key named in a `NotFound` error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostKey {
    Id(PostId),
    Slug(String),
}

impl fmt::Display for PostKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostKey::Id(id) => write!(f, "id {id}"),
            PostKey::Slug(slug) => write!(f, "slug `{slug}`"),
        }
    }
}

/// Errors returned by the store to the caller that triggered them.
///
/// None of these are fatal: the applier reports them to the submitting caller
/// and moves on to the next queued request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("post with {0} not found")]
    NotFound(PostKey),
    #[error("slug `{slug}` is already in use")]
    DuplicateSlug { slug: String },
    #[error("post id {id} appears more than once")]
    DuplicateId { id: PostId },
    #[error("mutation queue is full ({capacity} pending)")]
    Backpressure { capacity: usize },
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },
    #[error("mutation was not accepted within {0:?}")]
    Timeout(Duration),
    #[error("mutation pipeline is closed")]
    Closed,
}

impl StoreError {
    pub fn not_found(id: PostId) -> Self {
        Self::NotFound(PostKey::Id(id))
    }

    pub fn slug_not_found(slug: impl Into<String>) -> Self {
        Self::NotFound(PostKey::Slug(slug.into()))
    }

    pub fn duplicate_slug(slug: impl Into<String>) -> Self {
        Self::DuplicateSlug { slug: slug.into() }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Short label used for logs and metric tags.
    pub fn reason(&self) -> &'static str {
        match self {
            StoreError::NotFound(_) => "not_found",
            StoreError::DuplicateSlug { .. } => "duplicate_slug",
            StoreError::DuplicateId { .. } => "duplicate_id",
            StoreError::Backpressure { .. } => "backpressure",
            StoreError::InvalidRequest { .. } => "invalid_request",
            StoreError::Timeout(_) => "timeout",
            StoreError::Closed => "closed",
        }
    }
}

impl From<SlugError> for StoreError {
    fn from(error: SlugError) -> Self {
        StoreError::invalid(error.to_string())
    }
}

impl From<DomainError> for StoreError {
    fn from(error: DomainError) -> Self {
        StoreError::invalid(error.to_string())
    }
}
