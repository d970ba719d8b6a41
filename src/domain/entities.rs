//! Typed post records held by the store, and the field sets used to write them.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::types::{CategoryId, PostId, PostStatus, TagId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: PostId,
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub status: PostStatus,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub tag_ids: Vec<TagId>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl PostRecord {
    /// Build the replacement record for an update. The identifier and creation
    /// time are carried over untouched.
    pub fn patched(&self, patch: PostPatch, now: OffsetDateTime) -> PostRecord {
        let PostPatch {
            slug,
            title,
            body,
            status,
            category_id,
            tag_ids,
        } = patch;

        PostRecord {
            id: self.id,
            slug: slug.unwrap_or_else(|| self.slug.clone()),
            title: title.unwrap_or_else(|| self.title.clone()),
            body: body.unwrap_or_else(|| self.body.clone()),
            status: status.unwrap_or(self.status),
            category_id: category_id.unwrap_or(self.category_id),
            tag_ids: tag_ids.unwrap_or_else(|| self.tag_ids.clone()),
            created_at: self.created_at,
            updated_at: now,
        }
    }
}

/// Fields supplied when creating a post. The store assigns `id` and timestamps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostDraft {
    pub slug: String,
    pub title: String,
    pub body: String,
    pub status: PostStatus,
    pub category_id: Option<CategoryId>,
    pub tag_ids: Vec<TagId>,
}

impl PostDraft {
    pub fn new(slug: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn into_record(self, id: PostId, now: OffsetDateTime) -> PostRecord {
        PostRecord {
            id,
            slug: self.slug,
            title: self.title,
            body: self.body,
            status: self.status,
            category_id: self.category_id,
            tag_ids: self.tag_ids,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update. `None` keeps the current value; `category_id: Some(None)`
/// clears the category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostPatch {
    pub slug: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub status: Option<PostStatus>,
    pub category_id: Option<Option<CategoryId>>,
    pub tag_ids: Option<Vec<TagId>>,
}

impl PostPatch {
    pub fn slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn status(mut self, status: PostStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &PostPatch::default()
    }
}
