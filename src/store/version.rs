//! Immutable store versions and the construction of their successors.
//!
//! A [`Version`] is one complete generation of the store: the record sequence
//! (most recent first) plus an id index and a slug index whose positions
//! always point into that same sequence. Versions are never mutated after
//! construction. Every write builds a new version from its predecessor, so a
//! reader holding an older version keeps a whole, if stale, view.

use std::collections::HashMap;
use std::sync::Arc;

use time::OffsetDateTime;

use crate::domain::entities::{PostDraft, PostPatch, PostRecord};
use crate::domain::slug::validate_slug;
use crate::domain::types::PostId;

use super::error::StoreError;
use super::mutation::{Mutation, MutationEffect};

/// Position of a version in the chain. The initial load is epoch 0 and every
/// applied mutation increments it by one.
pub type Epoch = u64;

const FIRST_POST_ID: PostId = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    epoch: Epoch,
    posts: Vec<Arc<PostRecord>>,
    by_id: HashMap<PostId, usize>,
    by_slug: HashMap<String, usize>,
    next_id: PostId,
}

impl Version {
    pub fn empty() -> Self {
        Self {
            epoch: 0,
            posts: Vec::new(),
            by_id: HashMap::new(),
            by_slug: HashMap::new(),
            next_id: FIRST_POST_ID,
        }
    }

    /// Build the first version directly from a full record set.
    ///
    /// Records are ordered most recent first (`created_at` descending, then
    /// `id` descending). Ids continue from the highest loaded id.
    pub fn from_records(records: Vec<PostRecord>) -> Result<Self, StoreError> {
        let mut posts = Vec::with_capacity(records.len());
        let mut max_id: PostId = 0;

        for mut record in records {
            if record.id < FIRST_POST_ID {
                return Err(StoreError::invalid(format!(
                    "post id {} must be positive",
                    record.id
                )));
            }
            record.slug = validate_slug(&record.slug)?.to_string();
            max_id = max_id.max(record.id);
            posts.push(Arc::new(record));
        }

        posts.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        let next_id = max_id
            .checked_add(1)
            .ok_or_else(|| StoreError::invalid("post id space exhausted"))?;
        Self::from_sequence(0, posts, next_id)
    }

    /// Index a sequence with one full pass, rejecting duplicate keys.
    fn from_sequence(
        epoch: Epoch,
        posts: Vec<Arc<PostRecord>>,
        next_id: PostId,
    ) -> Result<Self, StoreError> {
        let mut by_id = HashMap::with_capacity(posts.len());
        let mut by_slug = HashMap::with_capacity(posts.len());

        for (position, post) in posts.iter().enumerate() {
            if by_id.insert(post.id, position).is_some() {
                return Err(StoreError::DuplicateId { id: post.id });
            }
            if by_slug.insert(post.slug.clone(), position).is_some() {
                return Err(StoreError::duplicate_slug(post.slug.clone()));
            }
        }

        Ok(Self {
            epoch,
            posts,
            by_id,
            by_slug,
            next_id,
        })
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    /// Id the next create will receive.
    pub fn next_id(&self) -> PostId {
        self.next_id
    }

    /// The record sequence, most recent first.
    pub fn posts(&self) -> &[Arc<PostRecord>] {
        &self.posts
    }

    pub fn get_by_id(&self, id: PostId) -> Option<&Arc<PostRecord>> {
        self.by_id.get(&id).map(|&position| &self.posts[position])
    }

    pub fn get_by_slug(&self, slug: &str) -> Option<&Arc<PostRecord>> {
        self.by_slug.get(slug).map(|&position| &self.posts[position])
    }

    /// True when every indexed position points at a record with the indexed
    /// key and both indexes cover the whole sequence.
    pub fn indexes_consistent(&self) -> bool {
        self.by_id.len() == self.posts.len()
            && self.by_slug.len() == self.posts.len()
            && self
                .by_id
                .iter()
                .all(|(id, &pos)| self.posts.get(pos).is_some_and(|post| post.id == *id))
            && self
                .by_slug
                .iter()
                .all(|(slug, &pos)| self.posts.get(pos).is_some_and(|post| &post.slug == slug))
    }

    /// Build the successor version for one mutation.
    pub fn apply(
        &self,
        mutation: Mutation,
        now: OffsetDateTime,
    ) -> Result<(Version, MutationEffect), StoreError> {
        let (next, effect) = match mutation {
            Mutation::Create(draft) => self.create(draft, now)?,
            Mutation::Update { id, patch } => self.update(id, patch, now)?,
            Mutation::Delete { id } => self.delete(id)?,
        };
        debug_assert!(next.indexes_consistent());
        Ok((next, effect))
    }

    fn create(
        &self,
        mut draft: PostDraft,
        now: OffsetDateTime,
    ) -> Result<(Version, MutationEffect), StoreError> {
        draft.slug = validate_slug(&draft.slug)?.to_string();
        if self.by_slug.contains_key(&draft.slug) {
            return Err(StoreError::duplicate_slug(draft.slug));
        }

        let id = self.next_id;
        let next_id = id
            .checked_add(1)
            .ok_or_else(|| StoreError::invalid("post id space exhausted"))?;
        let record = Arc::new(draft.into_record(id, now));

        let mut posts = Vec::with_capacity(self.posts.len() + 1);
        posts.push(Arc::clone(&record));
        posts.extend(self.posts.iter().cloned());

        let next = Self::from_sequence(self.epoch + 1, posts, next_id)?;
        Ok((next, MutationEffect::Created(record)))
    }

    fn update(
        &self,
        id: PostId,
        mut patch: PostPatch,
        now: OffsetDateTime,
    ) -> Result<(Version, MutationEffect), StoreError> {
        let position = *self.by_id.get(&id).ok_or(StoreError::not_found(id))?;
        let previous = Arc::clone(&self.posts[position]);

        if let Some(slug) = patch.slug.take() {
            let slug = validate_slug(&slug)?.to_string();
            match self.by_slug.get(&slug) {
                Some(&owner) if owner != position => {
                    return Err(StoreError::duplicate_slug(slug));
                }
                _ => patch.slug = Some(slug),
            }
        }

        let current = Arc::new(previous.patched(patch, now));
        let mut posts = self.posts.clone();
        posts[position] = Arc::clone(&current);

        let next = if current.slug == previous.slug {
            Self {
                epoch: self.epoch + 1,
                posts,
                by_id: self.by_id.clone(),
                by_slug: self.by_slug.clone(),
                next_id: self.next_id,
            }
        } else {
            Self::from_sequence(self.epoch + 1, posts, self.next_id)?
        };

        Ok((next, MutationEffect::Updated { previous, current }))
    }

    fn delete(&self, id: PostId) -> Result<(Version, MutationEffect), StoreError> {
        let position = *self.by_id.get(&id).ok_or(StoreError::not_found(id))?;

        let mut posts = self.posts.clone();
        let removed = posts.remove(position);

        let next = Self::from_sequence(self.epoch + 1, posts, self.next_id)?;
        Ok((next, MutationEffect::Deleted(removed)))
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::empty()
    }
}
