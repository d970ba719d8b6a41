//! `PostStore`: one owned instance of the publisher, pipeline and queries.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, instrument};

use crate::domain::entities::{PostDraft, PostPatch, PostRecord};
use crate::domain::types::PostId;

use super::config::StoreConfig;
use super::error::StoreError;
use super::mutation::{Mutation, MutationOutcome};
use super::pipeline::{self, MutationApplier, MutationPipeline};
use super::query::PostQueries;
use super::version::Version;

/// Entry point used by request handlers: queries read the published version,
/// writes go through the mutation pipeline.
#[derive(Debug, Clone)]
pub struct PostStore {
    config: StoreConfig,
    queries: PostQueries,
    pipeline: MutationPipeline,
}

impl PostStore {
    /// Build version 0 from a full record set without going through the
    /// queue. The caller drives the returned applier.
    pub fn load_initial(
        config: StoreConfig,
        records: Vec<PostRecord>,
    ) -> Result<(Self, MutationApplier), StoreError> {
        let version = Version::from_records(records)?;
        info!(
            posts = version.len(),
            next_id = version.next_id(),
            queue_capacity = config.queue_capacity,
            "Initial version loaded"
        );

        let (pipeline, applier, publisher) =
            pipeline::channel(config.queue_capacity_non_zero(), version);
        let queries = PostQueries::new(publisher, config.clone());

        Ok((
            Self {
                config,
                queries,
                pipeline,
            },
            applier,
        ))
    }

    /// [`PostStore::load_initial`] with the applier spawned on the current
    /// tokio runtime. The task ends once every clone of the store is dropped.
    pub fn start(
        config: StoreConfig,
        records: Vec<PostRecord>,
    ) -> Result<(Self, JoinHandle<()>), StoreError> {
        let (store, applier) = Self::load_initial(config, records)?;
        Ok((store, tokio::spawn(applier.run())))
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn queries(&self) -> &PostQueries {
        &self.queries
    }

    pub fn pipeline(&self) -> &MutationPipeline {
        &self.pipeline
    }

    pub fn snapshot(&self) -> Arc<Version> {
        self.queries.snapshot()
    }

    /// Create a post and wait until it is visible to readers.
    #[instrument(skip_all, fields(slug = %draft.slug))]
    pub async fn create(&self, draft: PostDraft) -> Result<Arc<PostRecord>, StoreError> {
        let outcome = self.apply(Mutation::Create(draft)).await?;
        Ok(Arc::clone(outcome.effect.record()))
    }

    /// Update a post and wait until the new record is visible to readers.
    #[instrument(skip(self, patch))]
    pub async fn update(&self, id: PostId, patch: PostPatch) -> Result<Arc<PostRecord>, StoreError> {
        let outcome = self.apply(Mutation::Update { id, patch }).await?;
        Ok(Arc::clone(outcome.effect.record()))
    }

    /// Delete a post and wait until readers no longer see it. Returns the
    /// removed record.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: PostId) -> Result<Arc<PostRecord>, StoreError> {
        let outcome = self.apply(Mutation::Delete { id }).await?;
        Ok(Arc::clone(outcome.effect.record()))
    }

    async fn apply(&self, mutation: Mutation) -> Result<MutationOutcome, StoreError> {
        self.pipeline
            .submit_with_timeout(mutation, self.config.submit_timeout())
            .await?
            .wait()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::PostStatus;

    #[tokio::test]
    async fn create_is_visible_once_awaited() {
        let (store, _applier) = PostStore::start(StoreConfig::default(), Vec::new())
            .expect("empty load");

        let created = store
            .create(PostDraft::new("hello", "Hello"))
            .await
            .expect("created");

        let found = store.queries().get_by_slug("hello").expect("visible");
        assert_eq!(found.id, created.id);
        assert_eq!(found.id, 1);
        assert_eq!(found.status, PostStatus::Draft);
        assert_eq!(found.title, "Hello");
    }

    #[tokio::test]
    async fn update_and_delete_round_through_the_pipeline() {
        let (store, _applier) = PostStore::start(StoreConfig::default(), Vec::new())
            .expect("empty load");
        let created = store
            .create(PostDraft::new("draft", "Draft"))
            .await
            .expect("created");

        let updated = store
            .update(
                created.id,
                PostPatch::default()
                    .slug("published")
                    .status(PostStatus::Published),
            )
            .await
            .expect("updated");
        assert_eq!(updated.slug, "published");
        assert!(store.queries().get_by_slug("draft").is_err());

        let removed = store.delete(created.id).await.expect("deleted");
        assert_eq!(removed.slug, "published");
        assert_eq!(
            store.queries().get_by_id(created.id),
            Err(StoreError::not_found(created.id))
        );
        assert_eq!(store.snapshot().epoch(), 3);
    }

    #[tokio::test]
    async fn applier_stops_when_store_is_dropped() {
        let (store, handle) =
            PostStore::start(StoreConfig::default(), Vec::new()).expect("empty load");
        let clone = store.clone();
        drop(store);
        drop(clone);
        handle.await.expect("applier task exits cleanly");
    }
}
