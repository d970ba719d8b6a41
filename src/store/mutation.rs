//! Mutation requests and the outcomes delivered back to submitters.

use std::sync::Arc;

use tokio::sync::oneshot;
use uuid::Uuid;

use crate::domain::entities::{PostDraft, PostPatch, PostRecord};
use crate::domain::types::PostId;

use super::error::StoreError;
use super::version::Epoch;

/// A write against the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Create(PostDraft),
    Update { id: PostId, patch: PostPatch },
    Delete { id: PostId },
}

impl Mutation {
    pub fn kind(&self) -> &'static str {
        match self {
            Mutation::Create(_) => "create",
            Mutation::Update { .. } => "update",
            Mutation::Delete { .. } => "delete",
        }
    }

    /// Post targeted by an update or delete.
    pub fn target(&self) -> Option<PostId> {
        match self {
            Mutation::Create(_) => None,
            Mutation::Update { id, .. } | Mutation::Delete { id } => Some(*id),
        }
    }
}

/// What a successfully applied mutation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationEffect {
    Created(Arc<PostRecord>),
    Updated {
        previous: Arc<PostRecord>,
        current: Arc<PostRecord>,
    },
    Deleted(Arc<PostRecord>),
}

impl MutationEffect {
    /// The record as it exists after the mutation, or as it was when deleted.
    pub fn record(&self) -> &Arc<PostRecord> {
        match self {
            MutationEffect::Created(record)
            | MutationEffect::Updated { current: record, .. }
            | MutationEffect::Deleted(record) => record,
        }
    }
}

/// Result delivered through a completion signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationOutcome {
    /// Epoch of the version this mutation produced.
    pub epoch: Epoch,
    pub effect: MutationEffect,
}

pub(crate) type CompletionSender = oneshot::Sender<Result<MutationOutcome, StoreError>>;

/// Queue entry owned by the applier once accepted.
#[derive(Debug)]
pub(crate) struct MutationRequest {
    pub(crate) id: Uuid,
    pub(crate) mutation: Mutation,
    pub(crate) completion: Option<CompletionSender>,
}

impl MutationRequest {
    pub(crate) fn fire_and_forget(mutation: Mutation) -> Self {
        Self {
            id: Uuid::new_v4(),
            mutation,
            completion: None,
        }
    }

    pub(crate) fn tracked(mutation: Mutation) -> (Self, Completion) {
        let (sender, receiver) = oneshot::channel();
        let id = Uuid::new_v4();
        let request = Self {
            id,
            mutation,
            completion: Some(sender),
        };
        (
            request,
            Completion {
                request_id: id,
                receiver,
            },
        )
    }
}

/// Completion signal for a tracked submission.
///
/// Dropping it is allowed; the mutation is still applied.
#[derive(Debug)]
pub struct Completion {
    request_id: Uuid,
    receiver: oneshot::Receiver<Result<MutationOutcome, StoreError>>,
}

impl Completion {
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Wait for the applier to process the request.
    pub async fn wait(self) -> Result<MutationOutcome, StoreError> {
        self.receiver.await.map_err(|_| StoreError::Closed)?
    }
}
