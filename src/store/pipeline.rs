//! Bounded mutation queue and the single applier that drains it.
//!
//! Any number of [`MutationPipeline`] handles may submit concurrently. Exactly
//! one [`MutationApplier`] exists per queue: it takes requests in FIFO order,
//! builds the successor of the current version, publishes it, and reports the
//! outcome to the submitter. Versions therefore form one linear chain in
//! acceptance order.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::{counter, gauge, histogram};
use time::OffsetDateTime;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::error::StoreError;
use super::mutation::{Completion, Mutation, MutationOutcome, MutationRequest};
use super::publisher::SnapshotPublisher;
use super::version::Version;

const METRIC_APPLIED: &str = "folio_store_mutation_applied_total";
const METRIC_REJECTED: &str = "folio_store_mutation_rejected_total";
const METRIC_BACKPRESSURE: &str = "folio_store_backpressure_total";
const METRIC_QUEUE_DEPTH: &str = "folio_store_queue_depth";
const METRIC_APPLY_MS: &str = "folio_store_apply_ms";

/// Create a queue of `capacity` slots and the publisher it feeds, starting
/// from `initial`.
///
/// The publisher is built here and handed back only for reading, so the
/// returned applier is the one and only writer of it. The applier does
/// nothing until driven with [`MutationApplier::run`] or
/// [`MutationApplier::apply_next`].
pub(crate) fn channel(
    capacity: NonZeroUsize,
    initial: Version,
) -> (MutationPipeline, MutationApplier, Arc<SnapshotPublisher>) {
    let publisher = Arc::new(SnapshotPublisher::new(initial));
    let (sender, receiver) = mpsc::channel(capacity.get());
    (
        MutationPipeline {
            sender,
            capacity: capacity.get(),
        },
        MutationApplier {
            receiver,
            publisher: Arc::clone(&publisher),
        },
        publisher,
    )
}

/// Submission handle. Cheap to clone; the queue closes once every handle is
/// dropped.
#[derive(Debug, Clone)]
pub struct MutationPipeline {
    sender: mpsc::Sender<MutationRequest>,
    capacity: usize,
}

impl MutationPipeline {
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Accepted requests the applier has not taken yet.
    pub fn pending(&self) -> usize {
        self.capacity.saturating_sub(self.sender.capacity())
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Enqueue without a completion signal. Fails with `Backpressure` when
    /// the queue is full instead of waiting.
    pub fn submit(&self, mutation: Mutation) -> Result<Uuid, StoreError> {
        let request = MutationRequest::fire_and_forget(mutation);
        let id = request.id;
        self.enqueue(request)?;
        Ok(id)
    }

    /// Enqueue and return a completion signal for the outcome.
    pub fn submit_tracked(&self, mutation: Mutation) -> Result<Completion, StoreError> {
        let (request, completion) = MutationRequest::tracked(mutation);
        self.enqueue(request)?;
        Ok(completion)
    }

    /// Wait up to `timeout` for a free slot, then enqueue with a completion
    /// signal. On `Timeout` the request was never enqueued.
    #[instrument(skip_all, fields(kind = mutation.kind(), timeout_ms = timeout.as_millis() as u64))]
    pub async fn submit_with_timeout(
        &self,
        mutation: Mutation,
        timeout: Duration,
    ) -> Result<Completion, StoreError> {
        let permit = match tokio::time::timeout(timeout, self.sender.reserve()).await {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => return Err(StoreError::Closed),
            Err(_) => {
                warn!(pending = self.pending(), "Mutation not accepted before timeout");
                return Err(StoreError::Timeout(timeout));
            }
        };

        let (request, completion) = MutationRequest::tracked(mutation);
        debug!(request_id = %request.id, "Mutation accepted");
        permit.send(request);
        gauge!(METRIC_QUEUE_DEPTH).set(self.pending() as f64);
        Ok(completion)
    }

    fn enqueue(&self, request: MutationRequest) -> Result<(), StoreError> {
        match self.sender.try_send(request) {
            Ok(()) => {
                gauge!(METRIC_QUEUE_DEPTH).set(self.pending() as f64);
                Ok(())
            }
            Err(TrySendError::Full(request)) => {
                counter!(METRIC_BACKPRESSURE).increment(1);
                warn!(
                    request_id = %request.id,
                    kind = request.mutation.kind(),
                    capacity = self.capacity,
                    "Mutation rejected: queue full"
                );
                Err(StoreError::Backpressure {
                    capacity: self.capacity,
                })
            }
            Err(TrySendError::Closed(_)) => Err(StoreError::Closed),
        }
    }
}

/// The single consumer of a mutation queue.
#[derive(Debug)]
pub struct MutationApplier {
    receiver: mpsc::Receiver<MutationRequest>,
    publisher: Arc<SnapshotPublisher>,
}

impl MutationApplier {
    /// Apply requests until every [`MutationPipeline`] handle is dropped and
    /// the queue is drained.
    pub async fn run(mut self) {
        info!(epoch = self.publisher.epoch(), "Mutation applier started");
        while self.apply_next().await {}
        info!(epoch = self.publisher.epoch(), "Mutation applier stopped");
    }

    /// Wait for and apply one request. Returns `false` once the queue is
    /// closed and empty.
    pub async fn apply_next(&mut self) -> bool {
        match self.receiver.recv().await {
            Some(request) => {
                self.apply(request);
                true
            }
            None => false,
        }
    }

    /// Apply one request if one is already queued.
    pub fn try_apply_next(&mut self) -> bool {
        match self.receiver.try_recv() {
            Ok(request) => {
                self.apply(request);
                true
            }
            Err(_) => false,
        }
    }

    fn apply(&self, request: MutationRequest) {
        let started_at = Instant::now();
        let MutationRequest {
            id,
            mutation,
            completion,
        } = request;
        let kind = mutation.kind();
        let target = mutation.target();

        let current = self.publisher.current();
        let result = current
            .apply(mutation, OffsetDateTime::now_utc())
            .map(|(next, effect)| {
                let epoch = next.epoch();
                self.publisher.publish(Arc::new(next));
                MutationOutcome { epoch, effect }
            });

        match &result {
            Ok(outcome) => {
                counter!(METRIC_APPLIED, "kind" => kind).increment(1);
                debug!(
                    request_id = %id,
                    kind,
                    epoch = outcome.epoch,
                    post_id = outcome.effect.record().id,
                    "Mutation applied"
                );
            }
            Err(error) => {
                counter!(METRIC_REJECTED, "kind" => kind, "reason" => error.reason()).increment(1);
                warn!(
                    request_id = %id,
                    kind,
                    target = ?target,
                    error = %error,
                    "Mutation rejected"
                );
            }
        }

        histogram!(METRIC_APPLY_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);
        gauge!(METRIC_QUEUE_DEPTH).set(self.receiver.len() as f64);

        if let Some(sender) = completion
            && sender.send(result).is_err()
        {
            debug!(request_id = %id, "Submitter stopped waiting for completion");
        }
    }
}
