//! Mixed read/write workload against a running [`PostStore`].
//!
//! Readers hammer the query surface while writers push create, update and
//! delete mutations through the pipeline. Every reader call also checks that
//! the version it read is internally consistent.

use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, instrument};

use crate::application::error::AppError;
use crate::domain::entities::{PostDraft, PostPatch};
use crate::domain::types::PostStatus;
use crate::store::{Mutation, MutationOutcome, MutationPipeline, PostStore, StoreError};

const SEARCH_KEYWORD: &str = "post";

#[derive(Debug, Clone, Copy)]
pub struct BenchConfig {
    pub readers: usize,
    pub writers: usize,
    pub duration: Duration,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BenchReport {
    pub readers: usize,
    pub writers: usize,
    pub elapsed_ms: u64,
    pub initial_posts: usize,
    pub final_posts: usize,
    pub final_epoch: u64,
    pub reads: u64,
    pub reads_per_second: u64,
    pub inconsistent_reads: u64,
    pub writes_applied: u64,
    pub writes_rejected: u64,
    pub backpressure: u64,
}

#[derive(Debug, Default)]
struct ReaderTally {
    reads: u64,
    inconsistent: u64,
}

#[derive(Debug, Default)]
struct WriterTally {
    applied: u64,
    rejected: u64,
    backpressure: u64,
}

/// Run the workload for `config.duration` and report what happened.
#[instrument(skip(store))]
pub async fn run(store: &PostStore, config: BenchConfig) -> Result<BenchReport, AppError> {
    let initial = store.snapshot();
    let started = Instant::now();
    let deadline = started + config.duration;

    info!(
        posts = initial.len(),
        epoch = initial.epoch(),
        "Benchmark started"
    );

    let readers = (0..config.readers)
        .map(|reader| {
            let store = store.clone();
            tokio::spawn(async move { read_loop(&store, reader, deadline).await })
        })
        .collect::<Vec<_>>();
    let writers = (0..config.writers)
        .map(|writer| {
            let pipeline = store.pipeline().clone();
            tokio::spawn(async move { write_loop(&pipeline, writer, deadline).await })
        })
        .collect::<Vec<_>>();

    let (reader_results, writer_results) = futures::join!(join_all(readers), join_all(writers));
    let elapsed = started.elapsed();

    let mut report = BenchReport {
        readers: config.readers,
        writers: config.writers,
        elapsed_ms: elapsed.as_millis() as u64,
        initial_posts: initial.len(),
        ..Default::default()
    };

    for result in reader_results {
        let tally = result.map_err(|err| AppError::unexpected(format!("reader task: {err}")))?;
        report.reads += tally.reads;
        report.inconsistent_reads += tally.inconsistent;
    }
    for result in writer_results {
        let tally = result.map_err(|err| AppError::unexpected(format!("writer task: {err}")))?;
        report.writes_applied += tally.applied;
        report.writes_rejected += tally.rejected;
        report.backpressure += tally.backpressure;
    }

    let millis = elapsed.as_millis().max(1) as u64;
    report.reads_per_second = report.reads.saturating_mul(1000) / millis;

    let last = store.snapshot();
    report.final_posts = last.len();
    report.final_epoch = last.epoch();

    info!(
        reads = report.reads,
        writes_applied = report.writes_applied,
        backpressure = report.backpressure,
        elapsed_ms = report.elapsed_ms,
        "Benchmark finished"
    );

    Ok(report)
}

async fn read_loop(store: &PostStore, reader: usize, deadline: Instant) -> ReaderTally {
    let queries = store.queries();
    let mut tally = ReaderTally::default();
    let mut step = reader;

    while Instant::now() < deadline {
        let snapshot = queries.snapshot();
        if let Some(post) = snapshot.posts().get(step % snapshot.len().max(1)) {
            let by_slug = snapshot.get_by_slug(&post.slug).map(|found| found.id);
            let by_id = snapshot.get_by_id(post.id).map(|found| found.slug.as_str());
            if by_slug != Some(post.id) || by_id != Some(post.slug.as_str()) {
                tally.inconsistent += 1;
            }
        }

        match step % 4 {
            0 => {
                queries.list_recent(1, None);
            }
            1 => {
                queries.search(SEARCH_KEYWORD, 1, None);
            }
            2 => {
                queries.archives();
            }
            _ => {
                let _ = queries.get_by_id((step % 1000) as i64 + 1);
            }
        }

        tally.reads += 1;
        step = step.wrapping_add(1);
        tokio::task::yield_now().await;
    }

    tally
}

async fn write_loop(pipeline: &MutationPipeline, writer: usize, deadline: Instant) -> WriterTally {
    let mut tally = WriterTally::default();
    let mut sequence = 0usize;

    while Instant::now() < deadline {
        sequence += 1;
        let draft = PostDraft {
            body: format!("Written by bench writer {writer}."),
            ..PostDraft::new(
                format!("bench-{writer}-{sequence}"),
                format!("Bench post {writer}/{sequence}"),
            )
        };

        let Some(created) = submit(pipeline, Mutation::Create(draft), &mut tally).await else {
            if pipeline.is_closed() {
                break;
            }
            continue;
        };
        let id = created.effect.record().id;

        let patch = PostPatch::default().status(PostStatus::Published);
        submit(pipeline, Mutation::Update { id, patch }, &mut tally).await;

        // Every other post stays so the version keeps growing.
        if sequence % 2 == 0 {
            submit(pipeline, Mutation::Delete { id }, &mut tally).await;
        }
    }

    tally
}

async fn submit(
    pipeline: &MutationPipeline,
    mutation: Mutation,
    tally: &mut WriterTally,
) -> Option<MutationOutcome> {
    let completion = match pipeline.submit_tracked(mutation) {
        Ok(completion) => completion,
        Err(StoreError::Backpressure { .. }) => {
            tally.backpressure += 1;
            tokio::task::yield_now().await;
            return None;
        }
        Err(err) => {
            debug!(error = %err, "Submission failed");
            tally.rejected += 1;
            return None;
        }
    };

    match completion.wait().await {
        Ok(outcome) => {
            tally.applied += 1;
            Some(outcome)
        }
        Err(err) => {
            debug!(error = %err, "Mutation rejected");
            tally.rejected += 1;
            None
        }
    }
}
