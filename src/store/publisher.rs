//! Holder of the currently visible version.
//!
//! Readers load the current `Arc<Version>` with a lock-free atomic load;
//! versions are built entirely before they are swapped in, so a reader never
//! waits on version construction and never sees a partial version. Only the
//! mutation applier created alongside a publisher ever publishes to it.

use std::sync::Arc;

use arc_swap::ArcSwap;
use metrics::gauge;

use super::version::{Epoch, Version};

const METRIC_VERSION_POSTS: &str = "folio_store_version_posts";

#[derive(Debug)]
pub struct SnapshotPublisher {
    current: ArcSwap<Version>,
}

impl SnapshotPublisher {
    pub(crate) fn new(initial: Version) -> Self {
        gauge!(METRIC_VERSION_POSTS).set(initial.len() as f64);
        Self {
            current: ArcSwap::from_pointee(initial),
        }
    }

    /// The currently published version.
    pub fn current(&self) -> Arc<Version> {
        self.current.load_full()
    }

    pub fn epoch(&self) -> Epoch {
        self.current.load().epoch()
    }

    /// Replace the published version, returning the one it displaced.
    pub(crate) fn publish(&self, next: Arc<Version>) -> Arc<Version> {
        let posts = next.len();
        let previous = self.current.swap(next);
        gauge!(METRIC_VERSION_POSTS).set(posts as f64);
        previous
    }
}
