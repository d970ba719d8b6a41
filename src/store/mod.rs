//! In-memory post store.
//!
//! A read-optimized cache of posts fed from a backing database at startup:
//!
//! - **Versions**: immutable generations of the record sequence plus its id
//!   and slug indexes ([`Version`])
//! - **Publisher**: holds the current version for lock-free reads
//!   ([`SnapshotPublisher`])
//! - **Pipeline**: bounded queue with a single applier that serializes writes
//!   ([`MutationPipeline`], [`MutationApplier`])
//! - **Queries**: lookups, recency pages, search and archives
//!   ([`PostQueries`])
//!
//! ## Configuration
//!
//! ```toml
//! [store]
//! queue_capacity = 100
//! default_page_size = 10
//! max_page_size = 100
//! submit_timeout_ms = 1000
//! ```

mod config;
mod error;
mod handle;
mod mutation;
mod pagination;
mod pipeline;
mod publisher;
mod query;
mod version;

pub use config::StoreConfig;
pub use error::{PostKey, StoreError};
pub use handle::PostStore;
pub use mutation::{Completion, Mutation, MutationEffect, MutationOutcome};
pub use pagination::{Page, PageRequest};
pub use pipeline::{MutationApplier, MutationPipeline};
pub use publisher::SnapshotPublisher;
pub use query::{AdminFilter, MonthArchive, PostQueries};
pub use version::{Epoch, Version};
