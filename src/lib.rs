//! Folio: an in-memory, read-optimized post store.
//!
//! Readers get lock-free access to an immutable [`store::Version`];
//! writers go through a bounded queue drained by a single applier.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod store;
