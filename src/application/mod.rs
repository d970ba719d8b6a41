//! Application services layered over the store.

pub mod bench;
pub mod error;
pub mod loader;
