//! Store configuration.
//!
//! Controls the mutation queue and pagination defaults via the `[store]`
//! section of `folio.toml`.

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::Deserialize;

use super::pagination::PageRequest;

const DEFAULT_QUEUE_CAPACITY: usize = 100;
const DEFAULT_PAGE_SIZE: usize = 10;
const DEFAULT_MAX_PAGE_SIZE: usize = 100;
const DEFAULT_SUBMIT_TIMEOUT_MS: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Maximum number of accepted, not yet applied mutations.
    pub queue_capacity: usize,
    /// Page size used when a caller does not supply one.
    pub default_page_size: usize,
    /// Upper bound applied to caller-supplied page sizes.
    pub max_page_size: usize,
    /// How long the read-your-writes helpers wait for queue capacity.
    pub submit_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            submit_timeout_ms: DEFAULT_SUBMIT_TIMEOUT_MS,
        }
    }
}

impl From<&crate::config::StoreSettings> for StoreConfig {
    fn from(settings: &crate::config::StoreSettings) -> Self {
        Self {
            queue_capacity: settings.queue_capacity.get(),
            default_page_size: settings.default_page_size.get(),
            max_page_size: settings.max_page_size.get(),
            submit_timeout_ms: u64::try_from(settings.submit_timeout.as_millis())
                .unwrap_or(u64::MAX),
        }
    }
}

impl StoreConfig {
    /// Returns the queue capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn queue_capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.queue_capacity).unwrap_or(NonZeroUsize::MIN)
    }

    pub fn submit_timeout(&self) -> Duration {
        Duration::from_millis(self.submit_timeout_ms.max(1))
    }

    /// Normalize caller pagination input: pages are 1-based (0 reads as 1),
    /// sizes fall back to the default and are clamped to `1..=max_page_size`.
    pub fn page_request(&self, page: usize, page_size: Option<usize>) -> PageRequest {
        let max = self.max_page_size.max(1);
        let size = page_size.unwrap_or(self.default_page_size).clamp(1, max);
        PageRequest::new(page.max(1), size)
    }
}
