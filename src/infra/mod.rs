//! Infrastructure: errors, caching, retry.

pub mod cache;
pub mod error;
pub mod retry;

pub use cache::{CacheStats, StalePolicy, TtlCache};
pub use error::{ReaderError, Result};
pub use retry::{Retry, RetryConfig};
