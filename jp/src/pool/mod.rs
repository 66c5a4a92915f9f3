//! Bounded job pool
//!
//! Admits external jobs up to a concurrency ceiling, polls them for completion
//! at a fixed interval, and kills any job whose accumulated runtime reaches the
//! configured timeout.

mod config;
mod core;
mod error;
mod record;
mod stats;

pub use config::PoolConfig;
pub use self::core::Pool;
pub use error::PoolError;
pub use record::JobRecord;
pub use stats::PoolStats;
