//! sluice-core
//!
//! Bounded-concurrency task runner: submit asynchronous units of work
//! incrementally, run at most `limit` of them at once, then settle the
//! whole batch into ordered successes and index-tagged failures.
//!
//! - **limiter**: admission/backpressure and settlement collection
//! - **settlement**: result partition model
//! - **status**: occupancy snapshot
//! - **error**: configuration errors

pub mod error;
pub mod limiter;
pub mod settlement;
pub mod status;

pub use error::SluiceError;
pub use limiter::Limiter;
pub use settlement::{Failure, Settlement};
pub use status::LimiterCounts;
