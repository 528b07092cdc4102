//! Job execution layer
//!
//! This module contains the bounded worker pool, the per-job handles it
//! drives, and the completion signal the runner waits on.

mod completion;
mod handle;
mod pool;

pub use completion::Completion;
pub use handle::{JobHandle, JobStatus};
pub use pool::{PoolControl, WorkerConfig, WorkerId, WorkerPool};
