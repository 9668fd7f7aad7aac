pub mod queue;
pub mod worker;

pub use queue::{HttpJobQueue, InMemoryJobQueue, JobQueue, JobStatus};
pub use worker::{PoolOptions, PoolSummary, run_pool};
