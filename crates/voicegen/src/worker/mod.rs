pub mod handle;
pub mod job;
pub mod runner;

pub use handle::WorkerHandle;
pub use job::WorkOutcome;
pub use runner::{Worker, ORPHANED_JOB_MESSAGE};
