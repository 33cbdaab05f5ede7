//! Database entities.

pub mod job;

pub use job::{Job, JobStatus};
