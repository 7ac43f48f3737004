//! Fetch jobs and the worker pool that runs them

pub mod context;
pub mod coordinator;
pub mod types;

pub use context::JobContext;
pub use coordinator::{CoordinatorConfig, FetchCoordinator};
pub use types::{FetchJob, FetchOutcome, FetchResult};
