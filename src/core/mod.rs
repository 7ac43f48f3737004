//! Core application primitives (orchestrator, queries, scheduling, HTTP)

pub mod http;
pub mod pipeline;
pub mod query;
pub mod runtime;
pub mod scheduler;

pub use http::*;
pub use pipeline::*;
pub use query::*;
pub use runtime::*;
pub use scheduler::*;
