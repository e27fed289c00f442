// Port Layer - Interfaces for external dependencies

pub mod operator;
pub mod worker_host;

// Re-exports
pub use operator::Operator;
pub use worker_host::{EngineOutputs, WorkerError, WorkerHost};
