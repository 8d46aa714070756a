pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod processor;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{FailureKind, PipelineError, PipelineResult};
