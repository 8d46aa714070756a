pub mod minio_config;
pub mod pipeline_config;

pub use minio_config::*;
pub use pipeline_config::*;
