pub mod gold_job;
pub mod run_report;
pub mod silver_job;

pub use gold_job::GoldJob;
pub use run_report::{FailedUnit, RunReport};
pub use silver_job::{SilverJob, transform_batch};
