pub mod aggregation_engine;
pub mod currency_normalizer;
pub mod deduplicator;
pub mod schema_validator;
pub mod temporal_enricher;
pub mod trend_detector;

pub use aggregation_engine::*;
pub use currency_normalizer::*;
pub use deduplicator::*;
pub use schema_validator::*;
pub use temporal_enricher::*;
pub use trend_detector::*;
