pub mod columns;
pub mod data_models;
pub mod exchange_rate;
pub mod partition;

pub use data_models::*;
pub use exchange_rate::{ExchangeRateTable, RateLookup};
pub use partition::{PartitionKey, partition_keys, with_partition_columns};
