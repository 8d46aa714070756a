pub mod memory_store;
pub mod minio_client;
pub mod object_store;
pub mod partition_writer;
pub mod storage_manager;

pub use memory_store::MemoryStore;
pub use minio_client::MinioStorage;
pub use object_store::ObjectStore;
pub use partition_writer::*;
pub use storage_manager::StorageManager;
