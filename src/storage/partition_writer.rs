use crate::error::{PipelineError, PipelineResult};
use crate::models::columns::partition;
use crate::models::{PartitionKey, partition_keys};
use crate::storage::ObjectStore;
use polars::prelude::*;
use std::io::Cursor;
use tracing::{error, info};

pub fn encode_parquet(df: &mut DataFrame) -> PipelineResult<Vec<u8>> {
    let mut buf = Vec::new();
    ParquetWriter::new(&mut buf)
        .with_compression(ParquetCompression::Snappy)
        .finish(df)?;
    Ok(buf)
}

pub fn decode_parquet(bytes: Vec<u8>) -> PipelineResult<DataFrame> {
    Ok(ParquetReader::new(Cursor::new(bytes)).finish()?)
}

/// Split a frame into one frame per partition key, in key order.
pub fn split_by_partition(df: &DataFrame) -> PipelineResult<Vec<(PartitionKey, DataFrame)>> {
    let mut parts = Vec::new();
    for part in df.partition_by_stable(partition::ALL, true)? {
        if let Some(key) = partition_keys(&part)?.into_iter().next() {
            parts.push((key, part));
        }
    }
    parts.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(parts)
}

/// Frame without the partition columns, for layers whose path carries the key.
pub fn without_partition_columns(df: &DataFrame) -> PipelineResult<DataFrame> {
    let keep: Vec<&str> = df
        .get_column_names_str()
        .into_iter()
        .filter(|c| !partition::ALL.contains(c))
        .collect();
    Ok(df.select(keep)?)
}

/// Result of persisting one output partition.
#[derive(Debug)]
pub struct PartitionWrite {
    pub key: PartitionKey,
    pub path: String,
    pub rows: usize,
    pub result: PipelineResult<()>,
}

/// Persists a table split by partition key; each partition succeeds or fails alone.
pub struct PartitionWriter<'a, S: ObjectStore + ?Sized> {
    store: &'a S,
    keep_partition_columns: bool,
}

impl<'a, S: ObjectStore + ?Sized> PartitionWriter<'a, S> {
    pub fn new(store: &'a S, keep_partition_columns: bool) -> Self {
        Self {
            store,
            keep_partition_columns,
        }
    }

    /// Overwrite every partition present in `df` at the path `path_for` gives it.
    pub async fn write(
        &self,
        df: &DataFrame,
        path_for: impl Fn(&PartitionKey) -> String,
    ) -> PipelineResult<Vec<PartitionWrite>> {
        let mut writes = Vec::new();

        for (key, part) in split_by_partition(df)? {
            let path = path_for(&key);
            let rows = part.height();
            let result = self.write_one(part, &path).await;

            match &result {
                Ok(()) => info!("✅ Parquet saved: {} ({} rows)", path, rows),
                Err(e) => error!("❌ Failed writing partition {}: {}", key, e),
            }
            writes.push(PartitionWrite {
                key,
                path,
                rows,
                result,
            });
        }

        Ok(writes)
    }

    async fn write_one(&self, part: DataFrame, path: &str) -> PipelineResult<()> {
        let mut body = if self.keep_partition_columns {
            part
        } else {
            without_partition_columns(&part)?
        };

        let bytes = encode_parquet(&mut body).map_err(|e| PipelineError::Write {
            key: path.to_string(),
            reason: e.to_string(),
        })?;

        self.store
            .put_object(path, &bytes)
            .await
            .map_err(|e| PipelineError::Write {
                key: path.to_string(),
                reason: e.to_string(),
            })
    }
}
