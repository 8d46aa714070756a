use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::models::{ExchangeRateTable, PartitionKey, with_partition_columns};
use crate::pipeline::RunReport;
use crate::processor::{
    BatchSchema, CurrencyNormalizer, Deduplicator, SchemaValidator, TemporalEnricher,
    UnresolvedPeriod,
};
use crate::storage::{ObjectStore, PartitionWriter, StorageManager, decode_parquet};
use anyhow::{Context, Result};
use polars::prelude::*;
use std::collections::HashSet;
use tracing::{info, warn};

/// One bronze batch after cleaning, ready to be written to silver.
#[derive(Debug)]
pub struct SilverBatch {
    pub frame: DataFrame,
    pub filled_rows: usize,
    pub unresolved: Vec<UnresolvedPeriod>,
    pub duplicates_removed: usize,
    pub non_positive_removed: usize,
}

/// Validate, normalize, enrich and clean one bronze batch.
pub fn transform_batch(
    mut df: DataFrame,
    key: &PartitionKey,
    rates: &ExchangeRateTable,
) -> PipelineResult<SilverBatch> {
    SchemaValidator.normalize_column_names(&mut df)?;
    SchemaValidator.ensure(&df, BatchSchema::Bronze)?;

    let df = with_partition_columns(df, key)?;
    let normalized = CurrencyNormalizer::new(rates).normalize(df)?;

    let mut frame = normalized.frame;
    TemporalEnricher.enrich(&mut frame)?;
    let cleaned = Deduplicator.apply(&frame)?;

    Ok(SilverBatch {
        frame: cleaned.frame,
        filled_rows: normalized.filled_rows,
        unresolved: normalized.unresolved,
        duplicates_removed: cleaned.duplicates_removed,
        non_positive_removed: cleaned.non_positive_removed,
    })
}

pub async fn load_exchange_rates(
    store: &dyn ObjectStore,
    config: &PipelineConfig,
) -> Result<ExchangeRateTable> {
    let key = &config.paths.exchange_rates_key;
    let bytes = store
        .get_object(key)
        .await
        .with_context(|| format!("Failed to read exchange rate table {}", key))?;

    let table = ExchangeRateTable::from_csv_bytes(&bytes, &config.paths.exchange_rate_column)
        .with_context(|| format!("Failed to parse exchange rate table {}", key))?;

    info!("💱 Loaded {} monthly exchange rates from {}", table.len(), key);
    Ok(table)
}

/// Bronze to silver: one input batch per bronze object.
pub struct SilverJob<'a> {
    store: &'a dyn ObjectStore,
    config: &'a PipelineConfig,
    layout: StorageManager,
}

impl<'a> SilverJob<'a> {
    pub fn new(store: &'a dyn ObjectStore, config: &'a PipelineConfig) -> Self {
        Self {
            store,
            config,
            layout: StorageManager::new(config.paths.clone()),
        }
    }

    /// Process every bronze batch. Only a missing rate table or an unlistable
    /// bronze prefix fails the run; anything else is recorded per unit.
    pub async fn run(&self) -> Result<RunReport> {
        let mut report = RunReport::start("silver");
        info!("🚀 Starting bronze → silver run {}", report.run_id);

        let rates = load_exchange_rates(self.store, self.config).await?;

        let bronze_prefix = &self.config.paths.bronze_prefix;
        let keys: Vec<String> = self
            .store
            .list_keys(bronze_prefix)
            .await
            .with_context(|| format!("Failed to list bronze batches under {}", bronze_prefix))?
            .into_iter()
            .filter(|k| StorageManager::is_parquet(k))
            .collect();

        if keys.is_empty() {
            report.record_warning(format!("No bronze batches found under {}", bronze_prefix));
        }
        info!("📁 Found {} bronze batches", keys.len());

        // Silver paths written so far in this run
        let mut written = HashSet::new();
        for path in &keys {
            self.process_batch(path, &rates, &mut written, &mut report)
                .await;
        }

        let report = report.finish();
        report.log_summary();
        Ok(report)
    }

    async fn process_batch(
        &self,
        path: &str,
        rates: &ExchangeRateTable,
        written: &mut HashSet<String>,
        report: &mut RunReport,
    ) {
        info!("\n=== Processing bronze batch: {} ===", path);

        let key = match PartitionKey::from_path(path) {
            Ok(key) => key,
            Err(e) => {
                report.record_failure(path, &e);
                return;
            }
        };

        let batch = match self.read_batch(path).await.and_then(|df| transform_batch(df, &key, rates)) {
            Ok(batch) => batch,
            Err(e) => {
                report.record_failure(path, &e);
                return;
            }
        };

        for period in &batch.unresolved {
            report.record_failure(
                format!("{} ({}-{:02})", path, period.year, period.month),
                &period.to_error(),
            );
        }
        if batch.filled_rows > 0 {
            report.record_warning(format!(
                "{}: {} rows used a forward-filled exchange rate",
                path, batch.filled_rows
            ));
        }

        if batch.frame.height() == 0 {
            warn!("⚠️ No rows left to write for {}", key);
            report.record_warning(format!("{}: no rows left after cleaning", path));
            return;
        }

        let writer = PartitionWriter::new(self.store, false);
        match writer
            .write(&batch.frame, |k| self.layout.silver_path(k))
            .await
        {
            Ok(writes) => {
                for write in writes {
                    match write.result {
                        Ok(()) => {
                            if !written.insert(write.path.clone()) {
                                report.record_warning(format!(
                                    "{}: overwrote {} already written in this run",
                                    path, write.path
                                ));
                            }
                            report.record_success(write.path);
                        }
                        Err(e) => report.record_failure(write.key.to_string(), &e),
                    }
                }
            }
            Err(e) => report.record_failure(path, &e),
        }
    }

    async fn read_batch(&self, path: &str) -> PipelineResult<DataFrame> {
        let bytes = self
            .store
            .get_object(path)
            .await
            .map_err(|e| PipelineError::Read {
                key: path.to_string(),
                reason: e.to_string(),
            })?;

        decode_parquet(bytes).map_err(|e| PipelineError::Read {
            key: path.to_string(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use crate::models::columns::{bronze, partition, silver};
    use crate::storage::{MemoryStore, encode_parquet};
    use crate::test_support::{SaleLine, bronze_frame, f64_column};

    const RATES_CSV: &str = "year,month,exchange_rate\n2024,1,800.0\n2024,3,1000.0\n";

    fn config() -> PipelineConfig {
        PipelineConfig::from_toml_str(
            r#"
            [minio]
            endpoint = "http://localhost:9000"
            bucket_name = "test"
            "#,
        )
        .unwrap()
    }

    async fn put_frame(store: &MemoryStore, path: &str, mut df: DataFrame) {
        let bytes = encode_parquet(&mut df).unwrap();
        store.put_object(path, &bytes).await.unwrap();
    }

    async fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .put_object("reference/exchange_rates/exchange_rates.csv", RATES_CSV.as_bytes())
            .await
            .unwrap();
        store
    }

    #[test]
    fn test_transform_batch_normalizes_and_cleans() {
        let key = PartitionKey::new("Centro", 2024, 3).unwrap();
        let rates = ExchangeRateTable::from_entries([(2024, 3, 1000.0)]).unwrap();
        let lines = [
            SaleLine::new("2024-03-04", 1, "P1", 2, 100.0, 60.0),
            SaleLine::new("2024-03-04", 1, "P1", 2, 100.0, 60.0),
            SaleLine::new("2024-03-05", 2, "P2", 1, 0.0, 10.0),
        ];

        let batch = transform_batch(bronze_frame(&lines), &key, &rates).unwrap();

        assert_eq!(batch.frame.height(), 1);
        assert_eq!(batch.duplicates_removed, 1);
        assert_eq!(batch.non_positive_removed, 1);
        assert_eq!(f64_column(&batch.frame, silver::REVENUE_REF), vec![0.2]);
        assert!(batch.unresolved.is_empty());
    }

    #[test]
    fn test_transform_batch_accepts_untidy_headers() {
        let key = PartitionKey::new("Centro", 2024, 3).unwrap();
        let rates = ExchangeRateTable::from_entries([(2024, 3, 1000.0)]).unwrap();
        let mut df = bronze_frame(&[SaleLine::new("2024-03-04", 1, "P1", 1, 100.0, 60.0)]);
        df.rename(bronze::DATE, " fecha ".into()).unwrap();

        let batch = transform_batch(df, &key, &rates).unwrap();
        assert_eq!(batch.frame.height(), 1);
    }

    #[test]
    fn test_transform_batch_rejects_missing_column() {
        let key = PartitionKey::new("Centro", 2024, 3).unwrap();
        let rates = ExchangeRateTable::from_entries([(2024, 3, 1000.0)]).unwrap();
        let df = bronze_frame(&[SaleLine::new("2024-03-04", 1, "P1", 1, 100.0, 60.0)])
            .drop(bronze::UNIT_COST)
            .unwrap();

        let err = transform_batch(df, &key, &rates).unwrap_err();
        assert_eq!(err.kind(), FailureKind::Schema);
    }

    #[tokio::test]
    async fn test_run_writes_silver_and_isolates_bad_batch() {
        let store = seeded_store().await;
        let lines = [SaleLine::new("2024-03-04", 1, "P1", 2, 100.0, 60.0)];

        put_frame(
            &store,
            "bronze/ventas/branch=Centro/year=2024/month=3/data.parquet",
            bronze_frame(&lines),
        )
        .await;
        put_frame(
            &store,
            "bronze/ventas/branch=Norte/year=2024/month=3/data.parquet",
            bronze_frame(&lines).drop(bronze::DATE).unwrap(),
        )
        .await;

        let config = config();
        let report = SilverJob::new(&store, &config).run().await.unwrap();

        assert_eq!(report.success_count, 1);
        assert_eq!(report.failure_count, 1);
        assert_eq!(report.failures[0].kind, FailureKind::Schema);
        assert_eq!(
            report.failed_units(),
            vec!["bronze/ventas/branch=Norte/year=2024/month=3/data.parquet"]
        );

        let silver_path = "silver/ventas/branch=Centro/year=2024/month=3/ventas_Centro_2024-3.parquet";
        let stored = decode_parquet(store.get_object(silver_path).await.unwrap()).unwrap();
        assert_eq!(stored.height(), 1);
        assert!(stored.column(partition::BRANCH).is_err());
        assert!(stored.column(silver::WEEKDAY).is_ok());
    }

    #[tokio::test]
    async fn test_run_forward_fills_and_reports_unrated_period() {
        let store = seeded_store().await;
        let lines = [SaleLine::new("2024-02-10", 1, "P1", 1, 100.0, 50.0)];
        let unrated = [SaleLine::new("2023-12-10", 1, "P1", 1, 100.0, 50.0)];

        put_frame(
            &store,
            "bronze/ventas/branch=Centro/year=2024/month=2/data.parquet",
            bronze_frame(&lines),
        )
        .await;
        put_frame(
            &store,
            "bronze/ventas/branch=Centro/year=2023/month=12/data.parquet",
            bronze_frame(&unrated),
        )
        .await;

        let config = config();
        let report = SilverJob::new(&store, &config).run().await.unwrap();

        assert_eq!(report.success_count, 1);
        assert_eq!(report.failure_count, 1);
        assert_eq!(report.failures[0].kind, FailureKind::RateResolution);
        assert!(report.warnings.iter().any(|w| w.contains("forward-filled")));

        let stored = decode_parquet(
            store
                .get_object("silver/ventas/branch=Centro/year=2024/month=2/ventas_Centro_2024-2.parquet")
                .await
                .unwrap(),
        )
        .unwrap();
        assert_eq!(f64_column(&stored, silver::EXCHANGE_RATE), vec![800.0]);
    }

    #[tokio::test]
    async fn test_run_fails_without_rate_table() {
        let store = MemoryStore::new();
        let config = config();
        assert!(SilverJob::new(&store, &config).run().await.is_err());
    }

    #[tokio::test]
    async fn test_write_failure_is_recorded_per_partition() {
        let store = seeded_store().await;
        store.fail_writes_under("silver/ventas/branch=Centro/").unwrap();
        let lines = [SaleLine::new("2024-03-04", 1, "P1", 1, 100.0, 60.0)];

        for branch in ["Centro", "Sur"] {
            put_frame(
                &store,
                &format!("bronze/ventas/branch={}/year=2024/month=3/data.parquet", branch),
                bronze_frame(&lines),
            )
            .await;
        }

        let config = config();
        let report = SilverJob::new(&store, &config).run().await.unwrap();

        assert_eq!(report.success_count, 1);
        assert_eq!(report.failure_count, 1);
        assert_eq!(report.failures[0].kind, FailureKind::Write);
        assert_eq!(report.failures[0].unit, "Centro/2024-03");
    }

    #[tokio::test]
    async fn test_second_batch_for_same_partition_warns_on_overwrite() {
        let store = seeded_store().await;
        let lines = [SaleLine::new("2024-03-04", 1, "P1", 1, 100.0, 60.0)];

        for part in ["part-0", "part-1"] {
            put_frame(
                &store,
                &format!("bronze/ventas/branch=Centro/year=2024/month=3/{}.parquet", part),
                bronze_frame(&lines),
            )
            .await;
        }

        let config = config();
        let report = SilverJob::new(&store, &config).run().await.unwrap();

        let silver_path = "silver/ventas/branch=Centro/year=2024/month=3/ventas_Centro_2024-3.parquet";
        assert_eq!(report.success_count, 2);
        assert_eq!(report.failure_count, 0);
        let overwrites: Vec<&String> = report
            .warnings
            .iter()
            .filter(|w| w.contains("overwrote") && w.contains(silver_path))
            .collect();
        assert_eq!(overwrites.len(), 1);
        assert!(overwrites[0].contains("part-1.parquet"));
    }
}
